//! Layered settings loading.
//!
//! Loading flow:
//! 1. Start with compiled [`XliveSettings::default()`]
//! 2. Merge `~/.xlive/settings.json` if it exists
//! 3. Merge `XLIVE_*` environment variables (highest priority); `__`
//!    separates nesting, so `XLIVE_BACKEND__TIMEOUT_MS=2000` sets
//!    `backend.timeout_ms`
//!
//! The merged value is validated before it is returned.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::XliveSettings;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "XLIVE_";

/// Resolve the settings file path (`~/.xlive/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".xlive").join("settings.json")
}

/// Load settings from the default path.
pub fn load_settings() -> Result<XliveSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific file, then apply env overrides.
///
/// A missing file is not an error; invalid JSON is.
pub fn load_settings_from_path(path: &Path) -> Result<XliveSettings> {
    let mut figment = Figment::from(Serialized::defaults(XliveSettings::default()));
    if path.exists() {
        debug!(?path, "loading settings from file");
        figment = figment.merge(Json::file(path));
    } else {
        debug!(?path, "settings file not found, using defaults");
    }
    let settings: XliveSettings = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    validate(&settings)?;
    Ok(settings)
}

/// Reject values that would make the layer unusable.
pub fn validate(settings: &XliveSettings) -> Result<()> {
    if settings.backend.api_url.trim().is_empty() {
        return Err(SettingsError::InvalidValue(
            "backend.api_url must not be empty".to_string(),
        ));
    }
    if settings.backend.timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "backend.timeout_ms must be positive".to_string(),
        ));
    }
    if settings.session.max_members == 0 {
        return Err(SettingsError::InvalidValue(
            "session.max_members must be positive".to_string(),
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
