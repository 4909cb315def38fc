//! # xlive-settings
//!
//! Configuration for the live session layer, loaded in three layers
//! (lowest to highest priority):
//! 1. **Compiled defaults**: [`XliveSettings::default()`]
//! 2. **User file**: `~/.xlive/settings.json`
//! 3. **Environment**: `XLIVE_*` overrides
//!
//! # Usage
//!
//! ```no_run
//! use xlive_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("backend: {}", settings.backend.api_url);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path, validate};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<XliveSettings> = OnceLock::new();

/// Global settings, loaded on first access.
///
/// Falls back to compiled defaults (with a warning) when loading fails.
pub fn get_settings() -> &'static XliveSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "settings load failed, using defaults");
            XliveSettings::default()
        })
    })
}

/// Install explicit settings before first access.
///
/// Returns the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: XliveSettings) -> std::result::Result<(), XliveSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = XliveSettings::default();
        assert!(validate(&settings).is_ok());
        assert_eq!(settings.backend.timeout_ms, 5_000);
        assert_eq!(settings.session.max_members, 32);
        assert_eq!(settings.session.id_grace_period_ms, 30_000);
        assert!(settings.cache.resolve_on_miss);
        assert_eq!(settings.logging.level, "warn");
    }
}
