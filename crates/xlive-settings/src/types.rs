//! Settings types with compiled defaults.

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XliveSettings {
    /// Backend coordination service.
    pub backend: BackendSettings,
    /// Session lifecycle limits.
    pub session: SessionSettings,
    /// Address/QoS cache behaviour.
    pub cache: CacheSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Backend coordination service settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL every endpoint is resolved against.
    pub api_url: String,
    /// Per-exchange timeout in milliseconds.
    pub timeout_ms: u64,
    /// Title id used to key the resource hierarchy.
    pub title_id: u32,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Start with the online capability enabled.
    pub online_enabled: bool,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:36000/".to_string(),
            timeout_ms: 5_000,
            title_id: 0,
            user_agent: concat!("xlive/", env!("CARGO_PKG_VERSION")).to_string(),
            online_enabled: true,
        }
    }
}

/// Session lifecycle limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// How long a deleted session id stays unavailable for reuse.
    pub id_grace_period_ms: u64,
    /// Upper bound on public + private slots.
    pub max_members: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            id_grace_period_ms: 30_000,
            max_members: 32,
        }
    }
}

/// Cache behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Fall back to the backend when an address is not cached.
    pub resolve_on_miss: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            resolve_on_miss: true,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
