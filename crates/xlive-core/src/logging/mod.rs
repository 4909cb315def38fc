//! Structured logging setup.
//!
//! Everything in the workspace logs through `tracing`. Embedders call
//! [`init_subscriber`] once at startup; tests use
//! [`test_utils::capture_logs`] to assert on emitted events.

pub mod test_utils;

pub use test_utils::{CapturedEvent, LogCapture, capture_logs};

/// Default filter when neither `RUST_LOG` nor a level is supplied.
pub const DEFAULT_LEVEL: &str = "warn";

/// Install the global subscriber writing compact lines to stderr.
///
/// `RUST_LOG` wins over `level` when set. Later calls are no-ops.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let level = if level.is_empty() { DEFAULT_LEVEL } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

/// Install the global subscriber emitting one JSON object per line.
///
/// Meant for operators shipping logs to a collector.
pub fn init_json_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let level = if level.is_empty() { DEFAULT_LEVEL } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();
}
