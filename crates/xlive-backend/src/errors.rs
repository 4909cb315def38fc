//! Backend error types.

use std::time::Duration;

use thiserror::Error;
use xlive_core::XliveError;

/// Failures below HTTP status: the exchange never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange exceeded its timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Could not connect.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The HTTP client could not be constructed.
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl From<TransportError> for XliveError {
    fn from(err: TransportError) -> Self {
        Self::TransportFailure(err.to_string())
    }
}

/// Key-value store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failed.
    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data is not valid JSON.
    #[error("store JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for XliveError {
    fn from(err: StoreError) -> Self {
        Self::TransportFailure(err.to_string())
    }
}
