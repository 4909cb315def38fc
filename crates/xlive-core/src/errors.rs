//! Error taxonomy shared by every component.
//!
//! Marshalling, session and backend failures all surface as [`XliveError`],
//! so the call layer has one vocabulary regardless of where a failure began.
//! Each variant maps to:
//!
//! - an [`ErrorKind`] for classification and retry decisions
//! - a machine-readable [`XliveError::code`] for logs
//! - a numeric [`XliveError::x_result`] handed back to the title

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::SessionId;

/// Status codes titles understand.
pub mod x_result {
    /// Success.
    pub const SUCCESS: u32 = 0x0000_0000;
    /// Stale or unknown handle.
    pub const INVALID_HANDLE: u32 = 0x0000_0006;
    /// Payload could not be decoded.
    pub const INVALID_DATA: u32 = 0x0000_000D;
    /// Bad argument.
    pub const INVALID_PARAMETER: u32 = 0x0000_0057;
    /// Result region too small.
    pub const INSUFFICIENT_BUFFER: u32 = 0x0000_007A;
    /// Resource already exists.
    pub const ALREADY_EXISTS: u32 = 0x0000_00B7;
    /// Resource not found.
    pub const NOT_FOUND: u32 = 0x0000_0490;
    /// Generic failure.
    pub const FUNCTION_FAILED: u32 = 0x0000_065B;
    /// Session has no room left.
    pub const SESSION_FULL: u32 = 0x8015_5202;
    /// Session is not in a state that allows the call.
    pub const SESSION_WRONG_STATE: u32 = 0x8015_5206;
}

// ─────────────────────────────────────────────────────────────────────────────
// ErrorKind
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of an [`XliveError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Call payload failed to decode.
    MalformedPayload,
    /// Unknown or deleted session handle.
    InvalidHandle,
    /// Operation not allowed in the current lifecycle state.
    InvalidState,
    /// Argument rejected by local validation.
    InvalidParameter,
    /// Not enough open slots.
    CapacityExceeded,
    /// Result region too small for the encoded result.
    InsufficientBuffer,
    /// Backend has no such resource.
    NotFound,
    /// Backend refused a conflicting write.
    Conflict,
    /// Exchange never completed (timeout, refused connection, ...).
    TransportFailure,
    /// Backend answered with a server-side failure.
    ServerError,
}

impl ErrorKind {
    /// Whether the caller can retry or fall back to offline behaviour.
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::TransportFailure | Self::NotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MalformedPayload => "malformed_payload",
            Self::InvalidHandle => "invalid_handle",
            Self::InvalidState => "invalid_state",
            Self::InvalidParameter => "invalid_parameter",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::InsufficientBuffer => "insufficient_buffer",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::TransportFailure => "transport_failure",
            Self::ServerError => "server_error",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// XliveError
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error type.
#[derive(Debug, Error)]
pub enum XliveError {
    /// Call payload failed to decode.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Unknown or deleted session handle.
    #[error("invalid session handle {0}")]
    InvalidHandle(SessionId),

    /// Operation not allowed in the current lifecycle state.
    #[error("session {session} is {state}, cannot {operation}")]
    InvalidState {
        /// Session the operation targeted.
        session: SessionId,
        /// Current lifecycle state name.
        state: &'static str,
        /// Operation that was refused.
        operation: &'static str,
    },

    /// Argument rejected by local validation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Not enough open slots.
    #[error("capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded {
        /// Slots the operation needed.
        requested: u32,
        /// Slots that were open.
        available: u32,
    },

    /// Result region too small for the encoded result.
    #[error("result buffer too small: need {required} bytes, have {capacity}")]
    InsufficientBuffer {
        /// Bytes the encoded result needs.
        required: usize,
        /// Bytes the caller provided.
        capacity: usize,
    },

    /// Backend has no such resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend refused a conflicting write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Exchange never completed.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Backend answered with a server-side failure.
    #[error("server error ({status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response.
        message: String,
    },
}

impl XliveError {
    /// Build an [`XliveError::InvalidState`].
    #[must_use]
    pub fn invalid_state(session: SessionId, state: &'static str, operation: &'static str) -> Self {
        Self::InvalidState {
            session,
            state,
            operation,
        }
    }

    /// Build an [`XliveError::InvalidParameter`].
    #[must_use]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedPayload(_) => ErrorKind::MalformedPayload,
            Self::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::InsufficientBuffer { .. } => ErrorKind::InsufficientBuffer,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::TransportFailure(_) => ErrorKind::TransportFailure,
            Self::ServerError { .. } => ErrorKind::ServerError,
        }
    }

    /// Whether the caller can retry or fall back to offline behaviour.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> String {
        self.kind().to_string().to_uppercase()
    }

    /// Status code returned to the title.
    #[must_use]
    pub fn x_result(&self) -> u32 {
        match self.kind() {
            ErrorKind::MalformedPayload => x_result::INVALID_DATA,
            ErrorKind::InvalidHandle => x_result::INVALID_HANDLE,
            ErrorKind::InvalidState => x_result::SESSION_WRONG_STATE,
            ErrorKind::InvalidParameter => x_result::INVALID_PARAMETER,
            ErrorKind::CapacityExceeded => x_result::SESSION_FULL,
            ErrorKind::InsufficientBuffer => x_result::INSUFFICIENT_BUFFER,
            ErrorKind::NotFound => x_result::NOT_FOUND,
            ErrorKind::Conflict => x_result::ALREADY_EXISTS,
            ErrorKind::TransportFailure | ErrorKind::ServerError => x_result::FUNCTION_FAILED,
        }
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, XliveError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_display() {
        let err = XliveError::invalid_state(SessionId::new(0x10), "deleted", "join");
        assert_eq!(
            err.to_string(),
            "session 0000000000000010 is deleted, cannot join"
        );
    }

    #[test]
    fn capacity_display() {
        let err = XliveError::CapacityExceeded {
            requested: 3,
            available: 1,
        };
        assert_eq!(err.to_string(), "capacity exceeded: requested 3, available 1");
    }

    #[test]
    fn recoverable_kinds() {
        assert!(XliveError::TransportFailure("timeout".into()).is_recoverable());
        assert!(XliveError::NotFound("session".into()).is_recoverable());
        assert!(!XliveError::MalformedPayload("short".into()).is_recoverable());
        assert!(
            !XliveError::ServerError {
                status: 500,
                message: "boom".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn codes_are_upper_snake() {
        let err = XliveError::InsufficientBuffer {
            required: 64,
            capacity: 8,
        };
        assert_eq!(err.code(), "INSUFFICIENT_BUFFER");
        assert_eq!(err.x_result(), x_result::INSUFFICIENT_BUFFER);
    }

    #[test]
    fn network_failures_map_to_function_failed() {
        assert_eq!(
            XliveError::TransportFailure("refused".into()).x_result(),
            x_result::FUNCTION_FAILED
        );
        assert_eq!(
            XliveError::invalid_parameter("flags").x_result(),
            x_result::INVALID_PARAMETER
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::CapacityExceeded).unwrap();
        assert_eq!(json, "\"capacity_exceeded\"");
    }
}
