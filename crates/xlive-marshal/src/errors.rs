//! Marshalling error types.

use thiserror::Error;
use xlive_core::XliveError;

/// Errors raised while looking up schemas or moving bytes.
///
/// Every variant is local to one call: nothing here ever touches session or
/// cache state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarshalError {
    /// No schema is registered for the ordinal.
    #[error("unknown call ordinal {0:#06x}")]
    UnknownOrdinal(u32),

    /// Schema index outside the table.
    #[error("schema index {index} out of range (table has {len})")]
    SchemaIndexOutOfRange {
        /// Requested index.
        index: u16,
        /// Number of schemas.
        len: usize,
    },

    /// URL index outside the offset table.
    #[error("url index {index} out of range (table has {len})")]
    UrlIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of URLs.
        len: usize,
    },

    /// Constant index outside the constants table.
    #[error("constant index {index} out of range (table has {len})")]
    ConstantIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of constants.
        len: usize,
    },

    /// The table itself is inconsistent.
    #[error("invalid schema table: {0}")]
    InvalidSchema(String),

    /// The caller's buffer holds fewer bytes than the declared length.
    #[error("payload holds {actual} bytes but declares {declared}")]
    ShorterThanDeclared {
        /// Declared payload length.
        declared: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// A field needs more bytes than remain.
    #[error("truncated at offset {offset}: need {needed} bytes, {remaining} remain")]
    Truncated {
        /// Read position.
        offset: usize,
        /// Bytes the next field needs.
        needed: usize,
        /// Bytes left before the declared end.
        remaining: usize,
    },

    /// Decoding finished without consuming exactly the declared length.
    #[error("desync: consumed {consumed} of {declared} declared bytes")]
    Desync {
        /// Bytes the schema consumed.
        consumed: usize,
        /// Declared payload length.
        declared: usize,
    },

    /// Repeat count above the schema's hard cap.
    #[error("{field}: {count} records exceeds cap of {cap}")]
    RepeatCapExceeded {
        /// Repeated section name.
        field: &'static str,
        /// Count found in the payload.
        count: u32,
        /// Cap from the constants table.
        cap: u32,
    },

    /// String longer than its declared maximum.
    #[error("{field}: {chars} chars exceeds max of {max}")]
    StringTooLong {
        /// String field name.
        field: &'static str,
        /// Length found.
        chars: usize,
        /// Declared maximum.
        max: usize,
    },

    /// UTF-16 data did not decode.
    #[error("{field}: invalid UTF-16")]
    InvalidUtf16 {
        /// Field name.
        field: &'static str,
    },

    /// Boolean field holding something other than 0 or 1.
    #[error("{field}: invalid boolean {value}")]
    InvalidBool {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: u32,
    },

    /// Argument value does not match the schema's field kind.
    #[error("{section}[{index}]: expected {expected}, found {found}")]
    FieldType {
        /// `fixed`, `strings` or `records`.
        section: &'static str,
        /// Position in the section.
        index: usize,
        /// Expected kind.
        expected: &'static str,
        /// Kind supplied.
        found: &'static str,
    },

    /// Wrong number of arguments in a section.
    #[error("{section}: expected {expected} values, found {found}")]
    ArityMismatch {
        /// `fixed`, `strings`, `records` or `record`.
        section: &'static str,
        /// Schema arity.
        expected: usize,
        /// Supplied arity.
        found: usize,
    },

    /// Result region smaller than the encoded result.
    #[error("result needs {required} bytes, region holds {capacity}")]
    InsufficientBuffer {
        /// Bytes the result needs.
        required: usize,
        /// Region capacity.
        capacity: usize,
    },

    /// Access outside the result region or caller memory.
    #[error("access at {offset}+{len} outside region of {capacity} bytes")]
    OutOfBounds {
        /// Start of the access.
        offset: usize,
        /// Length of the access.
        len: usize,
        /// Region size.
        capacity: usize,
    },
}

impl From<MarshalError> for XliveError {
    fn from(err: MarshalError) -> Self {
        match err {
            MarshalError::UnknownOrdinal(_)
            | MarshalError::SchemaIndexOutOfRange { .. }
            | MarshalError::UrlIndexOutOfRange { .. }
            | MarshalError::ConstantIndexOutOfRange { .. } => Self::NotFound(err.to_string()),
            MarshalError::InvalidSchema(msg) => Self::InvalidParameter(msg),
            MarshalError::InsufficientBuffer { required, capacity } => {
                Self::InsufficientBuffer { required, capacity }
            }
            other => Self::MalformedPayload(other.to_string()),
        }
    }
}
