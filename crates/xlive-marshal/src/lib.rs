//! # xlive-marshal
//!
//! Moves call arguments between caller memory and typed requests, and typed
//! results back into caller-supplied regions.
//!
//! - [`schema`]: field layouts and the versioned [`SchemaTable`]
//! - [`catalog`]: the standard table ([`SchemaTable::standard`])
//! - [`codec`]: bounds-checked big-endian request codec
//! - [`requests`]: typed [`Request`]s
//! - [`result`] / [`results`]: zero-filled result regions and typed results
//! - [`envelope`]: [`CallEnvelope`] and the [`Marshaller`] facade
//!
//! Every failure is a [`MarshalError`] local to the call; nothing here holds
//! session or cache state.

#![deny(unsafe_code)]

pub mod args;
pub mod catalog;
pub mod codec;
pub mod envelope;
pub mod errors;
pub mod requests;
pub mod result;
pub mod results;
pub mod schema;

pub use args::{CallArgs, FieldValue, Record, RecordStatus};
pub use envelope::{CallEnvelope, DecodedCall, Marshaller};
pub use errors::MarshalError;
pub use requests::Request;
pub use result::{ResultDescriptor, WireResult, decode_result, encode_result, zero_result};
pub use schema::{CallKind, CallSchema, ResultKind, SchemaTable};
