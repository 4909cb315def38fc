//! Call envelopes and the marshaller facade.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::{decode_args, encode_args};
use crate::errors::MarshalError;
use crate::requests::Request;
use crate::result::{ResultDescriptor, WireResult, encode_result};
use crate::schema::{CallKind, ResultKind, SchemaTable};

/// One inbound call: which operation, where its bytes are, where its
/// result goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallEnvelope {
    /// Caller-supplied ordinal.
    pub ordinal: u32,
    /// Schema the ordinal resolved to.
    pub schema_index: u16,
    /// Raw payload; may extend past `declared_len`.
    pub payload: Vec<u8>,
    /// Declared payload length.
    pub declared_len: usize,
    /// Result region in caller memory.
    pub result: ResultDescriptor,
}

/// A decoded call ready for dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedCall {
    /// Caller-supplied ordinal.
    pub ordinal: u32,
    /// Operation.
    pub kind: CallKind,
    /// Typed request.
    pub request: Request,
    /// Result shape the schema promises.
    pub result_kind: ResultKind,
    /// Result region in caller memory.
    pub result: ResultDescriptor,
}

/// Validates envelopes, decodes payloads and writes results against one
/// schema table.
#[derive(Clone, Debug)]
pub struct Marshaller {
    table: Arc<SchemaTable>,
}

impl Marshaller {
    /// Marshaller over `table`.
    pub fn new(table: Arc<SchemaTable>) -> Self {
        Self { table }
    }

    /// Marshaller over [`SchemaTable::standard`].
    pub fn standard() -> Result<Self, MarshalError> {
        Ok(Self::new(Arc::new(SchemaTable::standard()?)))
    }

    /// The schema table.
    pub fn table(&self) -> &SchemaTable {
        &self.table
    }

    /// Resolve the ordinal and wrap the payload.
    pub fn envelope(
        &self,
        ordinal: u32,
        payload: Vec<u8>,
        declared_len: usize,
        result: ResultDescriptor,
    ) -> Result<CallEnvelope, MarshalError> {
        let schema_index = self.table.lookup_schema(ordinal)?;
        Ok(CallEnvelope {
            ordinal,
            schema_index,
            payload,
            declared_len,
            result,
        })
    }

    /// Decode an envelope into a typed request.
    pub fn decode(&self, envelope: &CallEnvelope) -> Result<DecodedCall, MarshalError> {
        let schema = self.table.schema(envelope.schema_index)?;
        let args = decode_args(
            &self.table,
            schema,
            &envelope.payload,
            envelope.declared_len,
        )
        .inspect_err(|err| {
            warn!(
                ordinal = envelope.ordinal,
                kind = ?schema.kind,
                error = %err,
                "rejected payload"
            );
        })?;
        let request = Request::from_args(schema.kind, &args)?;
        debug!(ordinal = envelope.ordinal, kind = ?schema.kind, "decoded call");
        Ok(DecodedCall {
            ordinal: envelope.ordinal,
            kind: schema.kind,
            request,
            result_kind: schema.result,
            result: envelope.result,
        })
    }

    /// Encode a request payload, returning `(ordinal, bytes)`.
    pub fn encode_request(&self, request: &Request) -> Result<(u32, Vec<u8>), MarshalError> {
        let kind = request.kind();
        let ordinal = self.table.ordinal_of(kind).ok_or_else(|| {
            MarshalError::InvalidSchema(format!("no ordinal registered for {kind:?}"))
        })?;
        let schema = self.table.schema(self.table.lookup_schema(ordinal)?)?;
        let bytes = encode_args(&self.table, schema, &request.to_args())?;
        Ok((ordinal, bytes))
    }

    /// URL template for an ordinal.
    pub fn url_for(&self, ordinal: u32) -> Result<&str, MarshalError> {
        let schema = self.table.schema(self.table.lookup_schema(ordinal)?)?;
        self.table.lookup_url(schema.url_index)
    }

    /// Write `value` into the region `descriptor` names inside `memory`.
    pub fn write_result<T: WireResult>(
        &self,
        value: &T,
        descriptor: ResultDescriptor,
        memory: &mut [u8],
    ) -> Result<usize, MarshalError> {
        let region = descriptor.region(memory)?;
        encode_result(value, region)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
