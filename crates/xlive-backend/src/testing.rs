//! Scripted transport and fixtures for tests, here and in dependent crates.

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use xlive_core::{MacAddress, MachineId};

use crate::cache::BackendCache;
use crate::client::{BackendClient, ClientConfig};
use crate::errors::TransportError;
use crate::identity::StaticIdentity;
use crate::store::MemoryStore;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Title id used by [`client_with`].
pub const TITLE_ID: u32 = 0x4D53_07E6;

enum Scripted {
    Reply(u16, Vec<u8>),
    Fail(String),
}

/// Replays queued replies in order; an empty queue answers `200 {}`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    seen: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON reply.
    pub fn respond(&self, status: u16, body: Value) {
        self.script
            .lock()
            .push_back(Scripted::Reply(status, body.to_string().into_bytes()));
    }

    /// Queue a raw reply.
    pub fn respond_raw(&self, status: u16, body: &[u8]) {
        self.script
            .lock()
            .push_back(Scripted::Reply(status, body.to_vec()));
    }

    /// Queue a connection failure.
    pub fn fail_next(&self, message: &str) {
        self.script
            .lock()
            .push_back(Scripted::Fail(message.to_string()));
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }

    /// JSON body of request `index`.
    pub fn body(&self, index: usize) -> Value {
        let requests = self.requests();
        serde_json::from_slice(requests[index].body.as_deref().unwrap_or(&b"null"[..]))
            .unwrap_or(Value::Null)
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().push(request.clone());
        match self.script.lock().pop_front() {
            Some(Scripted::Reply(status, body)) => Ok(HttpResponse { status, body }),
            Some(Scripted::Fail(message)) => Err(TransportError::Connect(message)),
            None => Ok(HttpResponse {
                status: 200,
                body: b"{}".to_vec(),
            }),
        }
    }
}

/// Fixed identity used by [`client_with`].
pub fn identity() -> StaticIdentity {
    StaticIdentity {
        address: Ipv4Addr::new(192, 168, 1, 10),
        mac: MacAddress([0x00, 0x50, 0xF2, 0x00, 0x00, 0x10]),
        machine_id: MachineId::new(0xFA00_0000_0000_0010),
    }
}

/// Client over `transport` with an empty cache and memory store.
pub fn client_with(transport: ScriptedTransport) -> (Arc<BackendClient>, ScriptedTransport) {
    let client = BackendClient::new(
        ClientConfig::new("http://backend.test/", TITLE_ID),
        Arc::new(transport.clone()),
        Arc::new(BackendCache::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(identity()),
    );
    (Arc::new(client), transport)
}
