//! Backend client core: exchanges, outcome classification, peer
//! registration and address resolution.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use xlive_core::{MacAddress, Result, SessionId, XliveError, Xuid};
use xlive_settings::XliveSettings;

use crate::cache::BackendCache;
use crate::identity::NetworkIdentity;
use crate::store::KeyValueStore;
use crate::transport::{HttpRequest, Method, ReqwestTransport, Transport};
use crate::types::{PeerRecord, PeerRegistration, RegistrationAck};

/// Classified result of one exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx.
    Success,
    /// 404.
    NotFound,
    /// 409.
    Conflict,
    /// Any other status.
    ServerError,
    /// No response: timeout, refused connection, unreadable body.
    TransportFailure,
}

/// A classified response with its body already parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// Classification.
    pub outcome: Outcome,
    /// HTTP status, 0 when none arrived.
    pub status: u16,
    /// Parsed body; `{}` when absent or malformed.
    pub body: Value,
    /// Failure description for non-success outcomes.
    pub error: Option<String>,
    /// True when `body` is the `{}` stand-in for an absent or malformed body.
    pub degraded: bool,
}

impl Response {
    /// Classify a raw status and body.
    pub fn classify(status: u16, raw: &[u8]) -> Self {
        let (body, degraded) = parse_body(raw);
        let outcome = match status {
            200..=299 => Outcome::Success,
            404 => Outcome::NotFound,
            409 => Outcome::Conflict,
            _ => Outcome::ServerError,
        };
        let error = (outcome != Outcome::Success)
            .then(|| error_message(&body).unwrap_or_else(|| format!("HTTP {status}")));
        Self {
            outcome,
            status,
            body,
            error,
            degraded,
        }
    }

    /// A response that never arrived.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::TransportFailure,
            status: 0,
            body: empty_body(),
            error: Some(message.into()),
            degraded: true,
        }
    }

    /// True on 2xx.
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Body on success, otherwise the matching taxonomy error. `what` names
    /// the resource for `NotFound`.
    pub fn into_result(self, what: &str) -> Result<Value> {
        let message = self.error.unwrap_or_default();
        match self.outcome {
            Outcome::Success => Ok(self.body),
            Outcome::NotFound => Err(XliveError::NotFound(what.to_string())),
            Outcome::Conflict => Err(XliveError::Conflict(message)),
            Outcome::ServerError => Err(XliveError::ServerError {
                status: self.status,
                message,
            }),
            Outcome::TransportFailure => Err(XliveError::TransportFailure(message)),
        }
    }

    /// Typed body on success.
    pub fn into_typed<T: DeserializeOwned + Default>(self, what: &str) -> Result<T> {
        self.into_result(what).map(decode_or_default)
    }

    /// Typed body on success, or `None` when the body degraded, was empty,
    /// or had the wrong shape.
    pub fn into_complete<T: DeserializeOwned>(self, what: &str) -> Result<Option<T>> {
        let degraded = self.degraded;
        let body = self.into_result(what)?;
        if degraded || body.as_object().is_some_and(serde_json::Map::is_empty) {
            return Ok(None);
        }
        Ok(serde_json::from_value(body)
            .inspect_err(|e| warn!(error = %e, what, "unexpected response shape"))
            .ok())
    }
}

fn empty_body() -> Value {
    Value::Object(serde_json::Map::new())
}

fn parse_body(raw: &[u8]) -> (Value, bool) {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return (empty_body(), true);
    }
    match serde_json::from_slice(raw) {
        Ok(body) => (body, false),
        Err(e) => {
            debug!(error = %e, "response body is not JSON, treating as empty");
            (empty_body(), true)
        }
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Deserialize `value`, falling back to `T::default()` for empty or
/// mismatched bodies.
pub(crate) fn decode_or_default<T: DeserializeOwned + Default>(value: Value) -> T {
    if value.as_object().is_some_and(serde_json::Map::is_empty) {
        return serde_json::from_value(value).unwrap_or_default();
    }
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "unexpected response shape, using empty value");
        T::default()
    })
}

/// Connection parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL, always ending in `/`.
    pub base_url: String,
    /// Title id keying the resource hierarchy.
    pub title_id: u32,
    /// Per-exchange timeout.
    pub timeout: Duration,
    /// Whether the online capability may be used at all.
    pub online_enabled: bool,
    /// Fall back to the backend on address cache misses.
    pub resolve_on_miss: bool,
}

impl ClientConfig {
    /// Config for `base_url` with defaults for everything else.
    pub fn new(base_url: &str, title_id: u32) -> Self {
        Self {
            base_url: normalize_base(base_url),
            title_id,
            timeout: Duration::from_secs(5),
            online_enabled: true,
            resolve_on_miss: true,
        }
    }
}

impl From<&XliveSettings> for ClientConfig {
    fn from(settings: &XliveSettings) -> Self {
        Self {
            base_url: normalize_base(&settings.backend.api_url),
            title_id: settings.backend.title_id,
            timeout: Duration::from_millis(settings.backend.timeout_ms),
            online_enabled: settings.backend.online_enabled,
            resolve_on_miss: settings.cache.resolve_on_miss,
        }
    }
}

fn normalize_base(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

/// Client for the coordination service.
///
/// Every exchange is a blocking round-trip bounded by the configured
/// timeout; failures never retry implicitly.
pub struct BackendClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    cache: Arc<BackendCache>,
    pub(crate) store: Arc<dyn KeyValueStore>,
    identity: Arc<dyn NetworkIdentity>,
    online: AtomicBool,
    xuid_mismatch: AtomicBool,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("config", &self.config)
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Client over an explicit transport.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        cache: Arc<BackendCache>,
        store: Arc<dyn KeyValueStore>,
        identity: Arc<dyn NetworkIdentity>,
    ) -> Self {
        let online = AtomicBool::new(config.online_enabled);
        Self {
            transport,
            config,
            cache,
            store,
            identity,
            online,
            xuid_mismatch: AtomicBool::new(false),
        }
    }

    /// Client using the `reqwest` transport and loaded settings.
    pub fn from_settings(
        settings: &XliveSettings,
        cache: Arc<BackendCache>,
        store: Arc<dyn KeyValueStore>,
        identity: Arc<dyn NetworkIdentity>,
    ) -> Result<Self> {
        let transport = ReqwestTransport::new(&settings.backend.user_agent)?;
        Ok(Self::new(
            ClientConfig::from(settings),
            Arc::new(transport),
            cache,
            store,
            identity,
        ))
    }

    /// Connection parameters.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared cache.
    pub fn cache(&self) -> &Arc<BackendCache> {
        &self.cache
    }

    /// Network identity.
    pub fn identity(&self) -> &Arc<dyn NetworkIdentity> {
        &self.identity
    }

    /// Whether online features are usable.
    pub fn is_online(&self) -> bool {
        self.config.online_enabled && self.online.load(Ordering::Acquire)
    }

    /// Whether the last registration echoed a different player.
    pub fn xuid_mismatch(&self) -> bool {
        self.xuid_mismatch.load(Ordering::Acquire)
    }

    /// `title/{title}/{rest}`.
    pub(crate) fn title_path(&self, rest: &str) -> String {
        format!("title/{:08X}/{rest}", self.config.title_id)
    }

    /// `title/{title}/sessions/{session}{suffix}`.
    pub(crate) fn session_path(&self, session: SessionId, suffix: &str) -> String {
        self.title_path(&format!("sessions/{session}{suffix}"))
    }

    #[instrument(skip_all, fields(method = %method, path = %path))]
    fn exchange(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Response {
        let request = HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url),
            headers: Vec::new(),
            body,
            timeout: self.config.timeout,
        };
        match self.transport.execute(&request) {
            Ok(raw) => {
                let response = Response::classify(raw.status, &raw.body);
                debug!(status = raw.status, outcome = ?response.outcome, "exchange complete");
                response
            }
            Err(e) => {
                debug!(error = %e, "exchange failed");
                Response::transport_failure(e.to_string())
            }
        }
    }

    /// `GET path`.
    pub fn get(&self, path: &str) -> Response {
        self.exchange(Method::Get, path, None)
    }

    /// `POST path` with a JSON body.
    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Response {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.exchange(Method::Post, path, Some(bytes)),
            Err(e) => Response::transport_failure(format!("could not encode body: {e}")),
        }
    }

    /// `DELETE path`.
    pub fn delete(&self, path: &str) -> Response {
        self.exchange(Method::Delete, path, None)
    }

    /// Register this machine for `xuid`.
    ///
    /// Success enables the online capability. Failure disables it and leaves
    /// local play untouched. If the backend echoes a different player the
    /// mismatch flag is set and registration still counts as successful.
    #[instrument(skip_all, fields(xuid = %xuid))]
    pub fn register_peer(&self, xuid: Xuid) -> Result<()> {
        if !self.config.online_enabled {
            debug!("online disabled, skipping registration");
            return Ok(());
        }
        let body = PeerRegistration {
            xuid,
            machine_id: self.identity.machine_id(),
            host_address: self.identity.address(),
            mac_address: self.identity.mac(),
        };
        match self.post("players", &body).into_typed::<RegistrationAck>("players") {
            Ok(ack) => {
                match ack.xuid {
                    Some(echoed) if echoed != xuid => {
                        self.xuid_mismatch.store(true, Ordering::Release);
                        warn!(%echoed, "backend registered a different player for this machine");
                    }
                    _ => self.xuid_mismatch.store(false, Ordering::Release),
                }
                self.online.store(true, Ordering::Release);
                info!("peer registered");
                Ok(())
            }
            Err(e) => {
                self.online.store(false, Ordering::Release);
                warn!(error = %e, "peer registration failed, online features disabled");
                Err(e)
            }
        }
    }

    /// Ask the backend who is at `addr`, caching what comes back.
    #[instrument(skip_all, fields(addr = %addr))]
    pub fn find_peer(&self, addr: Ipv4Addr) -> Result<PeerRecord> {
        let query = serde_json::json!({ "hostAddress": addr });
        let record: PeerRecord = self.post("players/find", &query).into_typed("peer")?;
        if !record.xuid.is_valid() && !record.session_id.is_valid() {
            return Err(XliveError::NotFound(format!("peer at {addr}")));
        }
        self.cache.remember_peer(addr, record.session_id, record.mac_address);
        Ok(record)
    }

    /// Session id for a peer address: cache first, then the backend.
    pub fn session_id_for_address(&self, addr: Ipv4Addr) -> Result<SessionId> {
        if let Some(id) = self.cache.session_for(addr) {
            return Ok(id);
        }
        if !self.config.resolve_on_miss {
            return Err(XliveError::NotFound(format!("session for {addr}")));
        }
        let record = self.find_peer(addr)?;
        if record.session_id.is_valid() {
            Ok(record.session_id)
        } else {
            Err(XliveError::NotFound(format!("session for {addr}")))
        }
    }

    /// Link-layer address for a peer address: cache first, then the backend.
    pub fn mac_for_address(&self, addr: Ipv4Addr) -> Result<MacAddress> {
        if let Some(mac) = self.cache.mac_for(addr) {
            return Ok(mac);
        }
        if !self.config.resolve_on_miss {
            return Err(XliveError::NotFound(format!("mac for {addr}")));
        }
        let record = self.find_peer(addr)?;
        if record.mac_address.is_zero() {
            Err(XliveError::NotFound(format!("mac for {addr}")))
        } else {
            Ok(record.mac_address)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
