//! QoS blob publication and lookup.
//!
//! Titles refresh their QoS payload every few frames; most refreshes carry
//! identical bytes, so unchanged payloads never reach the backend.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, instrument};
use xlive_core::{Result, SessionId, XliveError};

use crate::client::BackendClient;
use crate::types::QosBlob;

impl BackendClient {
    /// Record `payload` in the cache. Returns whether it changed.
    pub fn update_qos_cache(&self, session: SessionId, payload: &[u8]) -> bool {
        self.cache().update_qos(session, payload)
    }

    /// Publish `payload` unless the cache already holds the same bytes.
    ///
    /// Returns `true` when a request was sent. The cache only takes the new
    /// payload once the backend accepted it.
    #[instrument(skip_all, fields(%session, len = payload.len()))]
    pub fn publish_qos(&self, session: SessionId, payload: &[u8]) -> Result<bool> {
        if self
            .cache()
            .qos(session)
            .is_some_and(|cached| cached == payload)
        {
            debug!("qos unchanged");
            return Ok(false);
        }
        let path = self.session_path(session, "/qos");
        let body = QosBlob {
            data: STANDARD.encode(payload),
        };
        let _ = self.post(&path, &body).into_result(&path)?;
        let _ = self.cache().update_qos(session, payload);
        Ok(true)
    }

    /// QoS payload for `session`: cache first, then the backend. Empty or
    /// unreadable replies are returned as an empty payload and not cached.
    #[instrument(skip_all, fields(%session))]
    pub fn get_qos(&self, session: SessionId) -> Result<Vec<u8>> {
        if let Some(cached) = self.cache().qos(session) {
            return Ok(cached);
        }
        let path = self.session_path(session, "/qos");
        let Some(blob) = self.get(&path).into_complete::<QosBlob>(&path)? else {
            debug!("qos reply was incomplete");
            return Ok(Vec::new());
        };
        let payload = STANDARD
            .decode(blob.data.as_bytes())
            .map_err(|e| XliveError::MalformedPayload(format!("qos for {session}: {e}")))?;
        if !payload.is_empty() {
            let _ = self.cache().update_qos(session, &payload);
        }
        Ok(payload)
    }
}
