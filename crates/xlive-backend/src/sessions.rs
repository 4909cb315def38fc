//! Session endpoints under `title/{title}/sessions`.

use tracing::{instrument, warn};
use xlive_core::{Result, SessionId, XliveError};

use crate::client::{BackendClient, Outcome};
use crate::types::{
    ArbitrationMachine, ArbitrationRegister, ArbitrationRoster, SessionCreate, SessionDetails,
    SessionJoin, SessionLeave, SessionMigrate, SessionModify, SessionSearch,
};

impl BackendClient {
    /// Publish a newly created session.
    #[instrument(skip_all, fields(session = %body.session_id))]
    pub fn create_session(&self, body: &SessionCreate) -> Result<()> {
        self.post(&self.title_path("sessions"), body)
            .into_result("sessions")
            .map(drop)
    }

    /// Fetch and cache details. A `404` leaves any cached copy untouched, as
    /// does a success whose body is missing or unreadable; the cached copy
    /// (or empty details) is returned then.
    #[instrument(skip_all, fields(%session))]
    pub fn session_details(&self, session: SessionId) -> Result<SessionDetails> {
        let path = self.session_path(session, "/details");
        let Some(details) = self.get(&path).into_complete::<SessionDetails>(&path)? else {
            warn!("session details reply was incomplete, keeping cached copy");
            return Ok(self.cache().details(session).unwrap_or_default());
        };
        self.cache().put_details(session, details.clone());
        Ok(details)
    }

    /// Details from the cache only.
    pub fn cached_session_details(&self, session: SessionId) -> Option<SessionDetails> {
        self.cache().details(session)
    }

    /// Every session the title has published.
    pub fn list_sessions(&self) -> Result<Vec<SessionDetails>> {
        let path = self.title_path("sessions");
        self.get(&path).into_typed(&path)
    }

    /// Change flags or slot counts.
    #[instrument(skip_all, fields(%session))]
    pub fn modify_session(&self, session: SessionId, body: &SessionModify) -> Result<()> {
        let path = self.session_path(session, "/modify");
        self.post(&path, body).into_result(&path).map(drop)
    }

    /// Add players.
    #[instrument(skip_all, fields(%session, count = body.xuids.len()))]
    pub fn join_session(&self, session: SessionId, body: &SessionJoin) -> Result<()> {
        let path = self.session_path(session, "/join");
        self.post(&path, body).into_result(&path).map(drop)
    }

    /// Remove players.
    #[instrument(skip_all, fields(%session, count = body.xuids.len()))]
    pub fn leave_session(&self, session: SessionId, body: &SessionLeave) -> Result<()> {
        let path = self.session_path(session, "/leave");
        self.post(&path, body).into_result(&path).map(drop)
    }

    /// Move hosting. The cache is cleared whatever the outcome.
    #[instrument(skip_all, fields(%session))]
    pub fn migrate_session(&self, session: SessionId, body: &SessionMigrate) -> Result<()> {
        self.cache().invalidate_all("host migrated");
        let path = self.session_path(session, "/migrate");
        self.post(&path, body).into_result(&path).map(drop)
    }

    /// Register for arbitration and return the backend's roster.
    #[instrument(skip_all, fields(%session))]
    pub fn register_arbitration(
        &self,
        session: SessionId,
        nonce: u64,
    ) -> Result<Vec<ArbitrationMachine>> {
        let path = self.session_path(session, "/arbitration");
        let roster: ArbitrationRoster = self
            .post(&path, &ArbitrationRegister { nonce })
            .into_typed(&path)?;
        Ok(roster.machines)
    }

    /// Search joinable sessions.
    #[instrument(skip_all, fields(query = body.search_index))]
    pub fn search_sessions(&self, body: &SessionSearch) -> Result<Vec<SessionDetails>> {
        let path = self.title_path("sessions/search");
        let mut hits: Vec<SessionDetails> = self.post(&path, body).into_typed(&path)?;
        hits.truncate(body.results_count as usize);
        Ok(hits)
    }

    /// Remove a session. Clears the cache first; a `404` counts as done.
    #[instrument(skip_all, fields(%session))]
    pub fn delete_session(&self, session: SessionId) -> Result<()> {
        self.cache().invalidate_all("session deleted");
        let path = self.session_path(session, "");
        let response = self.delete(&path);
        if response.outcome == Outcome::NotFound {
            warn!("session already gone on backend");
            return Ok(());
        }
        response.into_result(&path).map(drop)
    }

    /// Guard for operations that need the backend.
    pub fn require_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(XliveError::TransportFailure("backend offline".to_string()))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::testing::{ScriptedTransport, client_with};
    use crate::transport::Method;
    use crate::types::SearchFilter;
    use assert_matches::assert_matches;
    use serde_json::json;
    use xlive_core::{MacAddress, MachineId, Xuid};

    const SID: SessionId = SessionId::new(0xAE00_0000_0000_0042);

    #[test]
    fn details_404_keeps_cached_copy() {
        let transport = ScriptedTransport::new();
        transport.respond(200, json!({"sessionId": "AE00000000000042", "flags": 46}));
        transport.respond(404, json!({}));
        let (client, transport) = client_with(transport);

        let first = client.session_details(SID).unwrap();
        assert_eq!(first.flags, 46);
        assert_matches!(client.session_details(SID), Err(XliveError::NotFound(_)));
        assert_eq!(client.cached_session_details(SID), Some(first));
        assert!(
            transport.requests()[0]
                .url
                .ends_with("title/4D5307E6/sessions/AE00000000000042/details")
        );
    }

    #[test]
    fn unreadable_details_keep_cached_copy() {
        let transport = ScriptedTransport::new();
        transport.respond(200, json!({"sessionId": "AE00000000000042", "flags": 46}));
        transport.respond_raw(200, b"<html>gateway</html>");
        transport.respond_raw(200, b"");
        let (client, _) = client_with(transport);

        let first = client.session_details(SID).unwrap();
        assert_eq!(client.session_details(SID).unwrap(), first);
        assert_eq!(client.session_details(SID).unwrap().flags, 46);
        assert_eq!(client.cached_session_details(SID).unwrap().flags, 46);
    }

    #[test]
    fn unreadable_details_without_cache_are_empty() {
        let transport = ScriptedTransport::new();
        transport.respond_raw(200, b"not json");
        let (client, _) = client_with(transport);
        assert_eq!(client.session_details(SID).unwrap(), SessionDetails::default());
        assert!(client.cached_session_details(SID).is_none());
    }

    #[test]
    fn create_posts_to_sessions() {
        let (client, transport) = client_with(ScriptedTransport::new());
        client
            .create_session(&SessionCreate {
                session_id: SID,
                flags: 0x2E,
                public_slots_count: 8,
                private_slots_count: 0,
                user_index: 0,
                xuid: Xuid::new(0x0009_0000_0000_0001),
                host_address: Ipv4Addr::new(192, 168, 1, 10),
                mac_address: MacAddress([0, 0x50, 0xF2, 0, 0, 0x10]),
                machine_id: MachineId::new(1),
            })
            .unwrap();
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert!(sent.url.ends_with("title/4D5307E6/sessions"));
        assert_eq!(transport.body(0)["publicSlotsCount"], 8);
    }

    #[test]
    fn join_conflict_is_typed() {
        let transport = ScriptedTransport::new();
        transport.respond(409, json!({"message": "full"}));
        let (client, _) = client_with(transport);
        let body = SessionJoin {
            xuids: vec![Xuid::new(5)],
            private_slots: vec![false],
        };
        assert_matches!(
            client.join_session(SID, &body),
            Err(XliveError::Conflict(m)) if m == "full"
        );
    }

    #[test]
    fn delete_invalidates_even_when_backend_fails() {
        let transport = ScriptedTransport::new();
        transport.fail_next("timeout");
        let (client, transport) = client_with(transport);
        client
            .cache()
            .remember_peer(Ipv4Addr::new(10, 0, 0, 1), SID, MacAddress([1; 6]));

        assert_matches!(client.delete_session(SID), Err(XliveError::TransportFailure(_)));
        assert!(client.cache().is_empty());
        assert_eq!(transport.requests()[0].method, Method::Delete);
    }

    #[test]
    fn delete_of_missing_session_is_ok() {
        let transport = ScriptedTransport::new();
        transport.respond(404, json!({}));
        let (client, _) = client_with(transport);
        assert!(client.delete_session(SID).is_ok());
    }

    #[test]
    fn migrate_bumps_cache_epoch() {
        let (client, _) = client_with(ScriptedTransport::new());
        let before = client.cache().epoch();
        client
            .migrate_session(
                SID,
                &SessionMigrate {
                    xuid: Xuid::new(2),
                    host_address: Ipv4Addr::new(10, 0, 0, 2),
                    mac_address: MacAddress([2; 6]),
                    machine_id: MachineId::new(2),
                },
            )
            .unwrap();
        assert_eq!(client.cache().epoch(), before + 1);
    }

    #[test]
    fn search_truncates_to_requested_count() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            json!([
                {"sessionId": "0000000000000001"},
                {"sessionId": "0000000000000002"},
                {"sessionId": "0000000000000003"}
            ]),
        );
        let (client, transport) = client_with(transport);
        let hits = client
            .search_sessions(&SessionSearch {
                search_index: 3,
                results_count: 2,
                properties: vec![SearchFilter { id: 0x1000_0001, value: 4 }],
            })
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(transport.body(0)["searchIndex"], 3);
    }

    #[test]
    fn arbitration_roster_and_empty_body() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            json!({"machines": [{"machineId": "0000000000000009", "xuids": ["0000000000000001"]}]}),
        );
        transport.respond_raw(200, b"");
        let (client, _) = client_with(transport);
        let roster = client.register_arbitration(SID, 77).unwrap();
        assert_eq!(roster[0].machine_id, MachineId::new(9));
        assert!(client.register_arbitration(SID, 78).unwrap().is_empty());
    }

    #[test]
    fn server_error_on_list() {
        let transport = ScriptedTransport::new();
        transport.respond(500, json!({"error": "db down"}));
        let (client, _) = client_with(transport);
        assert_matches!(
            client.list_sessions(),
            Err(XliveError::ServerError { status: 500, message }) if message == "db down"
        );
    }
}
