//! Adapters from decoded calls to manager and backend operations.
//!
//! [`CallHandler::execute`] runs one call end to end: decode the envelope,
//! perform the operation, write the typed result into the caller's region
//! and hand back the status code the title sees. Choosing which ordinal to
//! run is left to the caller.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tracing::{debug, warn};
use xlive_backend::BackendClient;
use xlive_backend::types::{SearchFilter, SessionDetails, SessionSearch, StatsColumn, StatsView};
use xlive_core::errors::x_result;
use xlive_core::{Result, SessionFlags, SlotType, XliveError};
use xlive_marshal::requests::{SlotRequest, StatColumn};
use xlive_marshal::results::{
    ArbitrationResult, CreateSessionResult, FindUsersResult, FoundUser, MachineEntry, PresenceEntry,
    PresenceResult, SearchHit, SearchResult, StorageResult,
};
use xlive_marshal::{
    CallEnvelope, MarshalError, Marshaller, RecordStatus, Request, ResultKind, encode_result,
    zero_result,
};

use crate::manager::SessionManager;

/// Typed result of one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallResult {
    /// Nothing to write.
    Empty,
    /// Session created.
    CreateSession(CreateSessionResult),
    /// Players resolved.
    FindUsers(FindUsersResult),
    /// Arbitration roster.
    Arbitration(ArbitrationResult),
    /// Friends presence.
    Presence(PresenceResult),
    /// Search hits.
    Search(SearchResult),
    /// Storage contents.
    Storage(StorageResult),
}

impl CallResult {
    /// Result shape.
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Empty => ResultKind::None,
            Self::CreateSession(_) => ResultKind::CreateSession,
            Self::FindUsers(_) => ResultKind::FindUsers,
            Self::Arbitration(_) => ResultKind::Arbitration,
            Self::Presence(_) => ResultKind::Presence,
            Self::Search(_) => ResultKind::Search,
            Self::Storage(_) => ResultKind::Storage,
        }
    }

    /// Zero `region` and write the result into it. Returns bytes used.
    pub fn write(&self, region: &mut [u8]) -> std::result::Result<usize, MarshalError> {
        match self {
            Self::Empty => {
                zero_result(region);
                Ok(0)
            }
            Self::CreateSession(r) => encode_result(r, region),
            Self::FindUsers(r) => encode_result(r, region),
            Self::Arbitration(r) => encode_result(r, region),
            Self::Presence(r) => encode_result(r, region),
            Self::Search(r) => encode_result(r, region),
            Self::Storage(r) => encode_result(r, region),
        }
    }
}

fn session_flags(raw: u32) -> Result<SessionFlags> {
    SessionFlags::from_bits(raw).ok_or_else(|| {
        XliveError::invalid_parameter(format!("unknown session flag bits in {raw:#x}"))
    })
}

fn stats_views(columns: &[StatColumn]) -> Vec<StatsView> {
    let mut views: BTreeMap<u32, Vec<StatsColumn>> = BTreeMap::new();
    for column in columns {
        views.entry(column.view_id).or_default().push(StatsColumn {
            id: column.column_id,
            value: column.value,
        });
    }
    views
        .into_iter()
        .map(|(view_id, columns)| StatsView { view_id, columns })
        .collect()
}

fn search_hit(details: &SessionDetails) -> SearchHit {
    SearchHit {
        session_id: details.session_id,
        host_xuid: details.host_xuid,
        host_address: details.host_address.unwrap_or(Ipv4Addr::UNSPECIFIED),
        open_public: details.open_public_slots_count,
        open_private: details.open_private_slots_count,
        filled_public: details.filled_public_slots_count,
        filled_private: details.filled_private_slots_count,
    }
}

/// Runs decoded calls against a manager.
#[derive(Debug)]
pub struct CallHandler<'m> {
    manager: &'m mut SessionManager,
}

impl<'m> CallHandler<'m> {
    /// Handler over `manager`.
    pub fn new(manager: &'m mut SessionManager) -> Self {
        Self { manager }
    }

    fn backend(&self) -> Result<Arc<BackendClient>> {
        let backend = self
            .manager
            .backend()
            .cloned()
            .ok_or_else(|| XliveError::TransportFailure("no backend configured".to_string()))?;
        backend.require_online()?;
        Ok(backend)
    }

    /// Decode, run and write back one call. Returns the title's status code.
    ///
    /// The result region is resolved and checked against the result header
    /// before the call runs, so an unwritable region never leaves state
    /// behind. On any failure the region, when it can be resolved, is left
    /// zeroed.
    pub fn execute(
        &mut self,
        marshaller: &Marshaller,
        envelope: &CallEnvelope,
        memory: &mut [u8],
    ) -> u32 {
        match self.execute_inner(marshaller, envelope, memory) {
            Ok(used) => {
                debug!(ordinal = envelope.ordinal, used, "call complete");
                x_result::SUCCESS
            }
            Err(err) => {
                if let Ok(region) = envelope.result.region(memory) {
                    zero_result(region);
                }
                warn!(ordinal = envelope.ordinal, code = %err.code(), error = %err, "call failed");
                err.x_result()
            }
        }
    }

    fn execute_inner(
        &mut self,
        marshaller: &Marshaller,
        envelope: &CallEnvelope,
        memory: &mut [u8],
    ) -> Result<usize> {
        let call = marshaller.decode(envelope)?;
        if call.result_kind != ResultKind::None {
            let capacity = call.result.region(memory)?.len();
            let required = call.result_kind.header_len();
            if capacity < required {
                return Err(XliveError::InsufficientBuffer { required, capacity });
            }
        }
        let result = self.handle(call.request)?;
        if result.kind() != call.result_kind && result.kind() != ResultKind::None {
            return Err(XliveError::invalid_parameter(format!(
                "{:?} produced a {:?} result, schema expects {:?}",
                call.kind,
                result.kind(),
                call.result_kind
            )));
        }
        if call.result_kind == ResultKind::None {
            return Ok(0);
        }
        let region = call.result.region(memory)?;
        Ok(result.write(region)?)
    }

    /// Run one typed request.
    pub fn handle(&mut self, request: Request) -> Result<CallResult> {
        match request {
            Request::CreateSession { user_index, slots } => self.create(user_index, slots),
            Request::ModifySession { session_id, slots } => {
                let flags = session_flags(slots.flags)?;
                self.manager
                    .modify(session_id, flags, slots.public_slots, slots.private_slots)?;
                Ok(CallResult::Empty)
            }
            Request::JoinSession { session_id, members } => {
                let members = members
                    .into_iter()
                    .filter(|m| m.status == RecordStatus::Valid)
                    .map(|m| {
                        let slot = if m.private { SlotType::Private } else { SlotType::Public };
                        self.manager.member_for(m.xuid, m.machine_id, slot)
                    })
                    .collect();
                let _ = self.manager.join(session_id, members)?;
                Ok(CallResult::Empty)
            }
            Request::LeaveSession { session_id, members } => {
                let xuids: Vec<_> = members
                    .into_iter()
                    .filter(|(_, status)| *status == RecordStatus::Valid)
                    .map(|(xuid, _)| xuid)
                    .collect();
                let _ = self.manager.leave(session_id, &xuids)?;
                Ok(CallResult::Empty)
            }
            Request::StartSession { session_id } => {
                self.manager.start(session_id)?;
                Ok(CallResult::Empty)
            }
            Request::EndSession { session_id } => {
                self.manager.end(session_id)?;
                Ok(CallResult::Empty)
            }
            Request::DeleteSession { session_id } => {
                self.manager.delete(session_id)?;
                Ok(CallResult::Empty)
            }
            Request::MigrateHost {
                session_id,
                user_index,
            } => {
                let host = self.manager.local_host(user_index)?;
                let _ = self.manager.migrate_host(session_id, host)?;
                Ok(CallResult::Empty)
            }
            Request::RegisterArbitration { session_id, nonce } => {
                let groups = self.manager.register_arbitration(session_id, nonce)?;
                Ok(CallResult::Arbitration(ArbitrationResult {
                    nonce,
                    machines: groups
                        .into_iter()
                        .map(|g| MachineEntry {
                            machine_id: g.machine_id,
                            members: g.members,
                        })
                        .collect(),
                }))
            }
            Request::FindUsers { users, .. } => Ok(CallResult::FindUsers(FindUsersResult {
                users: users
                    .into_iter()
                    .filter(|u| u.status == RecordStatus::Valid)
                    .map(|u| FoundUser {
                        xuid: u.xuid,
                        gamertag: u.gamertag,
                    })
                    .collect(),
            })),
            Request::FriendsPresence { user_index } => self.friends_presence(user_index),
            Request::SearchSessions {
                user_index,
                query_id,
                max_results,
                properties,
            } => {
                let _ = self.manager.local_user(user_index)?;
                let backend = self.backend()?;
                let search = SessionSearch {
                    search_index: query_id,
                    results_count: max_results,
                    properties: properties
                        .iter()
                        .map(|p| SearchFilter {
                            id: p.id,
                            value: p.value,
                        })
                        .collect(),
                };
                let hits = backend.search_sessions(&search)?;
                Ok(CallResult::Search(SearchResult {
                    hits: hits.iter().map(search_hit).collect(),
                }))
            }
            Request::WriteStats {
                session_id,
                xuid,
                columns,
            } => {
                let session = self.manager.get(session_id)?;
                if !session.flags().contains(SessionFlags::USES_STATS) {
                    return Err(XliveError::invalid_parameter(format!(
                        "session {session_id} does not use stats"
                    )));
                }
                self.backend()?
                    .write_stats(session_id, xuid, stats_views(&columns))?;
                Ok(CallResult::Empty)
            }
            Request::StorageDownload { user_index, path } => {
                let _ = self.manager.local_user(user_index)?;
                let data = self.backend()?.download(&path)?;
                Ok(CallResult::Storage(StorageResult { data }))
            }
            Request::StorageDelete { user_index, path } => {
                let _ = self.manager.local_user(user_index)?;
                if self.backend()?.delete_file(&path)? {
                    Ok(CallResult::Empty)
                } else {
                    Err(XliveError::NotFound(path))
                }
            }
        }
    }

    fn create(&mut self, user_index: u32, slots: SlotRequest) -> Result<CallResult> {
        let flags = session_flags(slots.flags)?;
        let info = self
            .manager
            .create(user_index, slots.public_slots, slots.private_slots, flags)?;
        Ok(CallResult::CreateSession(CreateSessionResult {
            session_id: info.session_id,
            nonce: info.nonce,
            host_address: info.host.address,
            host_mac: info.host.mac,
        }))
    }

    fn friends_presence(&self, user_index: u32) -> Result<CallResult> {
        let _ = self.manager.local_user(user_index)?;
        let records = match self.manager.backend() {
            Some(backend) => backend.get_all_friends_presence(user_index),
            None => Vec::new(),
        };
        Ok(CallResult::Presence(PresenceResult {
            entries: records.iter().map(PresenceEntry::from).collect(),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerConfig;
    use assert_matches::assert_matches;
    use serde_json::json;
    use xlive_backend::testing::{ScriptedTransport, client_with, identity};
    use xlive_core::{MachineId, SessionId, Xuid};
    use xlive_marshal::requests::{FindUserEntry, JoinEntry, SearchProperty};
    use xlive_marshal::{ResultDescriptor, decode_result};

    const HOST: Xuid = Xuid::new(0x0009_0000_0000_0001);

    fn manager() -> SessionManager {
        let mut manager = SessionManager::new(ManagerConfig::default(), Arc::new(identity()));
        manager.sign_in(0, HOST).unwrap();
        manager
    }

    fn online(transport: ScriptedTransport) -> (SessionManager, ScriptedTransport) {
        let (client, transport) = client_with(transport);
        (manager().with_backend(client), transport)
    }

    fn slots(flags: SessionFlags, public: u32) -> SlotRequest {
        SlotRequest {
            flags: flags.bits(),
            public_slots: public,
            private_slots: 0,
        }
    }

    fn create(handler: &mut CallHandler<'_>, flags: SessionFlags) -> SessionId {
        match handler
            .handle(Request::CreateSession {
                user_index: 0,
                slots: slots(flags, 8),
            })
            .unwrap()
        {
            CallResult::CreateSession(r) => r.session_id,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn join_entry(xuid: u64, status: RecordStatus) -> JoinEntry {
        JoinEntry {
            xuid: Xuid::new(xuid),
            machine_id: MachineId::new(xuid),
            private: false,
            status,
        }
    }

    #[test]
    fn execute_create_writes_result_region() {
        let marshaller = Marshaller::standard().unwrap();
        let request = Request::CreateSession {
            user_index: 0,
            slots: slots(SessionFlags::SYSTEMLINK, 4),
        };
        let (ordinal, payload) = marshaller.encode_request(&request).unwrap();
        let len = payload.len();
        let envelope = marshaller
            .envelope(ordinal, payload, len, ResultDescriptor::new(16, 64))
            .unwrap();
        let mut memory = vec![0xEEu8; 128];

        let mut manager = manager();
        let status = CallHandler::new(&mut manager).execute(&marshaller, &envelope, &mut memory);
        assert_eq!(status, x_result::SUCCESS);

        let result: CreateSessionResult = decode_result(&memory[16..80]).unwrap();
        assert!(manager.get(result.session_id).is_ok());
        assert_eq!(result.host_address, identity().address);
        assert_eq!(&memory[..16], &[0xEE; 16]);
    }

    #[test]
    fn execute_reports_status_and_zeroes_region() {
        let marshaller = Marshaller::standard().unwrap();
        let request = Request::StartSession {
            session_id: SessionId::new(0xAE00_0000_0000_0099),
        };
        let (ordinal, payload) = marshaller.encode_request(&request).unwrap();
        let len = payload.len();
        let envelope = marshaller
            .envelope(ordinal, payload, len, ResultDescriptor::new(0, 8))
            .unwrap();
        let mut memory = vec![0xFFu8; 8];
        let mut manager = manager();
        let status = CallHandler::new(&mut manager).execute(&marshaller, &envelope, &mut memory);
        assert_eq!(status, x_result::INVALID_HANDLE);
        assert_eq!(memory, vec![0; 8]);
    }

    #[test]
    fn truncated_payload_is_invalid_data() {
        let marshaller = Marshaller::standard().unwrap();
        let request = Request::DeleteSession {
            session_id: SessionId::new(1),
        };
        let (ordinal, mut payload) = marshaller.encode_request(&request).unwrap();
        let declared = payload.len();
        let _ = payload.pop();
        let envelope = marshaller
            .envelope(ordinal, payload, declared, ResultDescriptor::new(0, 0))
            .unwrap();
        let mut manager = manager();
        let status = CallHandler::new(&mut manager).execute(&marshaller, &envelope, &mut []);
        assert_eq!(status, x_result::INVALID_DATA);
    }

    fn create_envelope(
        marshaller: &Marshaller,
        flags: SessionFlags,
        result: ResultDescriptor,
    ) -> CallEnvelope {
        let request = Request::CreateSession {
            user_index: 0,
            slots: slots(flags, 4),
        };
        let (ordinal, payload) = marshaller.encode_request(&request).unwrap();
        let len = payload.len();
        marshaller.envelope(ordinal, payload, len, result).unwrap()
    }

    #[test]
    fn small_result_region_creates_nothing() {
        let marshaller = Marshaller::standard().unwrap();
        let mut manager = manager();
        let mut memory = vec![0xAAu8; 8];
        for capacity in [4, 8] {
            let region = ResultDescriptor::new(0, capacity);
            let envelope = create_envelope(&marshaller, SessionFlags::SYSTEMLINK, region);
            let status =
                CallHandler::new(&mut manager).execute(&marshaller, &envelope, &mut memory);
            assert_eq!(status, x_result::INSUFFICIENT_BUFFER);
            assert_eq!(&memory[..capacity], &vec![0; capacity][..]);
        }
        assert!(manager.is_empty());
    }

    #[test]
    fn out_of_bounds_region_creates_nothing() {
        let marshaller = Marshaller::standard().unwrap();
        let mut memory = vec![0u8; 32];
        let region = ResultDescriptor::new(16, 64);
        let envelope = create_envelope(&marshaller, SessionFlags::SYSTEMLINK, region);
        let mut manager = manager();
        let status = CallHandler::new(&mut manager).execute(&marshaller, &envelope, &mut memory);
        assert_eq!(status, x_result::INVALID_DATA);
        assert!(manager.is_empty());
    }

    #[test]
    fn unwritable_region_never_reaches_backend() {
        let marshaller = Marshaller::standard().unwrap();
        let (mut manager, transport) = online(ScriptedTransport::new());
        let envelope = create_envelope(
            &marshaller,
            SessionFlags::LIVE_MULTIPLAYER_STANDARD,
            ResultDescriptor::new(0, 4),
        );
        let mut memory = vec![0u8; 4];
        let status = CallHandler::new(&mut manager).execute(&marshaller, &envelope, &mut memory);
        assert_eq!(status, x_result::INSUFFICIENT_BUFFER);
        assert!(manager.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn skip_invalid_records_are_ignored() {
        let mut manager = manager();
        let mut handler = CallHandler::new(&mut manager);
        let id = create(&mut handler, SessionFlags::SYSTEMLINK);
        handler
            .handle(Request::JoinSession {
                session_id: id,
                members: vec![
                    join_entry(0x0009_0000_0000_0010, RecordStatus::Valid),
                    join_entry(0, RecordStatus::SkipInvalid),
                    join_entry(HOST.get(), RecordStatus::Valid),
                ],
            })
            .unwrap();
        let session = manager.get(id).unwrap();
        assert_eq!(session.filled_slots(), 2);
        assert!(session.members()[1].is_local());
    }

    #[test]
    fn leave_then_delete_through_calls() {
        let mut manager = manager();
        let mut handler = CallHandler::new(&mut manager);
        let id = create(&mut handler, SessionFlags::SYSTEMLINK);
        handler
            .handle(Request::JoinSession {
                session_id: id,
                members: vec![
                    join_entry(5, RecordStatus::Valid),
                    join_entry(6, RecordStatus::Valid),
                ],
            })
            .unwrap();
        handler
            .handle(Request::LeaveSession {
                session_id: id,
                members: vec![
                    (Xuid::new(5), RecordStatus::Valid),
                    (Xuid::new(6), RecordStatus::SkipInvalid),
                ],
            })
            .unwrap();
        handler.handle(Request::DeleteSession { session_id: id }).unwrap();
        assert_matches!(
            handler.handle(Request::EndSession { session_id: id }),
            Err(XliveError::InvalidHandle(_))
        );
    }

    #[test]
    fn unknown_flag_bits_rejected() {
        let mut manager = manager();
        let mut handler = CallHandler::new(&mut manager);
        let request = Request::CreateSession {
            user_index: 0,
            slots: SlotRequest {
                flags: 0x8000_0000,
                public_slots: 4,
                private_slots: 0,
            },
        };
        assert_matches!(handler.handle(request), Err(XliveError::InvalidParameter(_)));
    }

    #[test]
    fn arbitration_result_groups_members() {
        let mut manager = manager();
        let mut handler = CallHandler::new(&mut manager);
        let id = create(&mut handler, SessionFlags::LIVE_MULTIPLAYER_RANKED);
        handler
            .handle(Request::JoinSession {
                session_id: id,
                members: vec![
                    join_entry(5, RecordStatus::Valid),
                    join_entry(6, RecordStatus::Valid),
                ],
            })
            .unwrap();
        let result = handler
            .handle(Request::RegisterArbitration { session_id: id, nonce: 3 })
            .unwrap();
        assert_matches!(
            result,
            CallResult::Arbitration(r) if r.nonce == 3 && r.machines.len() == 2
        );
    }

    #[test]
    fn find_users_drops_skipped_records() {
        let mut manager = manager();
        let mut handler = CallHandler::new(&mut manager);
        let result = handler
            .handle(Request::FindUsers {
                requester: HOST,
                users: vec![
                    FindUserEntry {
                        xuid: Xuid::new(2),
                        gamertag: "Two".to_string(),
                        status: RecordStatus::Valid,
                    },
                    FindUserEntry {
                        xuid: Xuid::default(),
                        gamertag: String::new(),
                        status: RecordStatus::SkipInvalid,
                    },
                ],
            })
            .unwrap();
        assert_matches!(
            result,
            CallResult::FindUsers(r) if r.users.len() == 1 && r.users[0].gamertag == "Two"
        );
    }

    #[test]
    fn presence_without_backend_is_empty() {
        let mut manager = manager();
        let mut handler = CallHandler::new(&mut manager);
        let result = handler.handle(Request::FriendsPresence { user_index: 0 }).unwrap();
        assert_eq!(result, CallResult::Presence(PresenceResult::default()));
        assert_matches!(
            handler.handle(Request::FriendsPresence { user_index: 2 }),
            Err(XliveError::InvalidParameter(_))
        );
    }

    #[test]
    fn presence_from_backend() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            json!([{"xuid": "0009000000000002", "state": 1, "richPresence": "Menus"}]),
        );
        let (mut manager, _) = online(transport);
        let _ = manager
            .backend()
            .unwrap()
            .add_friend(0, Xuid::new(0x0009_0000_0000_0002))
            .unwrap();
        let mut handler = CallHandler::new(&mut manager);
        let result = handler.handle(Request::FriendsPresence { user_index: 0 }).unwrap();
        assert_matches!(
            result,
            CallResult::Presence(r) if r.entries.len() == 1 && r.entries[0].rich_presence == "Menus"
        );
    }

    #[test]
    fn search_maps_backend_hits() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            json!([{
                "sessionId": "AE00000000000001",
                "hostXuid": "0009000000000003",
                "hostAddress": "10.0.0.3",
                "openPublicSlotsCount": 3,
                "filledPublicSlotsCount": 5
            }]),
        );
        let (mut manager, transport) = online(transport);
        let mut handler = CallHandler::new(&mut manager);
        let result = handler
            .handle(Request::SearchSessions {
                user_index: 0,
                query_id: 7,
                max_results: 10,
                properties: vec![SearchProperty { id: 0x1000_0001, value: 2 }],
            })
            .unwrap();
        let CallResult::Search(search) = result else {
            panic!("expected search result");
        };
        assert_eq!(search.hits[0].host_address, Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(search.hits[0].open_public, 3);
        assert_eq!(transport.body(0)["properties"][0]["value"], 2);
    }

    #[test]
    fn search_needs_backend() {
        let mut manager = manager();
        let mut handler = CallHandler::new(&mut manager);
        let request = Request::SearchSessions {
            user_index: 0,
            query_id: 1,
            max_results: 1,
            properties: Vec::new(),
        };
        assert_matches!(handler.handle(request), Err(XliveError::TransportFailure(_)));
    }

    #[test]
    fn stats_group_by_view_and_require_flag() {
        let (mut manager, transport) = online(ScriptedTransport::new());
        let mut handler = CallHandler::new(&mut manager);
        let ranked = create(&mut handler, SessionFlags::LIVE_MULTIPLAYER_STANDARD);
        let lobby = create(&mut handler, SessionFlags::GROUP_LOBBY);
        let columns = vec![
            StatColumn { view_id: 2, column_id: 1, value: 10 },
            StatColumn { view_id: 1, column_id: 1, value: 20 },
            StatColumn { view_id: 2, column_id: 3, value: 30 },
        ];
        handler
            .handle(Request::WriteStats {
                session_id: ranked,
                xuid: HOST,
                columns: columns.clone(),
            })
            .unwrap();
        let sent = transport.requests();
        let body = transport.body(sent.len() - 1);
        assert_eq!(body["views"][0]["viewId"], 1);
        assert_eq!(body["views"][1]["columns"].as_array().map(Vec::len), Some(2));

        assert_matches!(
            handler.handle(Request::WriteStats {
                session_id: lobby,
                xuid: HOST,
                columns,
            }),
            Err(XliveError::InvalidParameter(_))
        );
    }

    #[test]
    fn storage_calls() {
        let transport = ScriptedTransport::new();
        transport.respond(200, json!({"data": "AQID"}));
        transport.respond(404, json!({}));
        let (mut manager, _) = online(transport);
        let mut handler = CallHandler::new(&mut manager);
        let result = handler
            .handle(Request::StorageDownload {
                user_index: 0,
                path: "saves/a".to_string(),
            })
            .unwrap();
        assert_eq!(result, CallResult::Storage(StorageResult { data: vec![1, 2, 3] }));
        assert_matches!(
            handler.handle(Request::StorageDelete {
                user_index: 0,
                path: "saves/a".to_string(),
            }),
            Err(XliveError::NotFound(_))
        );
    }
}
