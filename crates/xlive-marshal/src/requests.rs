//! Typed requests built from decoded arguments.
//!
//! Field order in every conversion mirrors the layouts in
//! [`crate::catalog`].

use xlive_core::{MachineId, SessionId, Xuid};

use crate::args::{CallArgs, FieldValue, Record, RecordStatus};
use crate::errors::MarshalError;
use crate::schema::CallKind;

/// Slot request shared by create and modify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotRequest {
    /// Raw session flags.
    pub flags: u32,
    /// Public slots.
    pub public_slots: u32,
    /// Private slots.
    pub private_slots: u32,
}

/// One member to add.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinEntry {
    /// Player.
    pub xuid: Xuid,
    /// Console the player is on.
    pub machine_id: MachineId,
    /// Take a private slot.
    pub private: bool,
    /// Record validity.
    pub status: RecordStatus,
}

/// One player to resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FindUserEntry {
    /// Player.
    pub xuid: Xuid,
    /// Gamertag hint.
    pub gamertag: String,
    /// Record validity.
    pub status: RecordStatus,
}

/// One search property filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchProperty {
    /// Property id.
    pub id: u32,
    /// Value to match.
    pub value: u64,
}

/// One leaderboard column write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatColumn {
    /// Leaderboard view.
    pub view_id: u32,
    /// Column within the view.
    pub column_id: u16,
    /// Value.
    pub value: u64,
}

/// A decoded, typed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Create a session hosted by a local user.
    CreateSession {
        /// Local user slot.
        user_index: u32,
        /// Flags and slot counts.
        slots: SlotRequest,
    },
    /// Change flags or slot counts.
    ModifySession {
        /// Target.
        session_id: SessionId,
        /// New flags and slot counts.
        slots: SlotRequest,
    },
    /// Add members.
    JoinSession {
        /// Target.
        session_id: SessionId,
        /// Members to add.
        members: Vec<JoinEntry>,
    },
    /// Remove members.
    LeaveSession {
        /// Target.
        session_id: SessionId,
        /// Members to remove, with record validity.
        members: Vec<(Xuid, RecordStatus)>,
    },
    /// Begin gameplay.
    StartSession {
        /// Target.
        session_id: SessionId,
    },
    /// Finish gameplay.
    EndSession {
        /// Target.
        session_id: SessionId,
    },
    /// Tear down.
    DeleteSession {
        /// Target.
        session_id: SessionId,
    },
    /// Hand hosting to a local user.
    MigrateHost {
        /// Target.
        session_id: SessionId,
        /// New host's local slot.
        user_index: u32,
    },
    /// Register for arbitration.
    RegisterArbitration {
        /// Target.
        session_id: SessionId,
        /// Caller-chosen nonce.
        nonce: u64,
    },
    /// Resolve players.
    FindUsers {
        /// Asking player.
        requester: Xuid,
        /// Players to resolve.
        users: Vec<FindUserEntry>,
    },
    /// Friends' presence for a local user.
    FriendsPresence {
        /// Local user slot.
        user_index: u32,
    },
    /// Search joinable sessions.
    SearchSessions {
        /// Local user slot.
        user_index: u32,
        /// Matchmaking query id.
        query_id: u32,
        /// Result limit.
        max_results: u32,
        /// Property filters.
        properties: Vec<SearchProperty>,
    },
    /// Post leaderboard columns.
    WriteStats {
        /// Target.
        session_id: SessionId,
        /// Player the stats belong to.
        xuid: Xuid,
        /// Columns.
        columns: Vec<StatColumn>,
    },
    /// Fetch a title storage file.
    StorageDownload {
        /// Local user slot.
        user_index: u32,
        /// Storage path.
        path: String,
    },
    /// Remove a title storage file.
    StorageDelete {
        /// Local user slot.
        user_index: u32,
        /// Storage path.
        path: String,
    },
}

impl Request {
    /// Operation this request performs.
    pub fn kind(&self) -> CallKind {
        match self {
            Self::CreateSession { .. } => CallKind::CreateSession,
            Self::ModifySession { .. } => CallKind::ModifySession,
            Self::JoinSession { .. } => CallKind::JoinSession,
            Self::LeaveSession { .. } => CallKind::LeaveSession,
            Self::StartSession { .. } => CallKind::StartSession,
            Self::EndSession { .. } => CallKind::EndSession,
            Self::DeleteSession { .. } => CallKind::DeleteSession,
            Self::MigrateHost { .. } => CallKind::MigrateHost,
            Self::RegisterArbitration { .. } => CallKind::RegisterArbitration,
            Self::FindUsers { .. } => CallKind::FindUsers,
            Self::FriendsPresence { .. } => CallKind::FriendsPresence,
            Self::SearchSessions { .. } => CallKind::SearchSessions,
            Self::WriteStats { .. } => CallKind::WriteStats,
            Self::StorageDownload { .. } => CallKind::StorageDownload,
            Self::StorageDelete { .. } => CallKind::StorageDelete,
        }
    }

    /// Build a typed request from decoded arguments.
    pub fn from_args(kind: CallKind, args: &CallArgs) -> Result<Self, MarshalError> {
        let mut f = args.fixed_reader();
        let request = match kind {
            CallKind::CreateSession => Self::CreateSession {
                user_index: f.u32()?,
                slots: SlotRequest {
                    flags: f.u32()?,
                    public_slots: f.u32()?,
                    private_slots: f.u32()?,
                },
            },
            CallKind::ModifySession => Self::ModifySession {
                session_id: SessionId::new(f.u64()?),
                slots: SlotRequest {
                    flags: f.u32()?,
                    public_slots: f.u32()?,
                    private_slots: f.u32()?,
                },
            },
            CallKind::JoinSession => Self::JoinSession {
                session_id: SessionId::new(f.u64()?),
                members: args
                    .records
                    .iter()
                    .map(|r| {
                        let mut rf = r.reader();
                        Ok(JoinEntry {
                            xuid: Xuid::new(rf.u64()?),
                            machine_id: MachineId::new(rf.u64()?),
                            private: rf.bool()?,
                            status: r.status,
                        })
                    })
                    .collect::<Result<_, MarshalError>>()?,
            },
            CallKind::LeaveSession => Self::LeaveSession {
                session_id: SessionId::new(f.u64()?),
                members: args
                    .records
                    .iter()
                    .map(|r| Ok((Xuid::new(r.reader().u64()?), r.status)))
                    .collect::<Result<_, MarshalError>>()?,
            },
            CallKind::StartSession => Self::StartSession {
                session_id: SessionId::new(f.u64()?),
            },
            CallKind::EndSession => Self::EndSession {
                session_id: SessionId::new(f.u64()?),
            },
            CallKind::DeleteSession => Self::DeleteSession {
                session_id: SessionId::new(f.u64()?),
            },
            CallKind::MigrateHost => Self::MigrateHost {
                session_id: SessionId::new(f.u64()?),
                user_index: f.u32()?,
            },
            CallKind::RegisterArbitration => Self::RegisterArbitration {
                session_id: SessionId::new(f.u64()?),
                nonce: f.u64()?,
            },
            CallKind::FindUsers => Self::FindUsers {
                requester: Xuid::new(f.u64()?),
                users: args
                    .records
                    .iter()
                    .map(|r| {
                        let mut rf = r.reader();
                        Ok(FindUserEntry {
                            xuid: Xuid::new(rf.u64()?),
                            gamertag: rf.text()?,
                            status: r.status,
                        })
                    })
                    .collect::<Result<_, MarshalError>>()?,
            },
            CallKind::FriendsPresence => Self::FriendsPresence {
                user_index: f.u32()?,
            },
            CallKind::SearchSessions => Self::SearchSessions {
                user_index: f.u32()?,
                query_id: f.u32()?,
                max_results: f.u32()?,
                properties: args
                    .records
                    .iter()
                    .map(|r| {
                        let mut rf = r.reader();
                        Ok(SearchProperty {
                            id: rf.u32()?,
                            value: rf.u64()?,
                        })
                    })
                    .collect::<Result<_, MarshalError>>()?,
            },
            CallKind::WriteStats => Self::WriteStats {
                session_id: SessionId::new(f.u64()?),
                xuid: Xuid::new(f.u64()?),
                columns: args
                    .records
                    .iter()
                    .map(|r| {
                        let mut rf = r.reader();
                        Ok(StatColumn {
                            view_id: rf.u32()?,
                            column_id: rf.u16()?,
                            value: rf.u64()?,
                        })
                    })
                    .collect::<Result<_, MarshalError>>()?,
            },
            CallKind::StorageDownload => Self::StorageDownload {
                user_index: f.u32()?,
                path: args.string(0)?.to_string(),
            },
            CallKind::StorageDelete => Self::StorageDelete {
                user_index: f.u32()?,
                path: args.string(0)?.to_string(),
            },
        };
        Ok(request)
    }

    /// Flatten into arguments in schema order.
    pub fn to_args(&self) -> CallArgs {
        use FieldValue::{Bool, Text, U16, U32, U64};

        let slots = |s: &SlotRequest| [U32(s.flags), U32(s.public_slots), U32(s.private_slots)];
        let mut args = CallArgs::default();
        match self {
            Self::CreateSession { user_index, slots: s } => {
                args.fixed.push(U32(*user_index));
                args.fixed.extend(slots(s));
            }
            Self::ModifySession { session_id, slots: s } => {
                args.fixed.push(U64(session_id.get()));
                args.fixed.extend(slots(s));
            }
            Self::JoinSession {
                session_id,
                members,
            } => {
                args.fixed.push(U64(session_id.get()));
                args.records = members
                    .iter()
                    .map(|m| Record {
                        fields: vec![U64(m.xuid.get()), U64(m.machine_id.get()), Bool(m.private)],
                        status: m.status,
                    })
                    .collect();
            }
            Self::LeaveSession {
                session_id,
                members,
            } => {
                args.fixed.push(U64(session_id.get()));
                args.records = members
                    .iter()
                    .map(|(xuid, status)| Record {
                        fields: vec![U64(xuid.get())],
                        status: *status,
                    })
                    .collect();
            }
            Self::StartSession { session_id }
            | Self::EndSession { session_id }
            | Self::DeleteSession { session_id } => args.fixed.push(U64(session_id.get())),
            Self::MigrateHost {
                session_id,
                user_index,
            } => args.fixed.extend([U64(session_id.get()), U32(*user_index)]),
            Self::RegisterArbitration { session_id, nonce } => {
                args.fixed.extend([U64(session_id.get()), U64(*nonce)]);
            }
            Self::FindUsers { requester, users } => {
                args.fixed.push(U64(requester.get()));
                args.records = users
                    .iter()
                    .map(|u| Record {
                        fields: vec![U64(u.xuid.get()), Text(u.gamertag.clone())],
                        status: u.status,
                    })
                    .collect();
            }
            Self::FriendsPresence { user_index } => args.fixed.push(U32(*user_index)),
            Self::SearchSessions {
                user_index,
                query_id,
                max_results,
                properties,
            } => {
                args.fixed
                    .extend([U32(*user_index), U32(*query_id), U32(*max_results)]);
                args.records = properties
                    .iter()
                    .map(|p| Record::valid(vec![U32(p.id), U64(p.value)]))
                    .collect();
            }
            Self::WriteStats {
                session_id,
                xuid,
                columns,
            } => {
                args.fixed.extend([U64(session_id.get()), U64(xuid.get())]);
                args.records = columns
                    .iter()
                    .map(|c| Record::valid(vec![U32(c.view_id), U16(c.column_id), U64(c.value)]))
                    .collect();
            }
            Self::StorageDownload { user_index, path }
            | Self::StorageDelete { user_index, path } => {
                args.fixed.push(U32(*user_index));
                args.strings.push(path.clone());
            }
        }
        args
    }
}
