//! The standard call catalog.

use crate::errors::MarshalError;
use crate::schema::{
    CallKind, CallSchema, FieldKind, RepeatSpec, RequestShape, ResultKind, SchemaTable,
    StringSpec, field,
};

/// Catalog version.
pub const CATALOG_VERSION: u32 = 1;

/// Members per join or leave call.
pub const MAX_MEMBERS: u32 = 32;
/// Players per find-users call.
pub const MAX_FIND_USERS: u32 = 100;
/// Property filters per search.
pub const MAX_SEARCH_PROPERTIES: u32 = 64;
/// Columns per stats write.
pub const MAX_STAT_COLUMNS: u32 = 64;
/// Storage path length in UTF-16 units.
pub const MAX_STORAGE_PATH: usize = 256;

/// Ordinals of the standard catalog.
pub mod ordinals {
    /// Create a session.
    pub const CREATE_SESSION: u32 = 0x0100;
    /// Modify a session.
    pub const MODIFY_SESSION: u32 = 0x0101;
    /// Join a session.
    pub const JOIN_SESSION: u32 = 0x0102;
    /// Leave a session.
    pub const LEAVE_SESSION: u32 = 0x0103;
    /// Start a session.
    pub const START_SESSION: u32 = 0x0104;
    /// End a session.
    pub const END_SESSION: u32 = 0x0105;
    /// Delete a session.
    pub const DELETE_SESSION: u32 = 0x0106;
    /// Migrate the host.
    pub const MIGRATE_HOST: u32 = 0x0107;
    /// Register for arbitration.
    pub const REGISTER_ARBITRATION: u32 = 0x0108;
    /// Search sessions.
    pub const SEARCH_SESSIONS: u32 = 0x0109;
    /// Write stats.
    pub const WRITE_STATS: u32 = 0x010A;
    /// Find users.
    pub const FIND_USERS: u32 = 0x0200;
    /// Friends' presence.
    pub const FRIENDS_PRESENCE: u32 = 0x0201;
    /// Download from title storage.
    pub const STORAGE_DOWNLOAD: u32 = 0x0300;
    /// Delete from title storage.
    pub const STORAGE_DELETE: u32 = 0x0301;
}

fn session_only() -> RequestShape {
    RequestShape {
        fixed: vec![field("session", FieldKind::U64)],
        ..RequestShape::default()
    }
}

fn slots_shape(first: &'static str, first_kind: FieldKind) -> RequestShape {
    RequestShape {
        fixed: vec![
            field(first, first_kind),
            field("flags", FieldKind::U32),
            field("public_slots", FieldKind::U32),
            field("private_slots", FieldKind::U32),
        ],
        ..RequestShape::default()
    }
}

fn storage_shape() -> RequestShape {
    RequestShape {
        fixed: vec![field("user_index", FieldKind::U32)],
        strings: vec![StringSpec {
            name: "path",
            max_chars: MAX_STORAGE_PATH,
        }],
        repeat: None,
    }
}

impl SchemaTable {
    /// Build the standard catalog.
    pub fn standard() -> Result<Self, MarshalError> {
        use ordinals::*;

        let mut b = Self::builder(CATALOG_VERSION);
        let max_members = b.constant(MAX_MEMBERS);
        let max_find = b.constant(MAX_FIND_USERS);
        let max_props = b.constant(MAX_SEARCH_PROPERTIES);
        let max_columns = b.constant(MAX_STAT_COLUMNS);

        let sessions = b.url("title/{title}/sessions");
        let session = b.url("title/{title}/sessions/{session}");
        let modify = b.url("title/{title}/sessions/{session}/modify");
        let join = b.url("title/{title}/sessions/{session}/join");
        let leave = b.url("title/{title}/sessions/{session}/leave");
        let migrate = b.url("title/{title}/sessions/{session}/migrate");
        let arbitration = b.url("title/{title}/sessions/{session}/arbitration");
        let search = b.url("title/{title}/sessions/search");
        let stats = b.url("title/{title}/sessions/{session}/leaderboards");
        let find = b.url("players/find");
        let presence = b.url("players/presence");
        let storage = b.url("title/{title}/storage/{path}");

        let row = |kind, url_index, request, result| CallSchema {
            kind,
            url_index,
            request,
            result,
        };

        let _ = b
            .call(
                CREATE_SESSION,
                row(
                    CallKind::CreateSession,
                    sessions,
                    slots_shape("user_index", FieldKind::U32),
                    ResultKind::CreateSession,
                ),
            )
            .call(
                MODIFY_SESSION,
                row(
                    CallKind::ModifySession,
                    modify,
                    slots_shape("session", FieldKind::U64),
                    ResultKind::None,
                ),
            )
            .call(
                JOIN_SESSION,
                row(
                    CallKind::JoinSession,
                    join,
                    RequestShape {
                        repeat: Some(RepeatSpec {
                            name: "members",
                            record: vec![
                                field("xuid", FieldKind::U64),
                                field("machine_id", FieldKind::U64),
                                field("private", FieldKind::Bool),
                            ],
                            cap_constant: max_members,
                            key_field: Some(0),
                        }),
                        ..session_only()
                    },
                    ResultKind::None,
                ),
            )
            .call(
                LEAVE_SESSION,
                row(
                    CallKind::LeaveSession,
                    leave,
                    RequestShape {
                        repeat: Some(RepeatSpec {
                            name: "members",
                            record: vec![field("xuid", FieldKind::U64)],
                            cap_constant: max_members,
                            key_field: Some(0),
                        }),
                        ..session_only()
                    },
                    ResultKind::None,
                ),
            )
            .call(
                START_SESSION,
                row(CallKind::StartSession, session, session_only(), ResultKind::None),
            )
            .call(
                END_SESSION,
                row(CallKind::EndSession, session, session_only(), ResultKind::None),
            )
            .call(
                DELETE_SESSION,
                row(CallKind::DeleteSession, session, session_only(), ResultKind::None),
            )
            .call(
                MIGRATE_HOST,
                row(
                    CallKind::MigrateHost,
                    migrate,
                    RequestShape {
                        fixed: vec![
                            field("session", FieldKind::U64),
                            field("user_index", FieldKind::U32),
                        ],
                        ..RequestShape::default()
                    },
                    ResultKind::None,
                ),
            )
            .call(
                REGISTER_ARBITRATION,
                row(
                    CallKind::RegisterArbitration,
                    arbitration,
                    RequestShape {
                        fixed: vec![
                            field("session", FieldKind::U64),
                            field("nonce", FieldKind::U64),
                        ],
                        ..RequestShape::default()
                    },
                    ResultKind::Arbitration,
                ),
            )
            .call(
                SEARCH_SESSIONS,
                row(
                    CallKind::SearchSessions,
                    search,
                    RequestShape {
                        fixed: vec![
                            field("user_index", FieldKind::U32),
                            field("query_id", FieldKind::U32),
                            field("max_results", FieldKind::U32),
                        ],
                        strings: vec![],
                        repeat: Some(RepeatSpec {
                            name: "properties",
                            record: vec![
                                field("id", FieldKind::U32),
                                field("value", FieldKind::U64),
                            ],
                            cap_constant: max_props,
                            key_field: None,
                        }),
                    },
                    ResultKind::Search,
                ),
            )
            .call(
                WRITE_STATS,
                row(
                    CallKind::WriteStats,
                    stats,
                    RequestShape {
                        fixed: vec![
                            field("session", FieldKind::U64),
                            field("xuid", FieldKind::U64),
                        ],
                        strings: vec![],
                        repeat: Some(RepeatSpec {
                            name: "columns",
                            record: vec![
                                field("view_id", FieldKind::U32),
                                field("column_id", FieldKind::U16),
                                field("value", FieldKind::U64),
                            ],
                            cap_constant: max_columns,
                            key_field: None,
                        }),
                    },
                    ResultKind::None,
                ),
            )
            .call(
                FIND_USERS,
                row(
                    CallKind::FindUsers,
                    find,
                    RequestShape {
                        fixed: vec![field("requester", FieldKind::U64)],
                        strings: vec![],
                        repeat: Some(RepeatSpec {
                            name: "users",
                            record: vec![
                                field("xuid", FieldKind::U64),
                                field("gamertag", FieldKind::FixedText(16)),
                            ],
                            cap_constant: max_find,
                            key_field: Some(0),
                        }),
                    },
                    ResultKind::FindUsers,
                ),
            )
            .call(
                FRIENDS_PRESENCE,
                row(
                    CallKind::FriendsPresence,
                    presence,
                    RequestShape {
                        fixed: vec![field("user_index", FieldKind::U32)],
                        ..RequestShape::default()
                    },
                    ResultKind::Presence,
                ),
            )
            .call(
                STORAGE_DOWNLOAD,
                row(CallKind::StorageDownload, storage, storage_shape(), ResultKind::Storage),
            )
            .call(
                STORAGE_DELETE,
                row(CallKind::StorageDelete, storage, storage_shape(), ResultKind::None),
            );

        b.build()
    }
}

#[cfg(test)]
mod tests {
    use super::ordinals::*;
    use super::*;

    #[test]
    fn every_kind_has_an_ordinal() {
        let table = SchemaTable::standard().unwrap();
        assert_eq!(table.len(), 15);
        for kind in [
            CallKind::CreateSession,
            CallKind::ModifySession,
            CallKind::JoinSession,
            CallKind::LeaveSession,
            CallKind::StartSession,
            CallKind::EndSession,
            CallKind::DeleteSession,
            CallKind::MigrateHost,
            CallKind::RegisterArbitration,
            CallKind::FindUsers,
            CallKind::FriendsPresence,
            CallKind::SearchSessions,
            CallKind::WriteStats,
            CallKind::StorageDownload,
            CallKind::StorageDelete,
        ] {
            let ordinal = table.ordinal_of(kind).unwrap();
            let idx = table.lookup_schema(ordinal).unwrap();
            assert_eq!(table.schema(idx).unwrap().kind, kind);
        }
    }

    #[test]
    fn find_users_url_and_cap() {
        let table = SchemaTable::standard().unwrap();
        let schema = table
            .schema(table.lookup_schema(FIND_USERS).unwrap())
            .unwrap();
        assert_eq!(table.lookup_url(schema.url_index).unwrap(), "players/find");
        let repeat = schema.request.repeat.as_ref().unwrap();
        assert_eq!(table.constant(repeat.cap_constant).unwrap(), MAX_FIND_USERS);
    }

    #[test]
    fn start_end_delete_share_the_session_url() {
        let table = SchemaTable::standard().unwrap();
        let url = |ordinal| {
            let schema = table.schema(table.lookup_schema(ordinal).unwrap()).unwrap();
            table.lookup_url(schema.url_index).unwrap().to_string()
        };
        assert_eq!(url(START_SESSION), url(DELETE_SESSION));
        assert_eq!(url(END_SESSION), "title/{title}/sessions/{session}");
    }
}
