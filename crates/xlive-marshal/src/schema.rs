//! Call schemas and the versioned schema table.
//!
//! The table is plain data: an ordinal index sorted for binary search, the
//! schemas themselves, a URL offset table and a constants table that repeat
//! caps refer to by index. Adding a call means adding a row, not a branch.

use crate::errors::MarshalError;
use crate::result::WireResult;
use crate::results::{
    ArbitrationResult, CreateSessionResult, FindUsersResult, PresenceResult, SearchResult,
    StorageResult,
};

/// Wire kind of a fixed-width field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// One byte.
    U8,
    /// Two bytes, big-endian.
    U16,
    /// Four bytes, big-endian.
    U32,
    /// Eight bytes, big-endian.
    U64,
    /// Four bytes, only 0 or 1.
    Bool,
    /// Opaque bytes of fixed length.
    Bytes(usize),
    /// NUL-padded UTF-16BE text of a fixed number of code units.
    FixedText(usize),
}

impl FieldKind {
    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::Bool => 4,
            Self::U64 => 8,
            Self::Bytes(n) => n,
            Self::FixedText(n) => n * 2,
        }
    }

    /// Short name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Bool => "bool",
            Self::Bytes(_) => "bytes",
            Self::FixedText(_) => "text",
        }
    }
}

/// A named fixed-width field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// Wire kind.
    pub kind: FieldKind,
}

/// Shorthand constructor for [`FieldSpec`].
pub const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// A length-prefixed UTF-16BE string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringSpec {
    /// Field name.
    pub name: &'static str,
    /// Maximum UTF-16 code units.
    pub max_chars: usize,
}

/// A counted run of fixed-layout records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepeatSpec {
    /// Section name.
    pub name: &'static str,
    /// Layout of one record.
    pub record: Vec<FieldSpec>,
    /// Index into the constants table holding the count cap.
    pub cap_constant: usize,
    /// Record field that must be non-zero for the record to be valid.
    pub key_field: Option<usize>,
}

impl RepeatSpec {
    /// Encoded width of one record.
    pub fn record_width(&self) -> usize {
        self.record.iter().map(|f| f.kind.width()).sum()
    }
}

/// Request layout: fixed fields, then strings, then an optional repeat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestShape {
    /// Fixed-width leading fields.
    pub fixed: Vec<FieldSpec>,
    /// Length-prefixed strings.
    pub strings: Vec<StringSpec>,
    /// Trailing repeated section.
    pub repeat: Option<RepeatSpec>,
}

/// Operations the table knows how to marshal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Create a session.
    CreateSession,
    /// Change flags or slot counts.
    ModifySession,
    /// Add members.
    JoinSession,
    /// Remove members.
    LeaveSession,
    /// Begin gameplay.
    StartSession,
    /// Finish gameplay.
    EndSession,
    /// Tear down.
    DeleteSession,
    /// Hand hosting to a local user.
    MigrateHost,
    /// Register for arbitration.
    RegisterArbitration,
    /// Resolve players.
    FindUsers,
    /// Friends' presence for a local user.
    FriendsPresence,
    /// Search joinable sessions.
    SearchSessions,
    /// Post leaderboard columns.
    WriteStats,
    /// Fetch a title storage file.
    StorageDownload,
    /// Remove a title storage file.
    StorageDelete,
}

/// What shape of result a call writes back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    /// No result region is written.
    None,
    /// [`crate::results::CreateSessionResult`].
    CreateSession,
    /// [`crate::results::FindUsersResult`].
    FindUsers,
    /// [`crate::results::ArbitrationResult`].
    Arbitration,
    /// [`crate::results::PresenceResult`].
    Presence,
    /// [`crate::results::SearchResult`].
    Search,
    /// [`crate::results::StorageResult`].
    Storage,
}

impl ResultKind {
    /// Smallest region that can hold this result. Zero for [`ResultKind::None`].
    pub fn header_len(self) -> usize {
        match self {
            Self::None => 0,
            Self::CreateSession => CreateSessionResult::HEADER_LEN,
            Self::FindUsers => FindUsersResult::HEADER_LEN,
            Self::Arbitration => ArbitrationResult::HEADER_LEN,
            Self::Presence => PresenceResult::HEADER_LEN,
            Self::Search => SearchResult::HEADER_LEN,
            Self::Storage => StorageResult::HEADER_LEN,
        }
    }
}

/// One row of the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSchema {
    /// Operation.
    pub kind: CallKind,
    /// Index into the URL table.
    pub url_index: usize,
    /// Request layout.
    pub request: RequestShape,
    /// Result layout.
    pub result: ResultKind,
}

/// NUL-terminated URL templates addressed through an offset table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlTable {
    offsets: Vec<u32>,
    blob: Vec<u8>,
}

impl UrlTable {
    /// Pack templates into a blob.
    pub fn from_templates(templates: &[&str]) -> Result<Self, MarshalError> {
        let mut table = Self::default();
        for template in templates {
            if template.as_bytes().contains(&0) {
                return Err(MarshalError::InvalidSchema(format!(
                    "url template {template:?} contains NUL"
                )));
            }
            let offset = u32::try_from(table.blob.len())
                .map_err(|_| MarshalError::InvalidSchema("url blob too large".to_string()))?;
            table.offsets.push(offset);
            table.blob.extend_from_slice(template.as_bytes());
            table.blob.push(0);
        }
        Ok(table)
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// True when the table is empty.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Template at `index`.
    pub fn get(&self, index: usize) -> Result<&str, MarshalError> {
        let offset = *self
            .offsets
            .get(index)
            .ok_or(MarshalError::UrlIndexOutOfRange {
                index,
                len: self.offsets.len(),
            })? as usize;
        let tail = self
            .blob
            .get(offset..)
            .ok_or_else(|| MarshalError::InvalidSchema(format!("url offset {offset} past blob")))?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| MarshalError::InvalidSchema(format!("url {index} unterminated")))?;
        std::str::from_utf8(&tail[..end])
            .map_err(|_| MarshalError::InvalidSchema(format!("url {index} is not UTF-8")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OrdinalEntry {
    ordinal: u32,
    schema: u16,
}

/// Read-only, versioned description of every marshalled call.
#[derive(Clone, Debug)]
pub struct SchemaTable {
    version: u32,
    ordinals: Vec<OrdinalEntry>,
    schemas: Vec<CallSchema>,
    urls: UrlTable,
    constants: Vec<u32>,
}

impl SchemaTable {
    /// Start building a table.
    pub fn builder(version: u32) -> SchemaTableBuilder {
        SchemaTableBuilder {
            version,
            calls: Vec::new(),
            urls: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// Table version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of registered calls.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// True when no calls are registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Map an ordinal to its schema index.
    pub fn lookup_schema(&self, ordinal: u32) -> Result<u16, MarshalError> {
        self.ordinals
            .binary_search_by_key(&ordinal, |e| e.ordinal)
            .map(|i| self.ordinals[i].schema)
            .map_err(|_| MarshalError::UnknownOrdinal(ordinal))
    }

    /// Schema at `index`.
    pub fn schema(&self, index: u16) -> Result<&CallSchema, MarshalError> {
        self.schemas
            .get(usize::from(index))
            .ok_or(MarshalError::SchemaIndexOutOfRange {
                index,
                len: self.schemas.len(),
            })
    }

    /// URL template at `index`.
    pub fn lookup_url(&self, index: usize) -> Result<&str, MarshalError> {
        self.urls.get(index)
    }

    /// Constant at `index`.
    pub fn constant(&self, index: usize) -> Result<u32, MarshalError> {
        self.constants
            .get(index)
            .copied()
            .ok_or(MarshalError::ConstantIndexOutOfRange {
                index,
                len: self.constants.len(),
            })
    }

    /// Ordinal registered for `kind`, if any.
    pub fn ordinal_of(&self, kind: CallKind) -> Option<u32> {
        self.ordinals
            .iter()
            .find(|e| self.schemas[usize::from(e.schema)].kind == kind)
            .map(|e| e.ordinal)
    }
}

/// Collects rows, then sorts and validates them.
#[derive(Debug)]
pub struct SchemaTableBuilder {
    version: u32,
    calls: Vec<(u32, CallSchema)>,
    urls: Vec<&'static str>,
    constants: Vec<u32>,
}

impl SchemaTableBuilder {
    /// Append a constant, returning its index.
    pub fn constant(&mut self, value: u32) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Append a URL template, returning its index.
    pub fn url(&mut self, template: &'static str) -> usize {
        self.urls.push(template);
        self.urls.len() - 1
    }

    /// Register a call under `ordinal`.
    pub fn call(&mut self, ordinal: u32, schema: CallSchema) -> &mut Self {
        self.calls.push((ordinal, schema));
        self
    }

    /// Sort the ordinal index and check every cross-reference.
    pub fn build(self) -> Result<SchemaTable, MarshalError> {
        let urls = UrlTable::from_templates(&self.urls)?;
        let mut ordinals = Vec::with_capacity(self.calls.len());
        let mut schemas = Vec::with_capacity(self.calls.len());

        for (ordinal, schema) in self.calls {
            if schema.url_index >= urls.len() {
                return Err(MarshalError::InvalidSchema(format!(
                    "{:?}: url index {} out of range",
                    schema.kind, schema.url_index
                )));
            }
            if let Some(repeat) = &schema.request.repeat {
                if repeat.cap_constant >= self.constants.len() {
                    return Err(MarshalError::InvalidSchema(format!(
                        "{:?}: cap constant {} out of range",
                        schema.kind, repeat.cap_constant
                    )));
                }
                if repeat.key_field.is_some_and(|k| k >= repeat.record.len()) {
                    return Err(MarshalError::InvalidSchema(format!(
                        "{:?}: key field outside record",
                        schema.kind
                    )));
                }
            }
            let index = u16::try_from(schemas.len())
                .map_err(|_| MarshalError::InvalidSchema("too many schemas".to_string()))?;
            ordinals.push(OrdinalEntry {
                ordinal,
                schema: index,
            });
            schemas.push(schema);
        }

        ordinals.sort_unstable_by_key(|e| e.ordinal);
        if let Some(pair) = ordinals.windows(2).find(|w| w[0].ordinal == w[1].ordinal) {
            return Err(MarshalError::InvalidSchema(format!(
                "duplicate ordinal {:#06x}",
                pair[0].ordinal
            )));
        }

        Ok(SchemaTable {
            version: self.version,
            ordinals,
            schemas,
            urls,
            constants: self.constants,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn simple(kind: CallKind, url_index: usize) -> CallSchema {
        CallSchema {
            kind,
            url_index,
            request: RequestShape {
                fixed: vec![field("session", FieldKind::U64)],
                ..RequestShape::default()
            },
            result: ResultKind::None,
        }
    }

    #[test]
    fn lookup_sorts_unordered_rows() {
        let mut b = SchemaTable::builder(3);
        let url = b.url("sessions/{session}");
        let _ = b
            .call(0x30, simple(CallKind::EndSession, url))
            .call(0x10, simple(CallKind::StartSession, url))
            .call(0x20, simple(CallKind::DeleteSession, url));
        let table = b.build().unwrap();

        assert_eq!(table.version(), 3);
        let idx = table.lookup_schema(0x10).unwrap();
        assert_eq!(table.schema(idx).unwrap().kind, CallKind::StartSession);
        let idx = table.lookup_schema(0x30).unwrap();
        assert_eq!(table.schema(idx).unwrap().kind, CallKind::EndSession);
        assert_eq!(table.ordinal_of(CallKind::DeleteSession), Some(0x20));
    }

    #[test]
    fn header_len_matches_result_types() {
        assert_eq!(ResultKind::None.header_len(), 0);
        assert_eq!(ResultKind::CreateSession.header_len(), 28);
        assert_eq!(ResultKind::Arbitration.header_len(), 16);
        assert_eq!(ResultKind::Storage.header_len(), 8);
    }

    #[test]
    fn unknown_ordinal() {
        let table = SchemaTable::builder(1).build().unwrap();
        assert!(table.is_empty());
        assert_matches!(table.lookup_schema(7), Err(MarshalError::UnknownOrdinal(7)));
    }

    #[test]
    fn duplicate_ordinal_rejected() {
        let mut b = SchemaTable::builder(1);
        let url = b.url("x");
        let _ = b
            .call(5, simple(CallKind::StartSession, url))
            .call(5, simple(CallKind::EndSession, url));
        assert_matches!(
            b.build(),
            Err(MarshalError::InvalidSchema(msg)) if msg.contains("duplicate")
        );
    }

    #[test]
    fn dangling_url_index_rejected() {
        let mut b = SchemaTable::builder(1);
        let _ = b.call(1, simple(CallKind::StartSession, 4));
        assert_matches!(b.build(), Err(MarshalError::InvalidSchema(_)));
    }

    #[test]
    fn dangling_cap_constant_rejected() {
        let mut b = SchemaTable::builder(1);
        let url = b.url("x");
        let mut schema = simple(CallKind::LeaveSession, url);
        schema.request.repeat = Some(RepeatSpec {
            name: "members",
            record: vec![field("xuid", FieldKind::U64)],
            cap_constant: 2,
            key_field: Some(0),
        });
        let _ = b.call(1, schema);
        assert_matches!(b.build(), Err(MarshalError::InvalidSchema(_)));
    }

    #[test]
    fn url_table_indirection() {
        let urls = UrlTable::from_templates(&["a/b", "", "title/{title}/sessions"]).unwrap();
        assert_eq!(urls.len(), 3);
        assert_eq!(urls.get(0).unwrap(), "a/b");
        assert_eq!(urls.get(1).unwrap(), "");
        assert_eq!(urls.get(2).unwrap(), "title/{title}/sessions");
        assert_matches!(
            urls.get(3),
            Err(MarshalError::UrlIndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn constant_out_of_range() {
        let mut b = SchemaTable::builder(1);
        let _ = b.constant(32);
        let table = b.build().unwrap();
        assert_eq!(table.constant(0).unwrap(), 32);
        assert_matches!(
            table.constant(1),
            Err(MarshalError::ConstantIndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn widths() {
        assert_eq!(FieldKind::Bool.width(), 4);
        assert_eq!(FieldKind::FixedText(16).width(), 32);
        let repeat = RepeatSpec {
            name: "users",
            record: vec![
                field("xuid", FieldKind::U64),
                field("gamertag", FieldKind::FixedText(16)),
            ],
            cap_constant: 0,
            key_field: Some(0),
        };
        assert_eq!(repeat.record_width(), 40);
    }
}
