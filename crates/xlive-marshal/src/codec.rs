//! Schema-driven request codec.
//!
//! Layout: fixed fields, then each string as a `u16` code-unit count followed
//! by UTF-16BE units, then the repeated section as a `u32` count followed by
//! records. Everything is big-endian. Every read is bounds-checked against
//! the declared length before it happens, and the decoder must consume that
//! length exactly.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::trace;

use crate::args::{CallArgs, FieldValue, Record, RecordStatus};
use crate::errors::MarshalError;
use crate::schema::{CallSchema, FieldKind, FieldSpec, RepeatSpec, SchemaTable, StringSpec};

/// Bounds-checked big-endian reader over a declared payload.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> PayloadReader<'a> {
    /// Reader over exactly `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        usize::try_from(self.cursor.position()).unwrap_or(usize::MAX)
    }

    /// Bytes left.
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.consumed())
    }

    /// Fail unless `needed` more bytes are available.
    pub fn ensure(&self, needed: usize) -> Result<(), MarshalError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(MarshalError::Truncated {
                offset: self.consumed(),
                needed,
                remaining,
            });
        }
        Ok(())
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, MarshalError> {
        self.ensure(1)?;
        self.cursor.read_u8().map_err(|_| self.truncated(1))
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, MarshalError> {
        self.ensure(2)?;
        self.cursor
            .read_u16::<BigEndian>()
            .map_err(|_| self.truncated(2))
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, MarshalError> {
        self.ensure(4)?;
        self.cursor
            .read_u32::<BigEndian>()
            .map_err(|_| self.truncated(4))
    }

    /// Read a big-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, MarshalError> {
        self.ensure(8)?;
        self.cursor
            .read_u64::<BigEndian>()
            .map_err(|_| self.truncated(8))
    }

    /// Borrow the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], MarshalError> {
        self.ensure(len)?;
        let start = self.consumed();
        let bytes: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&bytes[start..start + len])
    }

    /// Read `count` UTF-16BE code units.
    pub fn read_utf16(&mut self, count: usize) -> Result<Vec<u16>, MarshalError> {
        let raw = self.read_bytes(count * 2)?;
        Ok(raw
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }

    fn truncated(&self, needed: usize) -> MarshalError {
        MarshalError::Truncated {
            offset: self.consumed(),
            needed,
            remaining: self.remaining(),
        }
    }
}

/// Decode a request payload against `schema`.
///
/// `payload` must hold at least `declared_len` bytes; bytes past the
/// declared length are ignored. Decoding must consume exactly
/// `declared_len`, otherwise [`MarshalError::Desync`].
pub fn decode_args(
    table: &SchemaTable,
    schema: &CallSchema,
    payload: &[u8],
    declared_len: usize,
) -> Result<CallArgs, MarshalError> {
    let bytes = payload
        .get(..declared_len)
        .ok_or(MarshalError::ShorterThanDeclared {
            declared: declared_len,
            actual: payload.len(),
        })?;
    let mut reader = PayloadReader::new(bytes);
    let shape = &schema.request;

    let fixed = shape
        .fixed
        .iter()
        .map(|spec| read_field(&mut reader, spec))
        .collect::<Result<Vec<_>, _>>()?;

    let strings = shape
        .strings
        .iter()
        .map(|spec| read_string(&mut reader, spec))
        .collect::<Result<Vec<_>, _>>()?;

    let records = match &shape.repeat {
        Some(repeat) => read_repeat(&mut reader, table, repeat)?,
        None => Vec::new(),
    };

    let consumed = reader.consumed();
    if consumed != declared_len {
        return Err(MarshalError::Desync {
            consumed,
            declared: declared_len,
        });
    }
    trace!(kind = ?schema.kind, consumed, records = records.len(), "decoded request");
    Ok(CallArgs {
        fixed,
        strings,
        records,
    })
}

fn read_field(
    reader: &mut PayloadReader<'_>,
    spec: &FieldSpec,
) -> Result<FieldValue, MarshalError> {
    Ok(match spec.kind {
        FieldKind::U8 => FieldValue::U8(reader.read_u8()?),
        FieldKind::U16 => FieldValue::U16(reader.read_u16()?),
        FieldKind::U32 => FieldValue::U32(reader.read_u32()?),
        FieldKind::U64 => FieldValue::U64(reader.read_u64()?),
        FieldKind::Bool => match reader.read_u32()? {
            0 => FieldValue::Bool(false),
            1 => FieldValue::Bool(true),
            value => {
                return Err(MarshalError::InvalidBool {
                    field: spec.name,
                    value,
                });
            }
        },
        FieldKind::Bytes(n) => FieldValue::Bytes(reader.read_bytes(n)?.to_vec()),
        FieldKind::FixedText(n) => {
            let units = reader.read_utf16(n)?;
            let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
            let text = String::from_utf16(&units[..end])
                .map_err(|_| MarshalError::InvalidUtf16 { field: spec.name })?;
            FieldValue::Text(text)
        }
    })
}

fn read_string(reader: &mut PayloadReader<'_>, spec: &StringSpec) -> Result<String, MarshalError> {
    let chars = usize::from(reader.read_u16()?);
    if chars > spec.max_chars {
        return Err(MarshalError::StringTooLong {
            field: spec.name,
            chars,
            max: spec.max_chars,
        });
    }
    let units = reader.read_utf16(chars)?;
    String::from_utf16(&units).map_err(|_| MarshalError::InvalidUtf16 { field: spec.name })
}

fn read_repeat(
    reader: &mut PayloadReader<'_>,
    table: &SchemaTable,
    repeat: &RepeatSpec,
) -> Result<Vec<Record>, MarshalError> {
    let count = reader.read_u32()?;
    let cap = table.constant(repeat.cap_constant)?;
    if count > cap {
        return Err(MarshalError::RepeatCapExceeded {
            field: repeat.name,
            count,
            cap,
        });
    }
    let count = count as usize;
    reader.ensure(count * repeat.record_width())?;

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let fields = repeat
            .record
            .iter()
            .map(|spec| read_field(reader, spec))
            .collect::<Result<Vec<_>, _>>()?;
        let status = match repeat.key_field.and_then(|k| fields.get(k)) {
            Some(key) if key.is_zero() => RecordStatus::SkipInvalid,
            _ => RecordStatus::Valid,
        };
        records.push(Record { fields, status });
    }
    Ok(records)
}

/// Encode arguments against `schema`, enforcing the same limits the decoder
/// enforces.
pub fn encode_args(
    table: &SchemaTable,
    schema: &CallSchema,
    args: &CallArgs,
) -> Result<Vec<u8>, MarshalError> {
    let shape = &schema.request;
    check_arity("fixed", shape.fixed.len(), args.fixed.len())?;
    check_arity("strings", shape.strings.len(), args.strings.len())?;
    if shape.repeat.is_none() && !args.records.is_empty() {
        return Err(MarshalError::ArityMismatch {
            section: "records",
            expected: 0,
            found: args.records.len(),
        });
    }

    let mut out = Vec::new();
    for (index, (spec, value)) in shape.fixed.iter().zip(&args.fixed).enumerate() {
        write_field(&mut out, "fixed", index, spec, value)?;
    }

    for (spec, value) in shape.strings.iter().zip(&args.strings) {
        let units: Vec<u16> = value.encode_utf16().collect();
        let chars = units.len();
        if chars > spec.max_chars {
            return Err(MarshalError::StringTooLong {
                field: spec.name,
                chars,
                max: spec.max_chars,
            });
        }
        let count = u16::try_from(chars).map_err(|_| MarshalError::StringTooLong {
            field: spec.name,
            chars,
            max: usize::from(u16::MAX),
        })?;
        put(out.write_u16::<BigEndian>(count));
        for unit in units {
            put(out.write_u16::<BigEndian>(unit));
        }
    }

    if let Some(repeat) = &shape.repeat {
        let cap = table.constant(repeat.cap_constant)?;
        let count = u32::try_from(args.records.len()).unwrap_or(u32::MAX);
        if count > cap {
            return Err(MarshalError::RepeatCapExceeded {
                field: repeat.name,
                count,
                cap,
            });
        }
        put(out.write_u32::<BigEndian>(count));
        for (index, record) in args.records.iter().enumerate() {
            check_arity("record", repeat.record.len(), record.fields.len())?;
            for (spec, value) in repeat.record.iter().zip(&record.fields) {
                write_field(&mut out, "records", index, spec, value)?;
            }
        }
    }
    Ok(out)
}

fn check_arity(section: &'static str, expected: usize, found: usize) -> Result<(), MarshalError> {
    if expected == found {
        Ok(())
    } else {
        Err(MarshalError::ArityMismatch {
            section,
            expected,
            found,
        })
    }
}

// Writes into a Vec<u8> cannot fail.
fn put(result: std::io::Result<()>) {
    debug_assert!(result.is_ok());
}

fn write_field(
    out: &mut Vec<u8>,
    section: &'static str,
    index: usize,
    spec: &FieldSpec,
    value: &FieldValue,
) -> Result<(), MarshalError> {
    if !value.fits(spec.kind) {
        return Err(MarshalError::FieldType {
            section,
            index,
            expected: spec.kind.name(),
            found: value.kind_name(),
        });
    }
    match (value, spec.kind) {
        (FieldValue::U8(v), _) => put(out.write_u8(*v)),
        (FieldValue::U16(v), _) => put(out.write_u16::<BigEndian>(*v)),
        (FieldValue::U32(v), _) => put(out.write_u32::<BigEndian>(*v)),
        (FieldValue::U64(v), _) => put(out.write_u64::<BigEndian>(*v)),
        (FieldValue::Bool(v), _) => put(out.write_u32::<BigEndian>(u32::from(*v))),
        (FieldValue::Bytes(b), _) => put(out.write_all(b)),
        (FieldValue::Text(s), kind) => {
            let units = s.encode_utf16().chain(std::iter::repeat(0));
            for unit in units.take(kind.width() / 2) {
                put(out.write_u16::<BigEndian>(unit));
            }
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CallKind, RequestShape, ResultKind, field};
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn find_users_table() -> (SchemaTable, u16) {
        let mut b = SchemaTable::builder(1);
        let cap = b.constant(4);
        let url = b.url("players/find");
        let _ = b.call(
            0x200,
            CallSchema {
                kind: CallKind::FindUsers,
                url_index: url,
                request: RequestShape {
                    fixed: vec![field("requester", FieldKind::U64)],
                    strings: vec![],
                    repeat: Some(RepeatSpec {
                        name: "users",
                        record: vec![
                            field("xuid", FieldKind::U64),
                            field("gamertag", FieldKind::FixedText(16)),
                        ],
                        cap_constant: cap,
                        key_field: Some(0),
                    }),
                },
                result: ResultKind::FindUsers,
            },
        );
        let table = b.build().unwrap();
        let idx = table.lookup_schema(0x200).unwrap();
        (table, idx)
    }

    fn storage_table() -> (SchemaTable, u16) {
        let mut b = SchemaTable::builder(1);
        let url = b.url("storage/{path}");
        let _ = b.call(
            0x300,
            CallSchema {
                kind: CallKind::StorageDownload,
                url_index: url,
                request: RequestShape {
                    fixed: vec![
                        field("user_index", FieldKind::U32),
                        field("flag", FieldKind::Bool),
                    ],
                    strings: vec![StringSpec {
                        name: "path",
                        max_chars: 8,
                    }],
                    repeat: None,
                },
                result: ResultKind::Storage,
            },
        );
        let table = b.build().unwrap();
        let idx = table.lookup_schema(0x300).unwrap();
        (table, idx)
    }

    fn user(xuid: u64, tag: &str) -> Record {
        Record::valid(vec![FieldValue::U64(xuid), FieldValue::Text(tag.into())])
    }

    fn find_users_args(users: Vec<Record>) -> CallArgs {
        CallArgs {
            fixed: vec![FieldValue::U64(0x0009_0000_0000_0001)],
            strings: vec![],
            records: users,
        }
    }

    #[test]
    fn zero_key_record_is_consumed_and_marked() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        let payload = encode_args(
            &table,
            schema,
            &find_users_args(vec![user(0x11, "Alpha"), user(0, "Ghost"), user(0x33, "Gamma")]),
        )
        .unwrap();
        assert_eq!(payload.len(), 8 + 4 + 3 * 40);

        let args = decode_args(&table, schema, &payload, payload.len()).unwrap();
        let statuses: Vec<_> = args.records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                RecordStatus::Valid,
                RecordStatus::SkipInvalid,
                RecordStatus::Valid
            ]
        );
        assert_eq!(args.records[2].fields[1], FieldValue::Text("Gamma".into()));
    }

    #[test]
    fn declared_length_longer_than_schema_is_desync() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        let mut payload =
            encode_args(&table, schema, &find_users_args(vec![user(1, "a")])).unwrap();
        payload.extend_from_slice(&[0, 0, 0, 0]);
        let len = payload.len();
        assert_matches!(
            decode_args(&table, schema, &payload, len),
            Err(MarshalError::Desync {
                consumed: 52,
                declared: 56
            })
        );
    }

    #[test]
    fn trailing_bytes_past_declared_length_are_ignored() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        let mut payload =
            encode_args(&table, schema, &find_users_args(vec![user(1, "a")])).unwrap();
        let declared = payload.len();
        payload.extend_from_slice(&[0xFF; 16]);
        assert!(decode_args(&table, schema, &payload, declared).is_ok());
    }

    #[test]
    fn declared_length_past_buffer() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        assert_matches!(
            decode_args(&table, schema, &[0u8; 4], 12),
            Err(MarshalError::ShorterThanDeclared {
                declared: 12,
                actual: 4
            })
        );
    }

    #[test]
    fn short_declared_length_truncates() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        let payload = encode_args(&table, schema, &find_users_args(vec![user(1, "a")])).unwrap();
        assert_matches!(
            decode_args(&table, schema, &payload, payload.len() - 1),
            Err(MarshalError::Truncated { .. })
        );
    }

    #[test]
    fn count_above_cap_rejected_before_reading_records() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        let mut payload = 1u64.to_be_bytes().to_vec();
        payload.extend_from_slice(&5u32.to_be_bytes());
        assert_matches!(
            decode_args(&table, schema, &payload, payload.len()),
            Err(MarshalError::RepeatCapExceeded {
                field: "users",
                count: 5,
                cap: 4
            })
        );
    }

    #[test]
    fn count_beyond_payload_is_truncated() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        let mut payload = 1u64.to_be_bytes().to_vec();
        payload.extend_from_slice(&3u32.to_be_bytes());
        payload.extend_from_slice(&[0u8; 40]);
        assert_matches!(
            decode_args(&table, schema, &payload, payload.len()),
            Err(MarshalError::Truncated {
                offset: 12,
                needed: 120,
                remaining: 40
            })
        );
    }

    #[test]
    fn encoder_enforces_cap() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        let users = (1..=5).map(|x| user(x, "u")).collect();
        assert_matches!(
            encode_args(&table, schema, &find_users_args(users)),
            Err(MarshalError::RepeatCapExceeded { count: 5, .. })
        );
    }

    #[test]
    fn bool_must_be_zero_or_one() {
        let (table, idx) = storage_table();
        let schema = table.schema(idx).unwrap();
        let mut payload = 0u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&2u32.to_be_bytes());
        payload.extend_from_slice(&0u16.to_be_bytes());
        assert_matches!(
            decode_args(&table, schema, &payload, payload.len()),
            Err(MarshalError::InvalidBool {
                field: "flag",
                value: 2
            })
        );
    }

    #[test]
    fn string_length_capped() {
        let (table, idx) = storage_table();
        let schema = table.schema(idx).unwrap();
        let mut payload = 0u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.extend_from_slice(&9u16.to_be_bytes());
        payload.extend_from_slice(&[0u8; 18]);
        assert_matches!(
            decode_args(&table, schema, &payload, payload.len()),
            Err(MarshalError::StringTooLong {
                field: "path",
                chars: 9,
                max: 8
            })
        );
    }

    #[test]
    fn unpaired_surrogate_rejected() {
        let (table, idx) = storage_table();
        let schema = table.schema(idx).unwrap();
        let mut payload = 0u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.extend_from_slice(&1u16.to_be_bytes());
        payload.extend_from_slice(&0xD800u16.to_be_bytes());
        assert_matches!(
            decode_args(&table, schema, &payload, payload.len()),
            Err(MarshalError::InvalidUtf16 { field: "path" })
        );
    }

    #[test]
    fn string_layout_is_count_then_units() {
        let (table, idx) = storage_table();
        let schema = table.schema(idx).unwrap();
        let args = CallArgs {
            fixed: vec![FieldValue::U32(2), FieldValue::Bool(true)],
            strings: vec!["ab".into()],
            records: vec![],
        };
        let payload = encode_args(&table, schema, &args).unwrap();
        assert_eq!(
            payload,
            [0, 0, 0, 2, 0, 0, 0, 1, 0, 2, 0, b'a', 0, b'b']
        );
    }

    #[test]
    fn encoder_rejects_wrong_kind() {
        let (table, idx) = storage_table();
        let schema = table.schema(idx).unwrap();
        let args = CallArgs {
            fixed: vec![FieldValue::U64(2), FieldValue::Bool(true)],
            strings: vec!["ab".into()],
            records: vec![],
        };
        assert_matches!(
            encode_args(&table, schema, &args),
            Err(MarshalError::FieldType {
                section: "fixed",
                index: 0,
                ..
            })
        );
    }

    #[test]
    fn encoder_rejects_nul_in_fixed_text() {
        let (table, idx) = find_users_table();
        let schema = table.schema(idx).unwrap();
        let args = find_users_args(vec![user(1, "ok"), user(2, "ab\0cd")]);
        assert_matches!(
            encode_args(&table, schema, &args),
            Err(MarshalError::FieldType {
                section: "records",
                index: 1,
                ..
            })
        );
    }

    proptest! {
        #[test]
        fn find_users_round_trip(
            requester in any::<u64>(),
            users in proptest::collection::vec((1u64.., "[^\\x00]{0,8}"), 0..=4),
        ) {
            let (table, idx) = find_users_table();
            let schema = table.schema(idx).unwrap();
            let args = CallArgs {
                fixed: vec![FieldValue::U64(requester)],
                strings: vec![],
                records: users.iter().map(|(x, t)| user(*x, t)).collect(),
            };
            let payload = encode_args(&table, schema, &args).unwrap();
            let decoded = decode_args(&table, schema, &payload, payload.len()).unwrap();
            prop_assert_eq!(decoded, args);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let (table, idx) = find_users_table();
            let schema = table.schema(idx).unwrap();
            let _ = decode_args(&table, schema, &bytes, bytes.len());
        }
    }
}
