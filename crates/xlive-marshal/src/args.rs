//! Decoded argument values.

use crate::errors::MarshalError;
use crate::schema::FieldKind;

/// One decoded fixed-width value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// [`FieldKind::U8`].
    U8(u8),
    /// [`FieldKind::U16`].
    U16(u16),
    /// [`FieldKind::U32`].
    U32(u32),
    /// [`FieldKind::U64`].
    U64(u64),
    /// [`FieldKind::Bool`].
    Bool(bool),
    /// [`FieldKind::Bytes`].
    Bytes(Vec<u8>),
    /// [`FieldKind::FixedText`], padding stripped.
    Text(String),
}

impl FieldValue {
    /// Short name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
        }
    }

    /// Whether the value is the zero/empty value of its kind.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::U8(v) => *v == 0,
            Self::U16(v) => *v == 0,
            Self::U32(v) => *v == 0,
            Self::U64(v) => *v == 0,
            Self::Bool(v) => !*v,
            Self::Bytes(b) => b.iter().all(|&x| x == 0),
            Self::Text(s) => s.is_empty(),
        }
    }

    /// Whether the value can be written as `kind`. Fixed text is NUL padded,
    /// so it may not hold a NUL of its own.
    pub fn fits(&self, kind: FieldKind) -> bool {
        match (self, kind) {
            (Self::U8(_), FieldKind::U8)
            | (Self::U16(_), FieldKind::U16)
            | (Self::U32(_), FieldKind::U32)
            | (Self::U64(_), FieldKind::U64)
            | (Self::Bool(_), FieldKind::Bool) => true,
            (Self::Bytes(b), FieldKind::Bytes(n)) => b.len() == n,
            (Self::Text(s), FieldKind::FixedText(n)) => {
                !s.contains('\0') && s.encode_utf16().count() <= n
            }
            _ => false,
        }
    }
}

/// Validity of one repeated record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordStatus {
    /// Usable.
    #[default]
    Valid,
    /// Key field was zero; the record was consumed but must be skipped.
    SkipInvalid,
}

/// One repeated record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Values in schema order.
    pub fields: Vec<FieldValue>,
    /// Validity marker.
    pub status: RecordStatus,
}

impl Record {
    /// A record marked valid.
    pub fn valid(fields: Vec<FieldValue>) -> Self {
        Self {
            fields,
            status: RecordStatus::Valid,
        }
    }

    /// Sequential typed access to the fields.
    pub fn reader(&self) -> Fields<'_> {
        Fields::new("record", &self.fields)
    }
}

/// Decoded arguments of one call, in schema order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallArgs {
    /// Fixed-width fields.
    pub fixed: Vec<FieldValue>,
    /// Length-prefixed strings.
    pub strings: Vec<String>,
    /// Repeated records.
    pub records: Vec<Record>,
}

impl CallArgs {
    /// Sequential typed access to the fixed fields.
    pub fn fixed_reader(&self) -> Fields<'_> {
        Fields::new("fixed", &self.fixed)
    }

    /// String at `index`.
    pub fn string(&self, index: usize) -> Result<&str, MarshalError> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or(MarshalError::ArityMismatch {
                section: "strings",
                expected: index + 1,
                found: self.strings.len(),
            })
    }
}

/// Cursor over a slice of values with typed getters.
#[derive(Debug)]
pub struct Fields<'a> {
    section: &'static str,
    values: &'a [FieldValue],
    pos: usize,
}

macro_rules! getter {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Next value as `", stringify!($ty), "`.")]
        pub fn $name(&mut self) -> Result<$ty, MarshalError> {
            match self.advance()? {
                FieldValue::$variant(v) => Ok(v.to_owned()),
                other => Err(self.mismatch(stringify!($name), other)),
            }
        }
    };
}

impl<'a> Fields<'a> {
    fn new(section: &'static str, values: &'a [FieldValue]) -> Self {
        Self {
            section,
            values,
            pos: 0,
        }
    }

    fn advance(&mut self) -> Result<&'a FieldValue, MarshalError> {
        let value = self
            .values
            .get(self.pos)
            .ok_or(MarshalError::ArityMismatch {
                section: self.section,
                expected: self.pos + 1,
                found: self.values.len(),
            })?;
        self.pos += 1;
        Ok(value)
    }

    fn mismatch(&self, expected: &'static str, found: &FieldValue) -> MarshalError {
        MarshalError::FieldType {
            section: self.section,
            index: self.pos - 1,
            expected,
            found: found.kind_name(),
        }
    }

    getter!(u8, U8, u8);
    getter!(u16, U16, u16);
    getter!(u32, U32, u32);
    getter!(u64, U64, u64);
    getter!(bool, Bool, bool);
    getter!(bytes, Bytes, Vec<u8>);
    getter!(text, Text, String);
}
