//! Result regions in caller memory.
//!
//! A result region starts with a fixed header. Arrays are written as
//! `(count: u32, offset: u32)` pairs where the offset is relative to the
//! region start and points into the tail that follows the header. The
//! region is zero-filled before anything is written, and a result that
//! does not fit leaves it zeroed.

use byteorder::{BigEndian, ByteOrder};

use crate::errors::MarshalError;

/// Where a call's result goes in caller memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResultDescriptor {
    /// Byte offset of the region.
    pub offset: usize,
    /// Region capacity in bytes.
    pub capacity: usize,
}

impl ResultDescriptor {
    /// Descriptor for `capacity` bytes at `offset`.
    pub const fn new(offset: usize, capacity: usize) -> Self {
        Self { offset, capacity }
    }

    /// Resolve the region inside `memory`.
    pub fn region<'m>(&self, memory: &'m mut [u8]) -> Result<&'m mut [u8], MarshalError> {
        let capacity = memory.len();
        self.offset
            .checked_add(self.capacity)
            .and_then(|end| memory.get_mut(self.offset..end))
            .ok_or(MarshalError::OutOfBounds {
                offset: self.offset,
                len: self.capacity,
                capacity,
            })
    }
}

/// Zero-fill a result region.
pub fn zero_result(region: &mut [u8]) {
    region.fill(0);
}

fn bounds(pos: usize, len: usize, capacity: usize) -> Result<std::ops::Range<usize>, MarshalError> {
    match pos.checked_add(len) {
        Some(end) if end <= capacity => Ok(pos..end),
        _ => Err(MarshalError::OutOfBounds {
            offset: pos,
            len,
            capacity,
        }),
    }
}

fn offset_u32(pos: usize) -> Result<u32, MarshalError> {
    u32::try_from(pos).map_err(|_| MarshalError::OutOfBounds {
        offset: pos,
        len: 0,
        capacity: u32::MAX as usize,
    })
}

/// Writes a header at fixed positions and appends variable data to the tail.
#[derive(Debug)]
pub struct ResultWriter<'r> {
    buf: &'r mut [u8],
    tail: usize,
}

impl<'r> ResultWriter<'r> {
    /// Writer whose tail starts right after a `header_len`-byte header.
    pub fn new(buf: &'r mut [u8], header_len: usize) -> Self {
        Self {
            buf,
            tail: header_len,
        }
    }

    /// Bytes used so far, header included.
    pub fn len(&self) -> usize {
        self.tail
    }

    /// True when nothing has been reserved.
    pub fn is_empty(&self) -> bool {
        self.tail == 0
    }

    /// Write a `u16` at `pos`.
    pub fn put_u16(&mut self, pos: usize, value: u16) -> Result<(), MarshalError> {
        let range = bounds(pos, 2, self.buf.len())?;
        BigEndian::write_u16(&mut self.buf[range], value);
        Ok(())
    }

    /// Write a `u32` at `pos`.
    pub fn put_u32(&mut self, pos: usize, value: u32) -> Result<(), MarshalError> {
        let range = bounds(pos, 4, self.buf.len())?;
        BigEndian::write_u32(&mut self.buf[range], value);
        Ok(())
    }

    /// Write a `u64` at `pos`.
    pub fn put_u64(&mut self, pos: usize, value: u64) -> Result<(), MarshalError> {
        let range = bounds(pos, 8, self.buf.len())?;
        BigEndian::write_u64(&mut self.buf[range], value);
        Ok(())
    }

    /// Copy `bytes` to `pos`.
    pub fn put_bytes(&mut self, pos: usize, bytes: &[u8]) -> Result<(), MarshalError> {
        let range = bounds(pos, bytes.len(), self.buf.len())?;
        self.buf[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Write `text` as NUL-padded UTF-16BE of exactly `chars` units,
    /// truncating if longer.
    pub fn put_fixed_text(
        &mut self,
        pos: usize,
        text: &str,
        chars: usize,
    ) -> Result<(), MarshalError> {
        let _ = bounds(pos, chars * 2, self.buf.len())?;
        for (i, unit) in text.encode_utf16().take(chars).enumerate() {
            self.put_u16(pos + i * 2, unit)?;
        }
        Ok(())
    }

    /// Reserve `len` tail bytes and return their region-relative offset.
    pub fn reserve(&mut self, len: usize) -> Result<usize, MarshalError> {
        let range = bounds(self.tail, len, self.buf.len())?;
        self.tail = range.end;
        Ok(range.start)
    }

    /// Append `bytes` to the tail and return their offset.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u32, MarshalError> {
        let pos = self.reserve(bytes.len())?;
        self.put_bytes(pos, bytes)?;
        offset_u32(pos)
    }

    /// Append `text` as UTF-16BE, returning `(offset, units)`.
    pub fn append_utf16(&mut self, text: &str) -> Result<(u32, u32), MarshalError> {
        let units: Vec<u16> = text.encode_utf16().collect();
        let pos = self.reserve(units.len() * 2)?;
        for (i, unit) in units.iter().enumerate() {
            self.put_u16(pos + i * 2, *unit)?;
        }
        Ok((offset_u32(pos)?, offset_u32(units.len())?))
    }

    /// Write a `(count, offset)` array header at `pos`.
    pub fn put_array(
        &mut self,
        pos: usize,
        count: usize,
        offset: usize,
    ) -> Result<(), MarshalError> {
        self.put_u32(pos, offset_u32(count)?)?;
        self.put_u32(pos + 4, offset_u32(offset)?)
    }
}

/// Bounds-checked reads from a written region.
#[derive(Clone, Copy, Debug)]
pub struct ResultReader<'r> {
    buf: &'r [u8],
}

impl<'r> ResultReader<'r> {
    /// Reader over `buf`.
    pub fn new(buf: &'r [u8]) -> Self {
        Self { buf }
    }

    /// Bytes at `pos..pos + len`.
    pub fn bytes(&self, pos: usize, len: usize) -> Result<&'r [u8], MarshalError> {
        let range = bounds(pos, len, self.buf.len())?;
        Ok(&self.buf[range])
    }

    /// `u16` at `pos`.
    pub fn u16(&self, pos: usize) -> Result<u16, MarshalError> {
        Ok(BigEndian::read_u16(self.bytes(pos, 2)?))
    }

    /// `u32` at `pos`.
    pub fn u32(&self, pos: usize) -> Result<u32, MarshalError> {
        Ok(BigEndian::read_u32(self.bytes(pos, 4)?))
    }

    /// `u64` at `pos`.
    pub fn u64(&self, pos: usize) -> Result<u64, MarshalError> {
        Ok(BigEndian::read_u64(self.bytes(pos, 8)?))
    }

    /// `(count, offset)` array header at `pos`.
    pub fn array(&self, pos: usize) -> Result<(usize, usize), MarshalError> {
        Ok((self.u32(pos)? as usize, self.u32(pos + 4)? as usize))
    }

    /// `units` UTF-16BE code units at `pos`.
    pub fn utf16(&self, pos: usize, units: usize) -> Result<String, MarshalError> {
        let raw = self.bytes(pos, units * 2)?;
        let units: Vec<u16> = raw.chunks_exact(2).map(BigEndian::read_u16).collect();
        String::from_utf16(&units).map_err(|_| MarshalError::InvalidUtf16 { field: "result" })
    }

    /// NUL-padded UTF-16BE text of `chars` units at `pos`.
    pub fn fixed_text(&self, pos: usize, chars: usize) -> Result<String, MarshalError> {
        let raw = self.bytes(pos, chars * 2)?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(BigEndian::read_u16)
            .take_while(|&u| u != 0)
            .collect();
        String::from_utf16(&units).map_err(|_| MarshalError::InvalidUtf16 { field: "result" })
    }
}

/// A result type with a fixed header and a variable tail.
pub trait WireResult: Sized {
    /// Header size in bytes.
    const HEADER_LEN: usize;

    /// Bytes the tail needs.
    fn tail_len(&self) -> usize;

    /// Write header and tail. The region is already zeroed and large enough.
    fn write(&self, w: &mut ResultWriter<'_>) -> Result<(), MarshalError>;

    /// Read back from a region.
    fn read(r: &ResultReader<'_>) -> Result<Self, MarshalError>;

    /// Total encoded size.
    fn encoded_len(&self) -> usize {
        Self::HEADER_LEN + self.tail_len()
    }
}

/// Zero `region`, then write `value` if it fits.
///
/// Returns the bytes used. When the value does not fit the region stays
/// zeroed and [`MarshalError::InsufficientBuffer`] carries the required size.
pub fn encode_result<T: WireResult>(value: &T, region: &mut [u8]) -> Result<usize, MarshalError> {
    zero_result(region);
    let required = value.encoded_len();
    if required > region.len() {
        return Err(MarshalError::InsufficientBuffer {
            required,
            capacity: region.len(),
        });
    }
    let mut writer = ResultWriter::new(region, T::HEADER_LEN);
    if let Err(err) = value.write(&mut writer) {
        zero_result(region);
        return Err(err);
    }
    Ok(required)
}

/// Read a result back from `region`.
pub fn decode_result<T: WireResult>(region: &[u8]) -> Result<T, MarshalError> {
    if region.len() < T::HEADER_LEN {
        return Err(MarshalError::Truncated {
            offset: 0,
            needed: T::HEADER_LEN,
            remaining: region.len(),
        });
    }
    T::read(&ResultReader::new(region))
}
