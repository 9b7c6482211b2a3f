//! Bounded sequential reader over an immutable byte buffer.
//!
//! A cursor reads little-endian integers and raw bytes and never reads past
//! its boundary. The root cursor is bounded by the end of the buffer; child
//! cursors are bounded by a declared block length. Running out of bytes is
//! reported as [`Error::Truncation`] at the physical end of the buffer and as
//! [`Error::Overflow`] at a declared boundary.

use byteorder::{ByteOrder, LittleEndian};

use super::format::{tag_display, FLAG_NO, FLAG_YES, TAG_SIZE};
use crate::util::{Error, Result};

#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
    /// Limit comes from a declared length rather than the buffer end.
    declared: bool,
}

impl<'a> ByteCursor<'a> {
    /// Cursor over the whole buffer, positioned at 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            limit: data.len(),
            declared: false,
        }
    }

    /// Cursor over the whole buffer, positioned at `pos`.
    pub fn at(data: &'a [u8], pos: u64) -> Result<Self> {
        let mut cursor = Self::new(data);
        cursor.seek(pos)?;
        Ok(cursor)
    }

    /// Current absolute offset.
    #[inline]
    pub fn tell(&self) -> u64 {
        self.pos as u64
    }

    /// Absolute offset of the boundary.
    #[inline]
    pub fn limit(&self) -> u64 {
        self.limit as u64
    }

    /// Bytes left before the boundary.
    #[inline]
    pub fn remaining(&self) -> u64 {
        (self.limit - self.pos) as u64
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.limit
    }

    /// The unread bytes up to the boundary.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..self.limit]
    }

    /// The complete underlying buffer.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn shortfall(&self, offset: u64, needed: u64) -> Error {
        let available = self.remaining();
        if self.declared {
            Error::Overflow { offset, needed, budget: available }
        } else {
            Error::Truncation { offset, needed, available }
        }
    }

    /// Fail unless at least `needed` bytes remain.
    pub fn ensure(&self, needed: u64) -> Result<()> {
        if needed > self.remaining() {
            return Err(self.shortfall(self.tell(), needed));
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n as u64)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    /// Read `count` consecutive u64 values.
    pub fn read_u64_vec(&mut self, count: u64) -> Result<Vec<u64>> {
        // Checked before allocating so a corrupt count cannot exhaust memory.
        let bytes = count.checked_mul(8).unwrap_or(u64::MAX);
        self.ensure(bytes)?;
        let raw = self.read_bytes(bytes as usize)?;
        Ok(raw.chunks_exact(8).map(LittleEndian::read_u64).collect())
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.ensure(n)?;
        self.pos += n as usize;
        Ok(())
    }

    /// Move to an absolute offset at or before the boundary.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.limit() {
            return Err(self.shortfall(pos, pos.saturating_sub(self.tell())));
        }
        self.pos = pos as usize;
        Ok(())
    }

    /// Child cursor covering the next `len` bytes.
    ///
    /// `origin` is the offset of the field that declared the length; it is
    /// reported if the length does not fit.
    pub fn child(&self, len: u64, origin: u64) -> Result<ByteCursor<'a>> {
        if len > self.remaining() {
            return Err(self.shortfall(origin, len));
        }
        Ok(ByteCursor {
            data: self.data,
            pos: self.pos,
            limit: self.pos + len as usize,
            declared: true,
        })
    }

    /// Child cursor from the current position up to the absolute offset `end`.
    pub fn child_until(&self, end: u64, origin: u64) -> Result<ByteCursor<'a>> {
        if end < self.tell() {
            return Err(Error::LengthMismatch {
                offset: origin,
                declared: end.saturating_sub(origin),
                consumed: self.tell() - origin,
            });
        }
        self.child(end - self.tell(), origin)
    }

    /// Read a 4-byte tag and compare it against `expected`.
    pub fn expect_tag(&mut self, expected: &'static [u8; TAG_SIZE]) -> Result<()> {
        let offset = self.tell();
        let found = self.read_bytes(TAG_SIZE)?;
        if found != expected {
            return Err(Error::TagMismatch {
                offset,
                expected: std::str::from_utf8(expected).unwrap_or_default(),
                found: tag_display(found),
            });
        }
        Ok(())
    }

    /// Read a `'y'`/`'n'` flag byte.
    pub fn read_flag(&mut self, field: &'static str) -> Result<bool> {
        let offset = self.tell();
        match self.read_u8()? {
            FLAG_YES => Ok(true),
            FLAG_NO => Ok(false),
            value => Err(Error::InvalidFlagByte { offset, field, value }),
        }
    }

    /// Read a string encoded as a 2-byte length followed by raw bytes.
    pub fn read_string16(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_u16()? as usize;
        let offset = self.tell();
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8 { offset, field })
    }
}
