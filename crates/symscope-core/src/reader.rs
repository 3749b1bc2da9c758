//! Bounds-checked little-endian cursor shared by the ELF and DWARF decoders.
//!
//! Every read either advances the cursor or fails with
//! [`Error::Truncated`] without moving it, so a decoder can never index past
//! the end of a section.

use crate::error::{Error, Result};

/// Cursor over an immutable byte slice.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a>
{
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a>
{
    pub(crate) fn new(data: &'a [u8]) -> Self
    {
        Self { data, pos: 0 }
    }

    /// Reader positioned at `pos` (which may equal `data.len()`).
    pub(crate) fn at(data: &'a [u8], pos: usize) -> Result<Self>
    {
        let mut reader = Self::new(data);
        reader.seek(pos)?;
        Ok(reader)
    }

    pub(crate) fn position(&self) -> usize
    {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize
    {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool
    {
        self.remaining() == 0
    }

    pub(crate) fn seek(&mut self, pos: usize) -> Result<()>
    {
        if pos > self.data.len() {
            return Err(Error::Truncated { offset: pos });
        }
        self.pos = pos;
        Ok(())
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()>
    {
        self.bytes(len).map(|_| ())
    }

    /// Peek at the next byte without consuming it.
    pub(crate) fn peek(&self) -> Option<u8>
    {
        self.data.get(self.pos).copied()
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8]>
    {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            return Err(Error::Truncated { offset: self.pos });
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]>
    {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8>
    {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn i8(&mut self) -> Result<i8>
    {
        Ok(i8::from_le_bytes(self.array()?))
    }

    pub(crate) fn u16(&mut self) -> Result<u16>
    {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32>
    {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64>
    {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Little-endian target address of `size` bytes.
    ///
    /// Widths above 8 bytes keep the low 64 bits.
    pub(crate) fn address(&mut self, size: usize) -> Result<u64>
    {
        let raw = self.bytes(size)?;
        Ok(raw
            .iter()
            .take(8)
            .rev()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
    }

    /// Unsigned LEB128. Bits past the 64th are consumed and dropped.
    pub(crate) fn uleb128(&mut self) -> Result<u64>
    {
        let start = self.pos;
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.u8().map_err(|_| Error::Truncated { offset: start })?;
            if shift < 64 {
                result |= u64::from(byte & 0x7f) << shift;
            }
            shift = shift.saturating_add(7);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
    }

    /// Signed LEB128, sign-extended from the last byte's bit 6.
    pub(crate) fn sleb128(&mut self) -> Result<i64>
    {
        let start = self.pos;
        let mut result = 0i64;
        let mut shift = 0u32;
        let mut byte;
        loop {
            byte = self.u8().map_err(|_| Error::Truncated { offset: start })?;
            if shift < 64 {
                result |= i64::from(byte & 0x7f) << shift;
            }
            shift = shift.saturating_add(7);
            if byte & 0x80 == 0 {
                break;
            }
        }
        if shift < 64 && byte & 0x40 != 0 {
            result |= -1i64 << shift;
        }
        Ok(result)
    }

    /// NUL-terminated string, decoded lossily. The terminator is consumed.
    pub(crate) fn cstr(&mut self) -> Result<String>
    {
        let rest = &self.data[self.pos..];
        let Some(len) = rest.iter().position(|b| *b == 0) else {
            return Err(Error::Truncated { offset: self.pos });
        };
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(text)
    }
}

/// Look up a NUL-terminated string in an ELF string table.
///
/// Out-of-range offsets and unterminated tails yield whatever bytes are
/// available, possibly an empty string.
pub(crate) fn string_at(table: &[u8], offset: usize) -> String
{
    let Some(rest) = table.get(offset..) else {
        return String::new();
    };
    let len = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
    String::from_utf8_lossy(&rest[..len]).into_owned()
}
