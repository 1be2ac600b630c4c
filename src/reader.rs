//! Bounds-checked little-endian reader shared by the dex and binary XML decoders.

use crate::dex::leb::decode_uleb128;
use crate::error::FormatError;

/// A read position over an immutable byte buffer.
///
/// The reader is `Copy`: decoders that follow an offset out of an index table
/// take a copy with [`BinaryReader::fork_at`] and leave the original where it was.
#[derive(Clone, Copy, Debug)]
pub struct BinaryReader<'a>
{
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a>
{
    pub fn new(data: &'a [u8]) -> Self
    {
        BinaryReader { data, pos: 0 }
    }

    /// A reader over `data` positioned at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self, FormatError>
    {
        let mut reader = BinaryReader::new(data);
        reader.seek(offset)?;
        Ok(reader)
    }

    /// A second reader over the same buffer, positioned at `offset`.
    pub fn fork_at(&self, offset: usize) -> Result<Self, FormatError>
    {
        BinaryReader::at(self.data, offset)
    }

    pub fn data(&self) -> &'a [u8]
    {
        self.data
    }

    pub fn position(&self) -> usize
    {
        self.pos
    }

    pub fn len(&self) -> usize
    {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize
    {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, offset: usize) -> Result<(), FormatError>
    {
        if offset > self.data.len()
        {
            fail!(at offset, "seek past end of data (length 0x{:x})", self.data.len());
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), FormatError>
    {
        self.take(count).map(|_| ())
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], FormatError>
    {
        let end = match self.pos.checked_add(count)
        {
            Some(end) if end <= self.data.len() => end,
            _ => fail!(at self.pos, "unexpected end of data reading {} bytes (length 0x{:x})", count, self.data.len()),
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], FormatError>
    {
        self.take(count)
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError>
    {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError>
    {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError>
    {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, FormatError>
    {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    pub fn read_i8(&mut self) -> Result<i8, FormatError>
    {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, FormatError>
    {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, FormatError>
    {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, FormatError>
    {
        Ok(self.read_u64()? as i64)
    }

    pub fn peek_u8(&self) -> Result<u8, FormatError>
    {
        let mut copy = *self;
        copy.read_u8()
    }

    pub fn peek_u16(&self) -> Result<u16, FormatError>
    {
        let mut copy = *self;
        copy.read_u16()
    }

    pub fn peek_u32(&self) -> Result<u32, FormatError>
    {
        let mut copy = *self;
        copy.read_u32()
    }

    /// Read an unsigned LEB128 value of at most 32 bits.
    pub fn read_uleb128(&mut self) -> Result<u32, FormatError>
    {
        match decode_uleb128(&self.data[self.pos..])
        {
            Some((value, size)) =>
            {
                self.pos += size;
                Ok(value)
            }
            None => fail!(at self.pos, "truncated or over-long uleb128"),
        }
    }

    /// Read up to (and consume) a NUL byte, returning the bytes before it.
    pub fn read_until_nul(&mut self) -> Result<&'a [u8], FormatError>
    {
        let start = self.pos;
        match self.data[start..].iter().position(|&b| b == 0)
        {
            Some(len) =>
            {
                self.pos = start + len + 1;
                Ok(&self.data[start..start + len])
            }
            None => fail!(at start, "unterminated string data"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn reads_little_endian_values()
    {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xff, 0xfe];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(reader.read_i16().unwrap(), -257);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn reads_wide_and_signed_values()
    {
        let data = [0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x80];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_i64().unwrap(), -2);
        assert_eq!(reader.read_i8().unwrap(), -128);
    }

    #[test]
    fn read_past_end_fails_with_offset()
    {
        let data = [0x01, 0x02, 0x03];
        let mut reader = BinaryReader::new(&data);
        reader.skip(2).unwrap();
        let err = reader.read_u32().unwrap_err();
        assert_eq!(err.offset(), Some(2));
        // A failed read does not move the position.
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.read_u8().unwrap(), 0x03);
    }

    #[test]
    fn seek_is_bounded()
    {
        let data = [0u8; 4];
        let mut reader = BinaryReader::new(&data);
        assert!(reader.seek(4).is_ok());
        assert!(reader.seek(5).is_err());
        assert!(BinaryReader::at(&data, 9).is_err());
    }

    #[test]
    fn peek_and_fork_leave_position_alone()
    {
        let data = [0x10, 0x00, 0x20, 0x00];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.peek_u16().unwrap(), 0x10);
        let mut fork = reader.fork_at(2).unwrap();
        assert_eq!(fork.read_u16().unwrap(), 0x20);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16().unwrap(), 0x10);
    }

    #[test]
    fn uleb128_and_nul_terminated_reads()
    {
        let data = [0xe5, 0x8e, 0x26, b'h', b'i', 0x00, 0x80];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_uleb128().unwrap(), 624485);
        assert_eq!(reader.read_until_nul().unwrap(), b"hi");
        assert!(reader.read_uleb128().is_err());
        assert!(reader.read_until_nul().is_err());
    }
}
