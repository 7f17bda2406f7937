//! # Byte Cursor
//!
//! Bounds-checked reads of the fixed-size fields between packed sections.
//! All multi-byte integers are big-endian. Every read returns `None` instead
//! of running off the end; the parser turns that into a stage error.

use bytemuck::Pod;

/// Reads fields from a draw-state payload.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new reader over a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Current byte offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns true once every byte has been read.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer.
    #[inline]
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        self.buffer.get(self.position..).unwrap_or(&[])
    }

    /// Skips `count` bytes.
    #[inline]
    pub fn advance(&mut self, count: usize) -> Option<()> {
        if count > self.remaining() {
            return None;
        }
        self.position += count;
        Some(())
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.buffer.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    /// Reads a big-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big-endian i16.
    #[inline]
    pub fn read_i16(&mut self) -> Option<i16> {
        let bytes = self.read_bytes(2)?;
        Some(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> Option<i32> {
        let bytes = self.read_bytes(4)?;
        Some(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Borrows the next `count` bytes.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(count)?;
        let slice = self.buffer.get(self.position..end)?;
        self.position = end;
        Some(slice)
    }

    /// Reads a NUL-terminated string, returning it without the terminator.
    ///
    /// Returns `None` (and consumes nothing) if no terminator is present.
    pub fn read_cstr(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest();
        let len = rest.iter().position(|&b| b == 0)?;
        self.position += len + 1;
        Some(&rest[..len])
    }

    /// Reads a Pod type directly.
    #[inline]
    pub fn read_pod<T: Pod>(&mut self) -> Option<T> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }
}

/// Decodes single-byte text losslessly (each byte maps to the code point of
/// the same value).
#[must_use]
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_fields() {
        let data = [0x01, 0x02, 0xFF, 0xFE, 0x00, 0x00, 0x01, 0x00];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16(), Some(0x0102));
        assert_eq!(reader.read_i16(), Some(-2));
        assert_eq!(reader.read_i32(), Some(256));
        assert!(reader.is_empty());
        assert_eq!(reader.read_u8(), None);
    }

    #[test]
    fn test_short_read_consumes_nothing() {
        let data = [0xAA];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16(), None);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u8(), Some(0xAA));
    }

    #[test]
    fn test_cstr() {
        let data = b"abc\0\0tail";
        let mut reader = ByteReader::new(data);
        assert_eq!(reader.read_cstr(), Some(&b"abc"[..]));
        assert_eq!(reader.read_cstr(), Some(&b""[..]));
        assert_eq!(reader.read_cstr(), None);
        assert_eq!(reader.rest(), b"tail");
    }

    #[test]
    fn test_advance_bounds() {
        let data = [0u8; 4];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.advance(3), Some(()));
        assert_eq!(reader.advance(2), None);
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.advance(usize::MAX), None);
    }

    #[test]
    fn test_latin1_is_lossless() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = latin1(&bytes);
        assert_eq!(text.chars().count(), 256);
        assert_eq!(text.chars().nth(0xE9), Some('é'));
    }
}
