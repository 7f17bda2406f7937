//! # Bit Packing
//!
//! MSB-first bit fields with no byte alignment between them.
//!
//! ```text
//! byte:    ┌────────┬────────┬────────┬────────┬────────┐
//!          │76543210│76543210│76543210│76543210│76543210│
//! picture: │ id (14 bits)  │ h (11 bits) │ v (11 bits) │...
//!          └────────┴────────┴────────┴────────┴────────┘
//! ```
//!
//! The reader never fails: bits past the end of the buffer read as zero.
//! Callers check that enough bytes are present before trusting the values.

/// Reads bit fields from a byte slice.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader at bit 0 of `data`.
    #[inline]
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    /// Reads `bits` (at most 32) bits as an unsigned value.
    ///
    /// Bits beyond the end of the buffer are zero.
    pub fn read_bits(&mut self, bits: u8) -> u32 {
        debug_assert!(bits <= 32);

        let mut value = 0u32;
        for _ in 0..bits.min(32) {
            let byte_idx = self.bit_position / 8;
            let bit_idx = 7 - (self.bit_position % 8);
            let bit = self.data.get(byte_idx).map_or(0, |byte| (byte >> bit_idx) & 1);
            value = (value << 1) | u32::from(bit);
            self.bit_position += 1;
        }
        value
    }

    /// Reads a `bits`-wide two's complement field.
    #[inline]
    pub fn read_signed(&mut self, bits: u8) -> i16 {
        sign_extend(self.read_bits(bits), bits)
    }

    /// Bits consumed so far.
    #[inline]
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_position
    }

    /// Bytes touched so far, rounding a partial byte up.
    #[inline]
    #[must_use]
    pub const fn bytes_consumed(&self) -> usize {
        (self.bit_position + 7) / 8
    }

    /// Bits left before the reader starts producing zeros.
    #[inline]
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_position)
    }
}

/// Interprets the low `bits` bits of `value` as a signed field.
///
/// Widths above 16 are treated as 16.
#[must_use]
pub const fn sign_extend(value: u32, bits: u8) -> i16 {
    if bits == 0 {
        return 0;
    }
    let bits = if bits > 16 { 16 } else { bits };
    let shift = 32 - bits as u32;
    (((value << shift) as i32) >> shift) as i16
}

/// Writes MSB-first bit fields. The mirror of [`BitReader`].
#[derive(Clone, Debug, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    bit_position: usize,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            bit_position: 0,
        }
    }

    /// Returns the number of bytes written (rounded up).
    #[inline]
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        (self.bit_position + 7) / 8
    }

    /// Returns the packed data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer, returning the packed bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes the low `bits` (1-32) bits of `value`.
    pub fn write_bits(&mut self, value: u32, bits: u8) {
        debug_assert!(bits <= 32 && bits > 0);

        for i in (0..bits.min(32)).rev() {
            let bit = (value >> i) & 1;
            let byte_idx = self.bit_position / 8;
            if byte_idx == self.buffer.len() {
                self.buffer.push(0);
            }
            if bit == 1 {
                self.buffer[byte_idx] |= 0x80 >> (self.bit_position % 8);
            }
            self.bit_position += 1;
        }
    }

    /// Writes a signed value as a `bits`-wide two's complement field.
    #[inline]
    pub fn write_signed(&mut self, value: i16, bits: u8) {
        self.write_bits(i32::from(value) as u32, bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_across_byte_boundary() {
        let data = [0b1010_1100, 0b0101_0000];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3), 0b101);
        assert_eq!(reader.read_bits(7), 0b0_1100_01);
        assert_eq!(reader.bit_position(), 10);
        assert_eq!(reader.bytes_consumed(), 2);
    }

    #[test]
    fn test_read_past_end_is_zero() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(4), 0xF);
        assert_eq!(reader.read_bits(8), 0xF0);
        assert_eq!(reader.read_bits(32), 0);
        assert_eq!(reader.bits_remaining(), 0);
    }

    #[test]
    fn test_full_width_read() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(32), 0xDEAD_BEEF);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x7FF, 11), -1);
        assert_eq!(sign_extend(0x400, 11), -1024);
        assert_eq!(sign_extend(0x3FF, 11), 1023);
        assert_eq!(sign_extend(0, 11), 0);
        assert_eq!(sign_extend(0xFFFF_FFFF, 0), 0);
    }

    #[test]
    fn test_every_11_bit_value_survives_packing() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1, 1); // misalign on purpose
        for v in -1024i16..=1023 {
            writer.write_signed(v, 11);
        }

        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(1), 1);
        for v in -1024i16..=1023 {
            assert_eq!(reader.read_signed(11), v);
        }
    }

    #[test]
    fn test_writer_masks_to_width() {
        let mut writer = BitWriter::new();
        writer.write_bits(0xFFFF, 4);
        writer.write_bits(0, 4);
        assert_eq!(writer.as_slice(), &[0xF0]);
        assert_eq!(writer.byte_len(), 1);
    }
}
