//! Bit-level access to packed CSI payloads.
//!
//! The firmware writes fields LSB-first into a stream of 16-bit
//! little-endian words. Fields are not byte aligned, so a single field
//! may straddle two words:
//!
//! ```text
//! word 0: | f1[5:0] | f0[9:0] |
//! word 1: | f3[1:0] | f2[9:0] | f1[9:6] |
//! ```

/// Error returned when a read would extend past the end of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("bitstream exhausted: {requested} bits requested at bit {position} of a {len}-byte payload")]
pub struct Exhausted {
    /// Bit position the read started at.
    pub position: usize,
    /// Number of bits requested.
    pub requested: usize,
    /// Payload length in bytes.
    pub len: usize,
}

/// Reinterprets the low `bits` bits of `value` as a two's-complement integer.
///
/// `bits` must be in `1..=16`.
///
/// ```
/// # use ath_csi::bits::sign_extend;
/// assert_eq!(sign_extend(0b01_1111_1111, 10), 511);
/// assert_eq!(sign_extend(0b10_0000_0000, 10), -512);
/// assert_eq!(sign_extend(0b11_1111_1111, 10), -1);
/// ```
pub const fn sign_extend(value: u32, bits: u32) -> i32 {
    let value = (value & ((1 << bits) - 1)) as i32;
    if value & (1 << (bits - 1)) != 0 {
        value - (1 << bits)
    } else {
        value
    }
}

/// Reads fixed-width fields from a packed payload.
///
/// The cursor holds up to 32 bits in an accumulator and pulls in one
/// 16-bit word at a time whenever it holds fewer bits than requested.
/// A word that straddles the end of the payload is zero-padded, but a
/// field whose bits lie past the end is rejected with [`Exhausted`].
///
/// ```
/// # use ath_csi::bits::BitCursor;
/// // 0x0e00 holds a 10-bit 512 followed by a 10-bit 3
/// let mut bits = BitCursor::new(&[0x00, 0x0e, 0x00, 0x00]);
///
/// assert_eq!(bits.take_bits(10), Ok(512));
/// assert_eq!(bits.take_signed(10), Ok(3));
/// assert_eq!(bits.position(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    buf: &'a [u8],
    byte_offset: usize,
    acc: u32,
    bits_available: u32,
}

impl<'a> BitCursor<'a> {
    /// Widest field [`take_bits`](Self::take_bits) accepts.
    pub const MAX_TAKE: u32 = 16;

    /// Creates a cursor over `buf`, seeded with its first word.
    pub fn new(buf: &'a [u8]) -> Self {
        let mut bits = Self {
            buf,
            byte_offset: 0,
            acc: 0,
            bits_available: 0,
        };
        bits.refill();
        bits
    }

    fn byte(&self, i: usize) -> u8 {
        self.buf.get(i).copied().unwrap_or(0)
    }

    /// Pulls the next 16-bit word into the accumulator.
    ///
    /// Does nothing if the accumulator cannot take another 16 bits.
    pub fn refill(&mut self) {
        if self.bits_available > 16 {
            return;
        }

        let word = u16::from_le_bytes([
            self.byte(self.byte_offset),
            self.byte(self.byte_offset + 1),
        ]);
        self.acc |= u32::from(word) << self.bits_available;
        self.byte_offset += 2;
        self.bits_available += 16;
    }

    /// Number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.byte_offset * 8 - self.bits_available as usize
    }

    /// Number of bits currently held in the accumulator.
    pub fn bits_available(&self) -> u32 {
        self.bits_available
    }

    /// Takes the next `n` bits as an unsigned value.
    ///
    /// On error the cursor is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if `n` is larger than [`Self::MAX_TAKE`].
    pub fn take_bits(&mut self, n: u32) -> Result<u32, Exhausted> {
        assert!(n <= Self::MAX_TAKE, "cannot take more than 16 bits at once");

        let position = self.position();
        if position + n as usize > self.buf.len() * 8 {
            return Err(Exhausted {
                position,
                requested: n as usize,
                len: self.buf.len(),
            });
        }

        if self.bits_available < n {
            self.refill();
        }

        let value = self.acc & ((1 << n) - 1);
        self.acc >>= n;
        self.bits_available -= n;

        Ok(value)
    }

    /// Takes the next `n` bits as a two's-complement integer.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero or larger than [`Self::MAX_TAKE`].
    pub fn take_signed(&mut self, n: u32) -> Result<i32, Exhausted> {
        assert!(n > 0, "cannot sign extend a zero-width field");
        self.take_bits(n).map(|v| sign_extend(v, n))
    }
}

/// Packs fixed-width fields in the layout [`BitCursor`] reads.
///
/// ```
/// # use ath_csi::bits::BitWriter;
/// let mut w = BitWriter::new();
/// w.push(512, 10);
/// w.push(3, 10);
///
/// assert_eq!(w.finish(), [0x00, 0x0e, 0x00, 0x00]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    bits: u32,
}

impl BitWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `n` bits of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is larger than 16.
    pub fn push(&mut self, value: u32, n: u32) {
        assert!(n <= 16, "cannot push more than 16 bits at once");

        self.acc |= (value & ((1 << n) - 1)) << self.bits;
        self.bits += n;

        while self.bits >= 16 {
            self.out.extend_from_slice(&(self.acc as u16).to_le_bytes());
            self.acc >>= 16;
            self.bits -= 16;
        }
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.out.len() * 8 + self.bits as usize
    }

    /// Flushes the last partial word, zero-padded, and returns the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.out.extend_from_slice(&(self.acc as u16).to_le_bytes());
        }
        self.out
    }
}
