//! CSI matrices and their packed on-wire encoding.
//!
//! Each complex value occupies 20 bits of the payload: a 10-bit
//! two's-complement imaginary part followed by a 10-bit real part.
//! Values are stored tone by tone, and within a tone for every
//! transmit chain, for every receive chain:
//!
//! ```text
//! for tone in 0..num_tones {
//!     for tx in 0..nc {
//!         for rx in 0..nr {
//!             im(10) re(10)
//!         }
//!     }
//! }
//! ```

use ndarray::Array3;
use num_complex::Complex;
use num_traits::Zero;

use crate::bits::{BitCursor, BitWriter, Exhausted};

/// Width of the real or imaginary part of a value.
pub const BITS_PER_SYMBOL: u32 = 10;

/// Width of one complex value.
pub const BITS_PER_COMPLEX_SYMBOL: u32 = 2 * BITS_PER_SYMBOL;

// added by the firmware to every decoded part
const CALIBRATION_OFFSET: i32 = 1;

/// Channel estimates for one packet, indexed `[tone][tx][rx]`.
///
/// Parts are kept as raw integers in `-511..=512`. Scaling to physical
/// units is left to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexMatrix(Array3<Complex<i16>>);

impl ComplexMatrix {
    /// The 0×0×0 matrix of a record without CSI.
    pub fn empty() -> Self {
        Self::zeros(0, 0, 0)
    }

    /// A `num_tones × nc × nr` matrix of zeros.
    pub fn zeros(num_tones: usize, nc: usize, nr: usize) -> Self {
        Self(Array3::from_elem((num_tones, nc, nr), Complex::zero()))
    }

    /// Wraps an array shaped `(num_tones, nc, nr)`.
    pub fn from_array(csi: Array3<Complex<i16>>) -> Self {
        Self(csi)
    }

    /// Number of tones (subcarriers).
    pub fn num_tones(&self) -> usize {
        self.0.dim().0
    }

    /// Number of transmit chains.
    pub fn nc(&self) -> usize {
        self.0.dim().1
    }

    /// Number of receive chains.
    pub fn nr(&self) -> usize {
        self.0.dim().2
    }

    /// `(num_tones, nc, nr)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        self.0.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value for one tone and antenna pair, if in range.
    pub fn get(&self, tone: usize, tx: usize, rx: usize) -> Option<Complex<i16>> {
        self.0.get((tone, tx, rx)).copied()
    }

    pub fn as_array(&self) -> &Array3<Complex<i16>> {
        &self.0
    }

    pub fn into_array(self) -> Array3<Complex<i16>> {
        self.0
    }

    /// Converts to floating point without scaling.
    pub fn to_f64(&self) -> Array3<Complex<f64>> {
        self.0
            .mapv(|z| Complex::new(f64::from(z.re), f64::from(z.im)))
    }

    /// Number of payload bytes a matrix of the given shape packs into.
    ///
    /// The cursor consumes whole 16-bit words, so the length is rounded
    /// up to an even number of bytes.
    ///
    /// ```
    /// # use ath_csi::matrix::ComplexMatrix;
    /// assert_eq!(ComplexMatrix::packed_len(1, 1, 1), 4);
    /// assert_eq!(ComplexMatrix::packed_len(56, 2, 2), 560);
    /// ```
    pub fn packed_len(num_tones: usize, nc: usize, nr: usize) -> usize {
        let bits = num_tones * nc * nr * BITS_PER_COMPLEX_SYMBOL as usize;
        bits.div_ceil(16) * 2
    }

    /// Encodes the matrix as a CSI payload.
    ///
    /// Parts outside `-511..=512` are truncated to 10 bits.
    pub fn pack(&self) -> Vec<u8> {
        let mut w = BitWriter::new();

        // logical order, regardless of memory layout
        for z in self.0.iter() {
            w.push(encode_part(z.im), BITS_PER_SYMBOL);
            w.push(encode_part(z.re), BITS_PER_SYMBOL);
        }

        w.finish()
    }
}

fn decode_part(bits: &mut BitCursor<'_>) -> Result<i16, Exhausted> {
    let v = bits.take_signed(BITS_PER_SYMBOL)? + CALIBRATION_OFFSET;
    // -511..=512
    Ok(v as i16)
}

fn encode_part(v: i16) -> u32 {
    (i32::from(v) - CALIBRATION_OFFSET) as u32 & ((1 << BITS_PER_SYMBOL) - 1)
}

/// Decodes a `num_tones × nc × nr` matrix from a packed CSI payload.
///
/// Fails if the payload holds fewer bits than the shape needs. Trailing
/// bytes beyond that are ignored.
///
/// ```
/// # use ath_csi::matrix::unpack;
/// # use num_complex::Complex;
/// let csi = unpack(&[0x00, 0x0e, 0x00, 0x00], 1, 1, 1).unwrap();
///
/// // im = 512 - 1024 + 1, re = 3 + 1
/// assert_eq!(csi.get(0, 0, 0), Some(Complex::new(4, -511)));
/// ```
pub fn unpack(
    payload: &[u8],
    num_tones: usize,
    nc: usize,
    nr: usize,
) -> Result<ComplexMatrix, Exhausted> {
    let needed = num_tones * nc * nr * BITS_PER_COMPLEX_SYMBOL as usize;
    if needed > payload.len() * 8 {
        return Err(Exhausted {
            position: 0,
            requested: needed,
            len: payload.len(),
        });
    }

    let mut bits = BitCursor::new(payload);
    let mut csi = ComplexMatrix::zeros(num_tones, nc, nr);

    for tone in 0..num_tones {
        for tx in 0..nc {
            for rx in 0..nr {
                let im = decode_part(&mut bits)?;
                let re = decode_part(&mut bits)?;
                csi.0[(tone, tx, rx)] = Complex::new(re, im);
            }
        }
    }

    Ok(csi)
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;
    use num_complex::Complex;

    use super::{unpack, ComplexMatrix};
    use crate::bits::{BitWriter, Exhausted};

    fn single(im: u32, re: u32) -> Complex<i16> {
        let mut w = BitWriter::new();
        w.push(im, 10);
        w.push(re, 10);
        let buf = w.finish();
        assert_eq!(buf.len(), 4);

        unpack(&buf, 1, 1, 1).unwrap().get(0, 0, 0).unwrap()
    }

    #[test]
    fn calibration_offset() {
        assert_eq!(single(0, 0), Complex::new(1, 1));
        assert_eq!(single(511, 511), Complex::new(512, 512));
        assert_eq!(single(512, 512), Complex::new(-511, -511));
        assert_eq!(single(1023, 1023), Complex::new(0, 0));
        // imaginary part comes first
        assert_eq!(single(1023, 511), Complex::new(512, 0));
    }

    #[test]
    fn traversal_order() {
        let (num_tones, nc, nr) = (3, 2, 3);

        // field k holds the raw value k
        let mut w = BitWriter::new();
        for k in 0..(num_tones * nc * nr * 2) as u32 {
            w.push(k, 10);
        }
        let csi = unpack(&w.finish(), num_tones, nc, nr).unwrap();

        assert_eq!(csi.dim(), (3, 2, 3));
        for tone in 0..num_tones {
            for tx in 0..nc {
                for rx in 0..nr {
                    let cell = ((tone * nc + tx) * nr + rx) as i16;
                    assert_eq!(
                        csi.get(tone, tx, rx),
                        Some(Complex::new(2 * cell + 2, 2 * cell + 1)),
                        "tone {tone}, tx {tx}, rx {rx}"
                    );
                }
            }
        }
    }

    #[test]
    fn pack_inverts_unpack() {
        let csi = ComplexMatrix::from_array(Array3::from_shape_fn((56, 2, 3), |(t, tx, rx)| {
            let re = ((t * 37 + tx * 11 + rx) % 1024) as i16 - 511;
            let im = 512 - ((t * 5 + tx * 3 + rx * 17) % 1024) as i16;
            Complex::new(re, im)
        }));

        let payload = csi.pack();
        assert_eq!(payload.len(), ComplexMatrix::packed_len(56, 2, 3));
        assert_eq!(unpack(&payload, 56, 2, 3).unwrap(), csi);
    }

    #[test]
    fn short_payload() {
        // 56 tones need 140 bytes
        assert_eq!(
            unpack(&[0; 139], 56, 1, 1),
            Err(Exhausted {
                position: 0,
                requested: 1120,
                len: 139,
            })
        );
        assert!(unpack(&[0; 140], 56, 1, 1).is_ok());
    }

    #[test]
    fn empty_shape() {
        let csi = unpack(&[], 0, 1, 1).unwrap();
        assert!(csi.is_empty());
        assert_eq!(csi, ComplexMatrix::zeros(0, 1, 1));
        assert!(ComplexMatrix::empty().pack().is_empty());
    }

    #[test]
    fn to_f64() {
        let csi = ComplexMatrix::from_array(Array3::from_elem((1, 1, 2), Complex::new(-3, 7)));
        let f = csi.to_f64();
        assert_eq!(f[(0, 0, 1)], Complex::new(-3.0, 7.0));
    }
}
