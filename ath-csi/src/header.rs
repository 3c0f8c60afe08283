//! Status header preceding every record in an Atheros CSI trace.
//!
//! All multi-byte fields are big endian:
//!
//! ```c
//! struct csi_status {
//!     uint64 tstamp;       // TSF timestamp (us)
//!     uint16 csi_len;      // bytes of packed CSI
//!     uint16 channel;      // center frequency (MHz)
//!     uint8  phyerr;
//!     uint8  noise;
//!     uint8  rate;
//!     uint8  chanBW;       // 0: 20 MHz, 1: 40 MHz
//!     uint8  num_tones;
//!     uint8  nr;
//!     uint8  nc;
//!     uint8  rssi;
//!     uint8  rssi_0;
//!     uint8  rssi_1;
//!     uint8  rssi_2;
//!     uint16 payload_len;  // bytes of the 802.11 frame that follows
//! } __attribute__((packed));
//! ```

use uom::si::{
    f64::{Frequency, Time},
    frequency::megahertz,
    time::microsecond,
};

use crate::{
    ieee80211::{self, Bandwidth, InvalidBandwidth},
    matrix::ComplexMatrix,
};

/// Byte widths of the header fields, in wire order.
const FIELD_WIDTHS: [usize; 15] = [8, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2];

/// Size of an encoded [`Header`].
pub const HEADER_LEN: usize = {
    let mut len = 0;
    let mut i = 0;
    while i < FIELD_WIDTHS.len() {
        len += FIELD_WIDTHS[i];
        i += 1;
    }
    len
};

const _: () = assert!(HEADER_LEN == 25);

/// Decoded record header.
///
/// Fields are kept exactly as logged; see the accessors for typed views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Header {
    /// TSF timestamp in microseconds.
    pub timestamp: u64,
    /// Size of the packed CSI region in bytes.
    pub csi_length: u16,
    /// Center frequency in MHz.
    pub tx_channel: u16,
    /// PHY error code, zero for a cleanly received frame.
    pub err_info: u8,
    pub noise_floor: u8,
    /// Rate code of the frame.
    pub rate: u8,
    /// Bandwidth code; see [`Header::bandwidth`].
    pub bandwidth: u8,
    /// Number of tones (subcarriers).
    pub num_tones: u8,
    /// Number of receive chains.
    pub nr: u8,
    /// Number of transmit chains.
    pub nc: u8,
    /// Combined RSSI.
    pub rssi: u8,
    /// RSSI of receive chain 0.
    pub rssi_1: u8,
    /// RSSI of receive chain 1.
    pub rssi_2: u8,
    /// RSSI of receive chain 2.
    pub rssi_3: u8,
    /// Size of the 802.11 frame following the CSI, in bytes.
    pub payload_length: u16,
}

impl Header {
    /// Decodes a header. Any 25 bytes decode.
    ///
    /// ```
    /// # use ath_csi::header::Header;
    /// let mut b = [0u8; 25];
    /// b[7] = 0x2a; // timestamp
    /// b[12] = 1; // err_info
    /// b[24] = 0x10; // payload_length
    ///
    /// let header = Header::from_bytes(&b);
    /// assert_eq!(header.timestamp, 42);
    /// assert_eq!(header.err_info, 1);
    /// assert_eq!(header.payload_length, 16);
    /// assert_eq!(header.to_bytes(), b);
    /// ```
    pub fn from_bytes(b: &[u8; HEADER_LEN]) -> Self {
        let mut fields = [0u64; FIELD_WIDTHS.len()];
        let mut at = 0;

        for (field, width) in fields.iter_mut().zip(FIELD_WIDTHS) {
            *field = b[at..at + width]
                .iter()
                .fold(0, |acc, &byte| acc << 8 | u64::from(byte));
            at += width;
        }

        let [
            timestamp,
            csi_length,
            tx_channel,
            err_info,
            noise_floor,
            rate,
            bandwidth,
            num_tones,
            nr,
            nc,
            rssi,
            rssi_1,
            rssi_2,
            rssi_3,
            payload_length,
        ] = fields;

        // every field fits its width
        Self {
            timestamp,
            csi_length: csi_length as u16,
            tx_channel: tx_channel as u16,
            err_info: err_info as u8,
            noise_floor: noise_floor as u8,
            rate: rate as u8,
            bandwidth: bandwidth as u8,
            num_tones: num_tones as u8,
            nr: nr as u8,
            nc: nc as u8,
            rssi: rssi as u8,
            rssi_1: rssi_1 as u8,
            rssi_2: rssi_2 as u8,
            rssi_3: rssi_3 as u8,
            payload_length: payload_length as u16,
        }
    }

    /// Encodes the header in wire format.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let fields = [
            self.timestamp,
            self.csi_length.into(),
            self.tx_channel.into(),
            self.err_info.into(),
            self.noise_floor.into(),
            self.rate.into(),
            self.bandwidth.into(),
            self.num_tones.into(),
            self.nr.into(),
            self.nc.into(),
            self.rssi.into(),
            self.rssi_1.into(),
            self.rssi_2.into(),
            self.rssi_3.into(),
            self.payload_length.into(),
        ];

        let mut out = [0u8; HEADER_LEN];
        let mut at = 0;

        for (field, width) in fields.into_iter().zip(FIELD_WIDTHS) {
            out[at..at + width].copy_from_slice(&field.to_be_bytes()[8 - width..]);
            at += width;
        }

        out
    }

    /// Whether the record carries a CSI region.
    pub const fn has_csi(&self) -> bool {
        self.csi_length > 0
    }

    /// `(num_tones, nc, nr)`, the shape of the record's CSI matrix.
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.num_tones.into(), self.nc.into(), self.nr.into())
    }

    /// CSI bytes the declared dimensions take up.
    pub fn expected_csi_length(&self) -> usize {
        let (num_tones, nc, nr) = self.dim();
        ComplexMatrix::packed_len(num_tones, nc, nr)
    }

    /// Channel bandwidth.
    pub fn bandwidth(&self) -> Result<Bandwidth, InvalidBandwidth> {
        self.bandwidth.try_into()
    }

    /// Capture time relative to the TSF epoch.
    pub fn time(&self) -> Time {
        Time::new::<microsecond>(self.timestamp as f64)
    }

    /// Center frequency.
    pub fn channel(&self) -> Frequency {
        Frequency::new::<megahertz>(self.tx_channel.into())
    }

    /// Channel number, if the center frequency maps to one.
    pub fn channel_number(&self) -> Option<u8> {
        ieee80211::channel_number(self.tx_channel)
    }
}

#[cfg(test)]
mod tests {
    use uom::si::{frequency::hertz, time::second};

    use super::{Header, HEADER_LEN};
    use crate::ieee80211::Bandwidth;

    const RAW: [u8; HEADER_LEN] = [
        0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, // timestamp
        0x02, 0x30, // csi_length
        0x09, 0x85, // tx_channel
        0x00, 0xa1, 0x0b, 0x01, 0x38, 0x02, 0x02, 0x2c, 0x28, 0x2a, 0x80, // 1-byte fields
        0x00, 0x5c, // payload_length
    ];

    #[test]
    fn decode_fields() {
        let h = Header::from_bytes(&RAW);

        assert_eq!(
            h,
            Header {
                timestamp: 0x0102_0304_0506,
                csi_length: 560,
                tx_channel: 2437,
                err_info: 0,
                noise_floor: 0xa1,
                rate: 0x0b,
                bandwidth: 1,
                num_tones: 56,
                nr: 2,
                nc: 2,
                rssi: 44,
                rssi_1: 40,
                rssi_2: 42,
                rssi_3: 0x80,
                payload_length: 92,
            }
        );
        assert_eq!(h.to_bytes(), RAW);
    }

    #[test]
    fn derived() {
        let h = Header::from_bytes(&RAW);

        assert!(h.has_csi());
        assert_eq!(h.dim(), (56, 2, 2));
        assert_eq!(h.expected_csi_length(), usize::from(h.csi_length));
        assert_eq!(h.bandwidth(), Ok(Bandwidth::Bw40));
        assert!((h.channel().get::<hertz>() - 2.437e9).abs() < 1e-3);
        assert_eq!(h.channel_number(), Some(6));
        assert!((h.time().get::<second>() - 1_108_152.157_446).abs() < 1e-6);
    }

    #[test]
    fn metadata_only() {
        let h = Header {
            noise_floor: 0x9c,
            ..Default::default()
        };
        assert!(!h.has_csi());
        assert_eq!(Header::from_bytes(&h.to_bytes()), h);
    }
}
