//! IEEE 802.11n definitions.
//!
//! References:
//! - [List of WLAN channels (Wikipedia)](https://en.wikipedia.org/wiki/List_of_WLAN_channels)

use std::marker::PhantomData;

use uom::si::f64::Frequency;

/// Error returned when the bandwidth code is not one the chipset reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid bandwidth code {0}")]
pub struct InvalidBandwidth(pub u8);

/// Bandwidth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Bandwidth {
    /// 20 MHz.
    Bw20,
    /// 40 MHz.
    Bw40,
}

impl Bandwidth {
    /// Returns the bandwidth in MHz.
    pub const fn mhz(&self) -> u8 {
        match self {
            Bandwidth::Bw20 => 20,
            Bandwidth::Bw40 => 40,
        }
    }

    /// Returns the number of tones the chipset reports CSI for.
    ///
    /// | PHY standard     | Subcarrier range     | Tones |
    /// |------------------|----------------------|-------|
    /// | 802.11n, 20 MHz  | –28 to –1, +1 to +28 | 56    |
    /// | 802.11n, 40 MHz  | –58 to –2, +2 to +58 | 114   |
    pub const fn tones(&self) -> usize {
        match self {
            Bandwidth::Bw20 => 56,
            Bandwidth::Bw40 => 114,
        }
    }

    /// The frequency in Hz.
    pub const fn freq(&self) -> Frequency {
        Frequency {
            dimension: PhantomData,
            units: PhantomData,
            value: match self {
                Bandwidth::Bw20 => 20e6,
                Bandwidth::Bw40 => 40e6,
            },
        }
    }
}

impl TryFrom<u8> for Bandwidth {
    type Error = InvalidBandwidth;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Bw20),
            1 => Ok(Self::Bw40),
            _ => Err(InvalidBandwidth(value)),
        }
    }
}

/// Returns the channel number for a center frequency in MHz.
///
/// ```
/// # use ath_csi::ieee80211::channel_number;
/// assert_eq!(channel_number(2437), Some(6));
/// assert_eq!(channel_number(5180), Some(36));
/// assert_eq!(channel_number(2450), None);
/// ```
pub const fn channel_number(mhz: u16) -> Option<u8> {
    match mhz {
        2484 => Some(14),
        2412..=2472 if (mhz - 2407) % 5 == 0 => Some(((mhz - 2407) / 5) as u8),
        5000..=5895 if mhz % 5 == 0 => Some(((mhz - 5000) / 5) as u8),
        _ => None,
    }
}
