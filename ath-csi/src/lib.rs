//! Decoder for channel state information (CSI) traces recorded by the
//! [Atheros CSI Tool](https://github.com/xieyaxiongfly/Atheros-CSI-Tool).
//!
//! The logging tool writes one record per received packet: a fixed
//! status [`header`], a bit-packed CSI [`matrix`] and the raw 802.11
//! frame. [`TraceFile`] frames a whole trace into [`Record`]s.
//!
//! ```
//! # use ath_csi::{matrix::ComplexMatrix, trace::{Endianness, Record, TraceWriter}};
//! use ath_csi::TraceFile;
//!
//! # let mut w = TraceWriter::new(Some(Endianness::Big));
//! # w.push(&Record { header: Default::default(), csi: ComplexMatrix::zeros(56, 2, 2) }, &[])?;
//! # let data = w.finish();
//! let trace = TraceFile::from_bytes(&data);
//!
//! for record in &trace {
//!     let csi = &record.csi;
//!     assert_eq!((csi.num_tones(), csi.nc(), csi.nr()), (56, 2, 2));
//! }
//! # Ok::<(), ath_csi::error::EncodeError>(())
//! ```

pub mod bits;
pub mod error;
pub mod header;
pub mod ieee80211;
pub mod matrix;
pub mod params;
pub mod trace;

pub use error::Error;
pub use header::Header;
pub use matrix::ComplexMatrix;
pub use params::DecodeParams;
pub use trace::{Record, TraceFile};
