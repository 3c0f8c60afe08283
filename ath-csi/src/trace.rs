//! Framing of trace files written by the Atheros CSI logging tool.
//!
//! A trace is an optional endianness marker followed by back-to-back
//! records, with no delimiter between them:
//!
//! ```text
//! | marker(0|1) | len(2) | header(25) | csi(csi_length) | payload(payload_length) | len(2) | ...
//! ```
//!
//! `len` is big endian. Records are read in order until one no longer
//! fits in the buffer, or until fewer than
//! [`tail_guard`](DecodeParams::tail_guard) bytes remain.

use std::iter::FusedIterator;

use tracing::{debug, trace, warn};

use crate::{
    error::{EncodeError, Error, Malformed},
    header::{Header, HEADER_LEN},
    matrix::{self, ComplexMatrix},
    params::DecodeParams,
};

/// Size of the length prefix in front of every record.
pub const LEN_PREFIX: usize = 2;

/// Header convention announced by the first byte of a trace.
///
/// Headers are decoded big endian under either convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Marker `0xff`, or no marker at all.
    #[default]
    Big,
    /// Marker `0x00`.
    Little,
}

impl Endianness {
    const BIG_MARKER: u8 = 0xff;
    const LITTLE_MARKER: u8 = 0x00;

    /// Returns the convention of `buf` and the number of marker bytes
    /// to skip.
    ///
    /// ```
    /// # use ath_csi::trace::Endianness;
    /// assert_eq!(Endianness::detect(&[0xff, 0x01]), (Endianness::Big, 1));
    /// assert_eq!(Endianness::detect(&[0x00, 0x01]), (Endianness::Little, 1));
    /// assert_eq!(Endianness::detect(&[0x01, 0x49]), (Endianness::Big, 0));
    /// ```
    pub fn detect(buf: &[u8]) -> (Self, usize) {
        match buf.first() {
            Some(&Self::BIG_MARKER) => (Self::Big, 1),
            Some(&Self::LITTLE_MARKER) => (Self::Little, 1),
            _ => {
                warn!("trace has no endianness marker, assuming big endian");
                (Self::Big, 0)
            }
        }
    }

    /// The marker byte announcing this convention.
    pub const fn marker(self) -> u8 {
        match self {
            Self::Big => Self::BIG_MARKER,
            Self::Little => Self::LITTLE_MARKER,
        }
    }
}

/// One captured packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: Header,
    /// Empty if the record carries no CSI.
    pub csi: ComplexMatrix,
}

impl Record {
    /// Encodes the record, followed by `payload`, in trace format.
    ///
    /// The header's lengths are taken from the data written, and so are
    /// its dimensions unless the matrix is empty.
    pub fn to_bytes(&self, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let csi = self.csi.pack();

        let mut header = self.header;
        header.csi_length = u16_len(csi.len())?;
        header.payload_length = u16_len(payload.len())?;
        if !self.csi.is_empty() {
            header.num_tones = dim(self.csi.num_tones())?;
            header.nc = dim(self.csi.nc())?;
            header.nr = dim(self.csi.nr())?;
        }

        let field_length = HEADER_LEN + csi.len() + payload.len();

        let mut out = Vec::with_capacity(LEN_PREFIX + field_length);
        out.extend_from_slice(&u16_len(field_length)?.to_be_bytes());
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&csi);
        out.extend_from_slice(payload);

        Ok(out)
    }
}

fn u16_len(len: usize) -> Result<u16, EncodeError> {
    u16::try_from(len).map_err(|_| EncodeError::RecordTooLarge(len))
}

fn dim(n: usize) -> Result<u8, EncodeError> {
    u8::try_from(n).map_err(|_| EncodeError::DimensionTooLarge(n))
}

struct Framed {
    header: Header,
    csi: Option<ComplexMatrix>,
    next: usize,
}

/// Frames the record whose length prefix starts at `pos`.
///
/// Returns `Ok(None)` when the trace ends before a complete record.
fn frame_at(buf: &[u8], pos: usize) -> Result<Option<Framed>, Error> {
    if pos + 4 >= buf.len() {
        return Ok(None);
    }

    let field_length = usize::from(u16::from_be_bytes([buf[pos], buf[pos + 1]]));
    if pos + field_length > buf.len() {
        debug!(offset = pos, field_length, "record truncated by end of trace");
        return Ok(None);
    }

    let mut at = pos + LEN_PREFIX;

    let Some(raw) = buf
        .get(at..at + HEADER_LEN)
        .and_then(|b| <&[u8; HEADER_LEN]>::try_from(b).ok())
    else {
        debug!(offset = pos, "header truncated by end of trace");
        return Ok(None);
    };
    let header = Header::from_bytes(raw);
    at += HEADER_LEN;

    let csi = if header.has_csi() {
        let declared = usize::from(header.csi_length);
        let malformed = |kind| Error::MalformedRecord { offset: pos, kind };

        let payload = buf.get(at..at + declared).ok_or_else(|| {
            malformed(Malformed::CsiOverrun {
                declared,
                available: buf.len() - at,
            })
        })?;

        let (num_tones, nc, nr) = header.dim();
        let csi = matrix::unpack(payload, num_tones, nc, nr).map_err(|e| malformed(e.into()))?;
        at += declared;

        Some(csi)
    } else {
        None
    };

    // the 802.11 frame is skipped unread, even if it runs past the end
    at += usize::from(header.payload_length);

    Ok(Some(Framed {
        header,
        csi,
        next: at,
    }))
}

/// Iterator over the records of a trace.
///
/// Ends at the first truncated record, after the tail guard triggers,
/// or after yielding an error.
///
/// ```
/// # use ath_csi::{params::DecodeParams, trace::Records};
/// let mut records = Records::new(&[0xff], &DecodeParams::default());
/// assert!(records.next().is_none());
/// assert_eq!(records.position(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    pos: usize,
    endianness: Endianness,
    params: DecodeParams,
    done: bool,
}

impl<'a> Records<'a> {
    pub fn new(buf: &'a [u8], params: &DecodeParams) -> Self {
        let (endianness, pos) = Endianness::detect(buf);

        Self {
            buf,
            pos,
            endianness,
            params: params.clone(),
            done: false,
        }
    }

    /// The convention announced by the trace.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Offset of the next length prefix.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let offset = self.pos;
            let Framed { header, csi, next } = match frame_at(self.buf, offset) {
                Ok(Some(framed)) => framed,
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };

            self.pos = next;
            if self.pos.saturating_add(self.params.tail_guard) > self.buf.len() {
                debug!(offset = self.pos, "fewer than tail guard bytes left");
                self.done = true;
            }

            match csi {
                Some(csi) => {
                    debug!(offset, dim = ?csi.dim(), "decoded record");
                    return Some(Ok(Record { header, csi }));
                }
                None if self.params.keep_metadata_only => {
                    debug!(offset, "decoded record without CSI");
                    return Some(Ok(Record {
                        header,
                        csi: ComplexMatrix::empty(),
                    }));
                }
                None => trace!(offset, "skipping record without CSI"),
            }
        }

        None
    }
}

impl FusedIterator for Records<'_> {}

/// All records decoded from one trace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceFile {
    endianness: Endianness,
    records: Vec<Record>,
}

impl TraceFile {
    /// Decodes a trace with [`DecodeParams::default`].
    pub fn from_bytes(buf: &[u8]) -> Self {
        Self::from_bytes_with(buf, &DecodeParams::default())
    }

    /// Decodes every record up to the first truncated or malformed one.
    ///
    /// Never fails: a damaged trace yields fewer records.
    pub fn from_bytes_with(buf: &[u8], params: &DecodeParams) -> Self {
        let mut iter = Records::new(buf, params);
        let mut records = vec![];

        for res in iter.by_ref() {
            match res {
                Ok(record) => records.push(record),
                Err(err) => warn!(%err, decoded = records.len(), "stopping at malformed record"),
            }
        }

        Self {
            endianness: iter.endianness(),
            records,
        }
    }

    /// Like [`TraceFile::from_bytes_with`], but fails on the first
    /// malformed record instead of stopping there.
    pub fn try_from_bytes(buf: &[u8], params: &DecodeParams) -> Result<Self, Error> {
        let mut iter = Records::new(buf, params);
        let records = iter.by_ref().collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            endianness: iter.endianness(),
            records,
        })
    }

    /// The convention announced by the trace.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl IntoIterator for TraceFile {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a TraceFile {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Builds traces in the format [`TraceFile`] reads.
///
/// ```
/// # use ath_csi::{matrix::ComplexMatrix, trace::{Endianness, Record, TraceFile, TraceWriter}};
/// let record = Record {
///     header: Default::default(),
///     csi: ComplexMatrix::zeros(56, 1, 1),
/// };
///
/// let mut w = TraceWriter::new(Some(Endianness::Big));
/// w.push(&record, &[])?;
///
/// let trace = TraceFile::from_bytes(&w.finish());
/// assert_eq!(trace.len(), 1);
/// assert_eq!(trace.records()[0].csi, record.csi);
/// # Ok::<(), ath_csi::error::EncodeError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TraceWriter {
    buf: Vec<u8>,
}

impl TraceWriter {
    /// Starts a trace, with a marker byte unless `endianness` is `None`.
    pub fn new(endianness: Option<Endianness>) -> Self {
        Self {
            buf: endianness.map(Endianness::marker).into_iter().collect(),
        }
    }

    /// Appends a record followed by its 802.11 frame.
    pub fn push(&mut self, record: &Record, payload: &[u8]) -> Result<&mut Self, EncodeError> {
        self.buf.extend(record.to_bytes(payload)?);
        Ok(self)
    }

    /// Appends raw bytes.
    pub fn push_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
