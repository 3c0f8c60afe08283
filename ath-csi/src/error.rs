//! Errors returned while decoding or encoding traces.

use crate::bits::Exhausted;

/// What is wrong with a malformed record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    /// The declared CSI region extends past the end of the trace.
    #[error("CSI region of {declared} bytes exceeds the {available} bytes left")]
    CsiOverrun { declared: usize, available: usize },
    /// The CSI region is too short for the declared dimensions.
    #[error(transparent)]
    Bitstream(#[from] Exhausted),
}

/// Error returned when decoding a trace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The record starting at `offset` (its length prefix) is inconsistent
    /// with the bytes that follow it.
    #[error("malformed record at offset {offset}: {kind}")]
    MalformedRecord {
        offset: usize,
        #[source]
        kind: Malformed,
    },
}

/// Error returned when encoding a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A matrix dimension does not fit in its header byte.
    #[error("dimension {0} does not fit in a header field")]
    DimensionTooLarge(usize),
    /// A length does not fit in its 16-bit field.
    #[error("{0} bytes do not fit in a 16-bit length field")]
    RecordTooLarge(usize),
}
