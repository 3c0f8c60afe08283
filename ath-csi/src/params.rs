//! Trace decoding parameters.

/// Default for [`DecodeParams::tail_guard`].
pub const DEFAULT_TAIL_GUARD: usize = 420;

/// Parameters controlling how a trace is framed.
///
/// ```
/// # use ath_csi::params::DecodeParams;
/// # use ath_csi::trace::TraceFile;
/// let params = DecodeParams {
///     keep_metadata_only: true,
///     ..Default::default()
/// };
///
/// let trace = TraceFile::from_bytes_with(&[], &params);
/// assert!(trace.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeParams {
    /// Keep records whose `csi_length` is zero, with an empty matrix.
    /// When `false` they are skipped.
    pub keep_metadata_only: bool,
    /// Decoding ends once fewer than this many bytes are left after a
    /// record. The logging tool leaves a tail of this size that does not
    /// hold a complete record.
    pub tail_guard: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            keep_metadata_only: false,
            tail_guard: DEFAULT_TAIL_GUARD,
        }
    }
}
