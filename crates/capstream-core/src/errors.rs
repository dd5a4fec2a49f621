use thiserror::Error;

/// Errors from the frame codec and container framer.
///
/// Decode errors fail closed: nothing decoded past the first bad record is
/// meaningful and callers must not keep reading the stream.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Caller handed the codec a buffer that does not match the session
    /// dimensions.  A contract violation, fatal to the pipeline.
    #[error("Frame size mismatch: expected {expected} pixels, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    /// The block stream ended before the declared frame was filled.
    #[error("Encoded stream truncated at byte {offset}: {reason}")]
    TruncatedStream { offset: usize, reason: &'static str },

    /// A header byte the encoder can never emit (run length 0 or 127,
    /// literal length 0).
    #[error("Invalid block header {header:#04x} at byte {offset}")]
    InvalidBlockHeader { header: u8, offset: usize },

    /// A frame record's `has_changes` flag was neither 0 nor 1.
    #[error("Invalid frame record flag {flag:#04x}")]
    InvalidRecordFlag { flag: u8 },

    /// The zlib stage failed to inflate a frame payload.
    #[error("Payload decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    /// Reading or writing the underlying byte stream failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that terminate a recording session.
///
/// None of these are retried: a skipped or corrupted frame would break the
/// codec's cross-frame state, so the pipeline stops at the first failure and
/// the last flushed segment is the effective end of the recording.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Capture failed: {reason}")]
    CaptureFailed { reason: String },

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Segment store error: {reason}")]
    SegmentStore { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
