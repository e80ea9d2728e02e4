//! Error types for rsocket-framing.

use thiserror::Error;

/// Main error type for all framing operations.
#[derive(Debug, Error)]
pub enum FrameError {
    /// I/O error while reading from or writing to the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The outer length prefix declared an empty record.
    #[error("bad frame length: {0}")]
    MalformedLength(usize),

    /// The outer length prefix declared a record larger than allowed.
    #[error("frame of {length} bytes exceeds maximum {max}")]
    OversizeFrame { length: usize, max: usize },

    /// Fewer bytes than a frame header were supplied.
    #[error("malformed frame header: need 6 bytes, got {0}")]
    MalformedHeader(usize),

    /// Stream ID does not fit in 31 bits.
    #[error("stream ID {0} out of range")]
    StreamIdOutOfRange(u32),

    /// A length-prefixed field does not fit its 24-bit length.
    #[error("{field} of {len} bytes does not fit a 24-bit length")]
    FieldTooLarge { field: &'static str, len: usize },

    /// Frame body failed structural validation.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Stream ended in the middle of a record.
    #[error("stream ended with {buffered} bytes of an incomplete frame")]
    TruncatedFrame { buffered: usize },

    /// Decoder was used again after a fatal framing error.
    #[error("frame decoder poisoned by an earlier framing error")]
    Poisoned,

    /// Decode loop observed cancellation.
    #[error("decode cancelled")]
    Cancelled,

    /// Writer task is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Writer queue is full and the caller asked not to wait.
    #[error("writer queue full")]
    WriterBusy,

    /// Error raised by a frame handler.
    #[error("handler error: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FrameError {
    /// Wrap an arbitrary handler failure.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Handler(err.into())
    }

    /// Whether this error ends a decode session.
    ///
    /// Framing errors leave the byte stream misaligned, so every variant the
    /// decoder itself produces is fatal.
    pub fn is_framing_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedLength(_)
                | Self::OversizeFrame { .. }
                | Self::MalformedHeader(_)
                | Self::TruncatedFrame { .. }
                | Self::Poisoned
        )
    }
}

/// Result type alias using FrameError.
pub type Result<T> = std::result::Result<T, FrameError>;
