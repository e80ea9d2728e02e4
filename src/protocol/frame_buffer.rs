//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Splits the stream into records with the length-prefix rule:
//! - fewer than 3 bytes buffered: wait for more
//! - declared length 0: fatal `MalformedLength`
//! - declared record larger than `max_frame_size`: fatal `OversizeFrame`
//! - whole record buffered: emit `header + body` with the prefix stripped
//!
//! A fatal error poisons the buffer. The stream has no resynchronization
//! marks, so nothing after a bad prefix can be trusted.
//!
//! # Example
//!
//! ```
//! use rsocket_framing::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Length 6, stream 1, CANCEL, split across two reads
//! assert!(buffer.push(&[0, 0, 6, 0, 0]).unwrap().is_empty());
//! let records = buffer.push(&[0, 1, 0x24, 0]).unwrap();
//!
//! assert_eq!(records.len(), 1);
//! assert_eq!(&records[0][..], &[0, 0, 0, 1, 0x24, 0]);
//! ```

use bytes::{Buf, Bytes, BytesMut};
use tracing::{trace, warn};

use super::u24::{decode_u24, U24_SIZE};
use super::wire_format::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};

/// What to do with an incomplete record left over at end of stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingBytes {
    /// Drop the bytes and end cleanly (logged at `warn`).
    #[default]
    Discard,
    /// Report [`FrameError::TruncatedFrame`].
    Error,
}

/// Parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a record; may hold a partial one.
    Splitting,
    /// A fatal framing error was returned.
    Poisoned,
}

/// Buffer for accumulating incoming bytes and extracting complete records.
///
/// All data is stored in a single `BytesMut` buffer; emitted records are
/// frozen slices of it, so later reads never alias an emitted record.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Largest record accepted, including its 3-byte length prefix.
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64 KiB, max record: 16 MiB + 3.
    pub fn new() -> Self {
        Self::with_capacity_and_max_frame(DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame buffer with a custom maximum record size.
    pub fn with_max_frame(max_frame_size: usize) -> Self {
        Self::with_capacity_and_max_frame(DEFAULT_BUFFER_SIZE, max_frame_size)
    }

    /// Create a new frame buffer with custom capacity and maximum record size.
    pub fn with_capacity_and_max_frame(capacity: usize, max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::Splitting,
            max_frame_size,
        }
    }

    /// Push data into the buffer and extract all complete records.
    ///
    /// Returns records with the length prefix stripped, in arrival order.
    /// Partial data is buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns a framing error on a zero or oversize length prefix. Records
    /// completed earlier in the same push are lost with it; use
    /// [`extend`](Self::extend) + [`next_record`](Self::next_record) to
    /// process records one at a time instead.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.extend(data);

        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }

        Ok(records)
    }

    /// Append data to the buffer without extracting records.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract a single record from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(record))` if a complete record was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on a framing error (the buffer is then poisoned)
    pub fn next_record(&mut self) -> Result<Option<Bytes>> {
        if self.state == State::Poisoned {
            return Err(FrameError::Poisoned);
        }

        if self.buffer.len() < U24_SIZE {
            return Ok(None);
        }

        // Peek the prefix, don't consume yet
        let length = decode_u24(&self.buffer, 0);

        if length < 1 {
            return Err(self.poison(FrameError::MalformedLength(length)));
        }

        let record_size = U24_SIZE + length;
        if record_size > self.max_frame_size {
            return Err(self.poison(FrameError::OversizeFrame {
                length: record_size,
                max: self.max_frame_size,
            }));
        }

        if self.buffer.len() < record_size {
            self.buffer.reserve(record_size - self.buffer.len());
            return Ok(None);
        }

        let mut record = self.buffer.split_to(record_size);
        record.advance(U24_SIZE);
        trace!(length, buffered = self.buffer.len(), "split frame record");

        Ok(Some(record.freeze()))
    }

    /// Handle end of stream.
    ///
    /// Succeeds when nothing is buffered. Leftover bytes of an incomplete
    /// record are discarded or reported according to `policy`.
    pub fn finish(&mut self, policy: TrailingBytes) -> Result<()> {
        if self.state == State::Poisoned {
            return Err(FrameError::Poisoned);
        }
        if self.buffer.is_empty() {
            return Ok(());
        }

        let buffered = self.buffer.len();
        self.buffer.clear();
        match policy {
            TrailingBytes::Discard => {
                warn!(buffered, "discarding incomplete frame at end of stream");
                Ok(())
            }
            TrailingBytes::Error => Err(FrameError::TruncatedFrame { buffered }),
        }
    }

    fn poison(&mut self, err: FrameError) -> FrameError {
        self.state = State::Poisoned;
        self.buffer.clear();
        err
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether a framing error has poisoned this buffer.
    pub fn is_poisoned(&self) -> bool {
        self.state == State::Poisoned
    }

    /// Maximum record size, including the length prefix.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::Splitting;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
