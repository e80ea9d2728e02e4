//! Streaming frame decoder.
//!
//! Reads a byte source, splits it into length-prefixed records with a
//! [`FrameBuffer`], and hands each record to a [`FrameHandler`] in wire
//! order. The handler is called synchronously: the next record is not
//! dispatched until the previous call returns.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use rsocket_framing::decoder::run_decode_loop;
//! use rsocket_framing::protocol::frames::{FrameKind, PayloadFrame};
//! use rsocket_framing::protocol::FrameHeader;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rsocket_framing::Result<()> {
//! let record = PayloadFrame::next(1, b"hi", b"")?.to_record()?;
//! let cancel = CancellationToken::new();
//!
//! let mut seen = Vec::new();
//! run_decode_loop(&record[..], &cancel, |header: FrameHeader, _record: Bytes| {
//!     seen.push(header.stream_id);
//!     Ok(())
//! })
//! .await?;
//!
//! assert_eq!(seen, vec![1]);
//! # Ok(())
//! # }
//! ```

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::error::{FrameError, Result};
use crate::protocol::{
    FrameBuffer, FrameHeader, TrailingBytes, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE,
};

/// Default size of a single read from the source.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Receives decoded records.
///
/// `record` is the header plus body with the length prefix stripped;
/// `header` is already decoded from its first 6 bytes. Any error is
/// returned from the decode loop unchanged and stops it.
pub trait FrameHandler {
    fn handle(&mut self, header: FrameHeader, record: Bytes) -> Result<()>;
}

impl<F> FrameHandler for F
where
    F: FnMut(FrameHeader, Bytes) -> Result<()>,
{
    fn handle(&mut self, header: FrameHeader, record: Bytes) -> Result<()> {
        self(header, record)
    }
}

/// Configuration for [`FrameDecoder`].
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Initial capacity of the accumulation buffer.
    pub initial_buffer_size: usize,
    /// Largest record accepted, including the length prefix.
    pub max_frame_size: usize,
    /// Bytes requested per read.
    pub read_chunk_size: usize,
    /// What to do with an incomplete record at end of stream.
    pub trailing: TrailingBytes,
}

impl DecoderConfig {
    /// Set the initial accumulation buffer capacity.
    pub fn initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size;
        self
    }

    /// Set the largest accepted record, including the length prefix.
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the read size (at least 1).
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Set the end-of-stream policy for an incomplete record.
    pub fn trailing(mut self, policy: TrailingBytes) -> Self {
        self.trailing = policy;
        self
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            initial_buffer_size: DEFAULT_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            trailing: TrailingBytes::Discard,
        }
    }
}

/// Whether a read error means the connection was closed locally.
///
/// Resets and aborts by the peer are transport failures, not closes.
pub fn is_closed_connection(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotConnected
}

/// Decodes records from a byte source.
pub struct FrameDecoder<R> {
    source: R,
    buffer: FrameBuffer,
    config: DecoderConfig,
}

impl<R> FrameDecoder<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a decoder with default configuration.
    pub fn new(source: R) -> Self {
        Self::with_config(source, DecoderConfig::default())
    }

    /// Create a decoder with custom configuration.
    pub fn with_config(source: R, config: DecoderConfig) -> Self {
        let buffer = FrameBuffer::with_capacity_and_max_frame(
            config.initial_buffer_size,
            config.max_frame_size,
        );
        Self {
            source,
            buffer,
            config,
        }
    }

    /// Run until end of stream, cancellation, or the first error.
    ///
    /// End of stream and a closed connection both end the loop through the
    /// trailing-bytes policy, so `Ok(())` unless an incomplete record is left
    /// under [`TrailingBytes::Error`]. Cancellation is checked before each record is
    /// dispatched; a read that is waiting for data is not interrupted.
    pub async fn run<H>(mut self, cancel: &CancellationToken, handler: &mut H) -> Result<()>
    where
        H: FrameHandler + ?Sized,
    {
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];

        loop {
            let n = match self.source.read(&mut chunk).await {
                Ok(0) => {
                    debug!(buffered = self.buffer.len(), "end of stream");
                    return self.buffer.finish(self.config.trailing);
                }
                Ok(n) => n,
                Err(e) if is_closed_connection(&e) => {
                    debug!(error = %e, buffered = self.buffer.len(), "connection closed");
                    return self.buffer.finish(self.config.trailing);
                }
                Err(e) => {
                    error!(error = %e, "read failed");
                    return Err(FrameError::Io(e));
                }
            };

            self.buffer.extend(&chunk[..n]);
            self.dispatch(cancel, handler)?;
        }
    }

    /// Drain every complete record currently buffered.
    fn dispatch<H>(&mut self, cancel: &CancellationToken, handler: &mut H) -> Result<()>
    where
        H: FrameHandler + ?Sized,
    {
        loop {
            let record = match self.buffer.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "framing error");
                    return Err(e);
                }
            };

            if cancel.is_cancelled() {
                debug!("decode cancelled");
                return Err(FrameError::Cancelled);
            }

            let header = FrameHeader::decode(&record)?;
            trace!(%header, len = record.len(), "dispatching frame");
            handler.handle(header, record)?;
        }
    }
}

/// Decode `source` with default settings until it ends.
///
/// See [`FrameDecoder::run`] for the termination rules.
pub async fn run_decode_loop<R, F>(
    source: R,
    cancel: &CancellationToken,
    mut handler: F,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(FrameHeader, Bytes) -> Result<()>,
{
    FrameDecoder::new(source).run(cancel, &mut handler).await
}
