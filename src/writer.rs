//! Dedicated writer task for outbound frames.
//!
//! Producers never touch the transport. They hand encoded records to a
//! single task over an mpsc channel; the task writes each record in full
//! before the next, so records from concurrent producers never interleave.
//!
//! # Architecture
//!
//! ```text
//! Producer 1 ─┐
//! Producer 2 ─┼─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► AsyncWrite
//! Producer N ─┘
//! ```
//!
//! Ready records are batched into one vectored write followed by a flush.
//! The bounded channel is the backpressure: `send` waits while it is full.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{FrameError, Result};
use crate::protocol::u24::{encode_u24, MAX_U24, U24_SIZE};
use crate::protocol::{Frame, HEADER_SIZE};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum frames to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// Length prefix plus frame header.
const HEAD_SIZE: usize = U24_SIZE + HEADER_SIZE;

/// A record ready to be written to the transport.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Pre-encoded length prefix and header (9 bytes).
    pub head: [u8; HEAD_SIZE],
    /// Body bytes (empty for CANCEL and header-only frames).
    pub body: Bytes,
}

impl OutboundFrame {
    /// Encode a frame as an outbound record (copies the body out of the pool).
    pub fn new(frame: &Frame) -> Result<Self> {
        let len = frame.record_len();
        if len > MAX_U24 {
            return Err(FrameError::FieldTooLarge { field: "frame", len });
        }

        let mut head = [0u8; HEAD_SIZE];
        head[..U24_SIZE].copy_from_slice(&encode_u24(len));
        frame.header().encode_into(&mut head[U24_SIZE..]);

        Ok(Self {
            head,
            body: Bytes::copy_from_slice(frame.body()),
        })
    }

    /// Total size of this record on the wire.
    #[inline]
    pub fn size(&self) -> usize {
        HEAD_SIZE + self.body.len()
    }
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Channel capacity for the record queue.
    pub channel_capacity: usize,
}

impl WriterConfig {
    /// Set the channel capacity (at least 1).
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for sending frames to the writer task.
///
/// This is cheaply cloneable and can be shared across producers.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Queue a frame, waiting while the channel is full.
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        self.send_outbound(OutboundFrame::new(frame)?).await
    }

    /// Queue an already encoded record.
    pub async fn send_outbound(&self, frame: OutboundFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| FrameError::ConnectionClosed)
    }

    /// Try to queue a frame without waiting.
    ///
    /// Returns `Err(WriterBusy)` immediately if the channel is full.
    pub fn try_send(&self, frame: &Frame) -> Result<()> {
        self.tx
            .try_send(OutboundFrame::new(frame)?)
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => FrameError::WriterBusy,
                mpsc::error::TrySendError::Closed(_) => FrameError::ConnectionClosed,
            })
    }

    /// Whether the writer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// The task ends with `Ok(())` once every handle is dropped and the queue
/// is drained, or with the first write error.
pub fn spawn_writer_task<W>(
    writer: W,
    config: WriterConfig,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, writer));

    (WriterHandle { tx }, task)
}

/// Spawn the writer task with default configuration.
pub fn spawn_writer_task_default<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task(writer, WriterConfig::default())
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);

    loop {
        // Wait for first frame
        let first = match rx.recv().await {
            Some(f) => f,
            None => {
                debug!("writer channel closed");
                return Ok(());
            }
        };

        // Collect additional ready frames (non-blocking)
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        trace!(frames = batch.len(), "writing batch");
        write_batch(&mut writer, &batch).await?;
        batch.clear();
    }
}

/// Write a batch of records using scatter/gather I/O, then flush.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundFrame]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let total_size: usize = batch.iter().map(OutboundFrame::size).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(FrameError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build IoSlice array for the data left after `skip_bytes` were written.
fn build_remaining_slices(batch: &[OutboundFrame], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for frame in batch {
        for part in [&frame.head[..], &frame.body[..]] {
            let end = offset + part.len();
            if skip_bytes < end && !part.is_empty() {
                let start = skip_bytes.saturating_sub(offset);
                slices.push(IoSlice::new(&part[start..]));
            }
            offset = end;
        }
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frames::{CancelFrame, FrameKind, PayloadFrame, RequestResponseFrame};
    use crate::protocol::FrameBuffer;
    use tokio::io::{duplex, AsyncReadExt};

    #[test]
    fn test_outbound_frame_layout() {
        let frame = RequestResponseFrame::new(5, b"hello", b"meta", 0).unwrap();
        let outbound = OutboundFrame::new(frame.frame()).unwrap();

        assert_eq!(&outbound.head[..3], &[0, 0, 18]);
        assert_eq!(outbound.body.len(), 12);
        assert_eq!(outbound.size(), 3 + 18);
    }

    #[test]
    fn test_outbound_frame_empty_body() {
        let frame = CancelFrame::new(1).unwrap();
        let outbound = OutboundFrame::new(frame.frame()).unwrap();

        assert!(outbound.body.is_empty());
        assert_eq!(outbound.size(), HEAD_SIZE);
    }

    #[test]
    fn test_writer_config_default() {
        let config = WriterConfig::default();
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(WriterConfig::default().channel_capacity(0).channel_capacity, 1);
    }

    #[test]
    fn test_remaining_slices_after_partial_write() {
        let a = OutboundFrame::new(PayloadFrame::next(1, b"abc", b"").unwrap().frame()).unwrap();
        let b = OutboundFrame::new(CancelFrame::new(3).unwrap().frame()).unwrap();
        let batch = [a, b];

        // Skip into the middle of the first body
        let slices = build_remaining_slices(&batch, HEAD_SIZE + 1);
        let rest: Vec<u8> = slices.iter().flat_map(|s| s.iter().copied()).collect();

        let mut expected = b"bc".to_vec();
        expected.extend_from_slice(&batch[1].head);
        assert_eq!(rest, expected);

        assert!(build_remaining_slices(&batch, batch[0].size() + batch[1].size()).is_empty());
    }

    #[tokio::test]
    async fn test_writer_task_writes_records() {
        let (client, mut server) = duplex(64 * 1024);
        let (handle, task) = spawn_writer_task_default(client);

        let frame = RequestResponseFrame::new(5, b"hello", b"meta", 0).unwrap();
        handle.send(frame.frame()).await.unwrap();
        drop(handle);
        task.await.unwrap().unwrap();

        let mut bytes = Vec::new();
        server.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(&bytes[..], &frame.to_record().unwrap()[..]);
    }

    #[tokio::test]
    async fn test_writer_records_do_not_interleave() {
        let (client, mut server) = duplex(1024 * 1024);
        let (handle, task) = spawn_writer_task(client, WriterConfig::default().channel_capacity(4));

        let mut producers = Vec::new();
        for producer in 0..4u32 {
            let handle = handle.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..25u32 {
                    let stream_id = producer * 1000 + i + 1;
                    let body = vec![producer as u8; 100 + i as usize];
                    let frame = PayloadFrame::next(stream_id, &body, b"").unwrap();
                    handle.send(frame.frame()).await.unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        drop(handle);
        task.await.unwrap().unwrap();

        let mut bytes = Vec::new();
        server.read_to_end(&mut bytes).await.unwrap();

        let mut buffer = FrameBuffer::new();
        let records = buffer.push(&bytes).unwrap();
        assert_eq!(records.len(), 100);
        assert!(buffer.is_empty());

        for record in records {
            let frame = Frame::from_record(&record).unwrap();
            let producer = (frame.stream_id() - 1) / 1000;
            assert!(frame.body().iter().all(|&b| u32::from(b) == producer));
        }
    }

    #[tokio::test]
    async fn test_send_after_task_stops() {
        let (client, server) = duplex(64);
        drop(server);
        let (handle, task) = spawn_writer_task_default(client);

        let frame = CancelFrame::new(1).unwrap();
        // First write fails on the closed pipe and ends the task
        handle.send(frame.frame()).await.unwrap();
        assert!(task.await.unwrap().is_err());

        assert!(handle.is_closed());
        assert!(matches!(
            handle.send(frame.frame()).await,
            Err(FrameError::ConnectionClosed)
        ));
        assert!(matches!(
            handle.try_send(frame.frame()),
            Err(FrameError::ConnectionClosed)
        ));
    }
}
