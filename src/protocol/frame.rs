//! Base frame: header plus owned body, with the shared body layout.
//!
//! Every frame body that carries a payload follows the same layout, starting
//! at a type-specific offset `o` (0 for most types, larger when the type puts
//! fixed-width fields first):
//!
//! ```text
//! body[o..]:  [u24 metadata length][metadata]  [data ...........]
//!             └── only when the METADATA flag is set ──┘
//! ```
//!
//! Data has no length of its own; it runs to the end of the body.
//!
//! # Example
//!
//! ```
//! use rsocket_framing::protocol::{flags, FrameBuilder, FrameType};
//!
//! let frame = FrameBuilder::new(FrameType::RequestResponse, 0)
//!     .payload(b"hello", b"meta")
//!     .unwrap()
//!     .build(5)
//!     .unwrap();
//!
//! assert!(frame.header().has_flag(flags::METADATA));
//! assert_eq!(frame.metadata_at(0).as_deref(), Some(&b"meta"[..]));
//! assert_eq!(&frame.data_at(0)[..], b"hello");
//! ```

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::pool::{self, BufferPool, PooledBuffer};
use super::u24::{decode_u24, put_u24, MAX_U24, U24_SIZE};
use super::wire_format::{flags, FrameHeader, FrameType, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// A complete protocol frame.
///
/// The body is borrowed from a [`BufferPool`] and released when the frame
/// drops. Accessors hand out copies, never views into the pooled buffer.
pub struct Frame {
    header: FrameHeader,
    body: PooledBuffer,
}

impl Frame {
    /// Create a frame from a header and an already filled body.
    pub fn new(header: FrameHeader, body: PooledBuffer) -> Self {
        Self { header, body }
    }

    /// Create a frame from a header and raw body bytes (copies data).
    pub fn from_parts(header: FrameHeader, body: &[u8]) -> Self {
        let mut buf = pool::global().borrow();
        buf.extend_from_slice(body);
        Self { header, body: buf }
    }

    /// Parse a record (header + body, length prefix already stripped).
    ///
    /// The body is copied, so the record buffer may be reused afterwards.
    pub fn from_record(record: &[u8]) -> Result<Self> {
        let header = FrameHeader::decode(record)?;
        Ok(Self::from_parts(header, &record[HEADER_SIZE..]))
    }

    /// Get the header.
    #[inline]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Get the stream ID.
    #[inline]
    pub fn stream_id(&self) -> u32 {
        self.header.stream_id
    }

    /// Get the frame type.
    #[inline]
    pub fn frame_type(&self) -> FrameType {
        self.header.frame_type
    }

    /// Get the flags.
    #[inline]
    pub fn flags(&self) -> u16 {
        self.header.flags
    }

    /// Get a reference to the raw body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Size of header plus body, i.e. the value of the outer length prefix.
    #[inline]
    pub fn record_len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Append the wire record `[u24 length][header][body]` to `dst`.
    pub fn encode_record(&self, dst: &mut BytesMut) -> Result<()> {
        let len = self.record_len();
        dst.reserve(U24_SIZE + len);
        put_u24(dst, len, "frame")?;
        dst.put_slice(&self.header.encode());
        dst.put_slice(&self.body);
        Ok(())
    }

    /// Encode the wire record into a fresh buffer.
    pub fn to_record(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(U24_SIZE + self.record_len());
        self.encode_record(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Read a big-endian u32 field at `offset` in the body.
    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes = self.body.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Check that the payload region starting at `offset` is well formed.
    ///
    /// Frames built locally always pass; frames parsed from the wire may
    /// declare a metadata length that runs past the body.
    pub fn check_layout(&self, offset: usize) -> Result<()> {
        let body_len = self.body.len();
        if body_len < offset {
            return Err(FrameError::InvalidFrame(format!(
                "{} body of {} bytes shorter than its {} fixed bytes",
                self.header.frame_type, body_len, offset
            )));
        }
        if !self.header.has_metadata() {
            return Ok(());
        }
        let rest = body_len - offset;
        if rest < U24_SIZE {
            return Err(FrameError::InvalidFrame(format!(
                "{} has METADATA flag but no metadata length",
                self.header.frame_type
            )));
        }
        let metadata_len = decode_u24(&self.body, offset);
        if metadata_len > rest - U24_SIZE {
            return Err(FrameError::InvalidFrame(format!(
                "metadata length {} exceeds remaining body of {} bytes",
                metadata_len,
                rest - U24_SIZE
            )));
        }
        Ok(())
    }

    /// Metadata section starting at `offset`, or `None` without the METADATA flag.
    pub fn metadata_at(&self, offset: usize) -> Option<Bytes> {
        self.split_payload(offset).0.map(Bytes::copy_from_slice)
    }

    /// Data section starting at `offset` (after metadata, if any).
    pub fn data_at(&self, offset: usize) -> Bytes {
        Bytes::copy_from_slice(self.split_payload(offset).1)
    }

    /// Metadata and data in a single pass.
    pub fn metadata_and_data_at(&self, offset: usize) -> (Option<Bytes>, Bytes) {
        let (metadata, data) = self.split_payload(offset);
        (
            metadata.map(Bytes::copy_from_slice),
            Bytes::copy_from_slice(data),
        )
    }

    /// Locate metadata and data. Inconsistent lengths are clamped to the
    /// body; `check_layout` is what reports them.
    fn split_payload(&self, offset: usize) -> (Option<&[u8]>, &[u8]) {
        let rest = self.body.get(offset..).unwrap_or(&[]);
        if !self.header.has_metadata() {
            return (None, rest);
        }
        if rest.len() < U24_SIZE {
            let empty: &[u8] = &[];
            return (Some(empty), empty);
        }
        let sections = &rest[U24_SIZE..];
        let metadata_len = decode_u24(rest, 0).min(sections.len());
        let (metadata, data) = sections.split_at(metadata_len);
        (Some(metadata), data)
    }

    /// Borrow a copy of this frame backed by a new pooled buffer.
    pub fn duplicate(&self) -> Self {
        Self {
            header: self.header,
            body: self.body.duplicate(),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("header", &self.header)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame{{{},body={} bytes}}", self.header, self.body.len())
    }
}

/// Render `name{header,data=..,metadata=..}` with lossy UTF-8 sections.
pub(crate) fn fmt_payload(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    frame: &Frame,
    offset: usize,
) -> fmt::Result {
    let (metadata, data) = frame.split_payload(offset);
    write!(
        f,
        "{}{{{},data={},metadata={}}}",
        name,
        frame.header,
        String::from_utf8_lossy(data),
        String::from_utf8_lossy(metadata.unwrap_or(&[]))
    )
}

/// Builds a frame body in a pooled buffer.
///
/// Fixed-width fields go first, then at most one [`payload`](Self::payload)
/// call lays out metadata and data. If any step fails the builder drops and
/// its buffer goes back to the pool.
pub struct FrameBuilder {
    frame_type: FrameType,
    flags: u16,
    body: PooledBuffer,
}

impl FrameBuilder {
    /// Start a frame using the process-wide pool.
    pub fn new(frame_type: FrameType, flags: u16) -> Self {
        Self::with_pool(pool::global(), frame_type, flags)
    }

    /// Start a frame using a specific pool.
    ///
    /// METADATA is dropped from `flags`; only the payload methods set it.
    pub fn with_pool(pool: &BufferPool, frame_type: FrameType, flags: u16) -> Self {
        Self {
            frame_type,
            flags: flags & !flags::METADATA,
            body: pool.borrow(),
        }
    }

    /// Append a big-endian u32 field.
    pub fn put_u32(mut self, value: u32) -> Self {
        self.body.put_u32(value);
        self
    }

    /// Append raw bytes.
    pub fn put_slice(mut self, bytes: &[u8]) -> Self {
        self.body.put_slice(bytes);
        self
    }

    /// Set additional flags. METADATA is ignored here.
    pub fn flag(mut self, flag: u16) -> Self {
        self.flags |= flag & !flags::METADATA;
        self
    }

    /// Append the metadata/data payload.
    ///
    /// Non-empty metadata sets the METADATA flag and is written with its
    /// u24 length; empty metadata is omitted entirely. Data follows verbatim.
    pub fn payload(mut self, data: &[u8], metadata: &[u8]) -> Result<Self> {
        if !metadata.is_empty() {
            put_u24(&mut self.body, metadata.len(), "metadata")?;
            self.body.put_slice(metadata);
            self.flags |= flags::METADATA;
        }
        self.body.put_slice(data);
        Ok(self)
    }

    /// Append a metadata section even when it is empty.
    ///
    /// Produces the "present but empty" layout that [`payload`](Self::payload)
    /// never emits.
    pub fn metadata_section(mut self, metadata: &[u8]) -> Result<Self> {
        put_u24(&mut self.body, metadata.len(), "metadata")?;
        self.body.put_slice(metadata);
        self.flags |= flags::METADATA;
        Ok(self)
    }

    /// Finish the frame for `stream_id`.
    pub fn build(self, stream_id: u32) -> Result<Frame> {
        let record_len = HEADER_SIZE + self.body.len();
        if record_len > MAX_U24 {
            return Err(FrameError::FieldTooLarge {
                field: "frame",
                len: record_len,
            });
        }
        let header = FrameHeader::new(stream_id, self.frame_type, self.flags)?;
        Ok(Frame::new(header, self.body))
    }
}
