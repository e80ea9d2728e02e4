//! Concrete frame types.
//!
//! Each type wraps a [`Frame`] and differs only in how its body is built and
//! what [`FrameKind::validate`] checks. Types that carry a payload use the
//! shared metadata/data layout at [`WithPayload::PAYLOAD_OFFSET`]: 0 when
//! the payload is the whole body, otherwise the size of the fixed-width
//! fields in front of it.
//!
//! [`TypedFrame`] is the closed set of supported types, chosen by the header's
//! type tag. Any other tag parses as [`TypedFrame::Opaque`].
//!
//! # Example
//!
//! ```
//! use rsocket_framing::protocol::frames::{
//!     FrameKind, RequestResponseFrame, TypedFrame, WithPayload,
//! };
//!
//! let frame = RequestResponseFrame::new(5, b"hello", b"meta", 0).unwrap();
//! let record = frame.to_record().unwrap();
//!
//! // Strip the 3-byte length prefix and parse it back
//! match TypedFrame::parse(&record[3..]).unwrap() {
//!     TypedFrame::RequestResponse(rr) => {
//!         assert_eq!(rr.data_utf8(), "hello");
//!         assert_eq!(rr.metadata_utf8().as_deref(), Some("meta"));
//!     }
//!     other => panic!("unexpected {}", other),
//! }
//! ```

use std::fmt;

use bytes::Bytes;

use super::frame::Frame;
use super::wire_format::{FrameHeader, FrameType};
use crate::error::{FrameError, Result};

mod control;
mod payload;
mod request;

pub use control::{CancelFrame, RequestNFrame};
pub use payload::{error_codes, ErrorFrame, PayloadFrame};
pub use request::{
    RequestChannelFrame, RequestFnfFrame, RequestResponseFrame, RequestStreamFrame,
};

/// Capabilities shared by every concrete frame type.
pub trait FrameKind: Sized {
    /// Type tag this wrapper accepts.
    const FRAME_TYPE: FrameType;

    /// Wrap a frame without checking its type or body.
    fn from_frame_unchecked(frame: Frame) -> Self;

    /// The underlying base frame.
    fn frame(&self) -> &Frame;

    /// Unwrap into the base frame.
    fn into_frame(self) -> Frame;

    /// Type-specific structural check, run before the frame is trusted.
    fn validate(&self) -> Result<()>;

    /// Shared-layer check of the body layout. Payload types check the
    /// metadata length against the body.
    fn check_structure(_frame: &Frame) -> Result<()> {
        Ok(())
    }

    /// Wrap an inbound frame, checking tag, layout and type-specific rules.
    fn try_from_frame(frame: Frame) -> Result<Self> {
        if frame.frame_type() != Self::FRAME_TYPE {
            return Err(FrameError::InvalidFrame(format!(
                "expected {} frame, got {}",
                Self::FRAME_TYPE,
                frame.frame_type()
            )));
        }
        Self::check_structure(&frame)?;
        let typed = Self::from_frame_unchecked(frame);
        typed.validate()?;
        Ok(typed)
    }

    /// Get the header.
    #[inline]
    fn header(&self) -> &FrameHeader {
        self.frame().header()
    }

    /// Get the stream ID.
    #[inline]
    fn stream_id(&self) -> u32 {
        self.frame().stream_id()
    }

    /// Encode the wire record `[u24 length][header][body]`.
    fn to_record(&self) -> Result<Bytes> {
        self.frame().to_record()
    }
}

/// Frame types that carry an optional metadata section and a data section.
pub trait WithPayload: FrameKind {
    /// Where the metadata/data region starts within the body.
    const PAYLOAD_OFFSET: usize = 0;

    /// Metadata bytes, or `None` when the frame has no metadata section.
    fn metadata(&self) -> Option<Bytes> {
        self.frame().metadata_at(Self::PAYLOAD_OFFSET)
    }

    /// Data bytes.
    fn data(&self) -> Bytes {
        self.frame().data_at(Self::PAYLOAD_OFFSET)
    }

    /// Metadata and data in a single pass.
    fn metadata_and_data(&self) -> (Option<Bytes>, Bytes) {
        self.frame().metadata_and_data_at(Self::PAYLOAD_OFFSET)
    }

    /// Metadata as (lossy) UTF-8.
    fn metadata_utf8(&self) -> Option<String> {
        self.metadata().map(|m| String::from_utf8_lossy(&m).into_owned())
    }

    /// Data as (lossy) UTF-8.
    fn data_utf8(&self) -> String {
        String::from_utf8_lossy(&self.data()).into_owned()
    }
}

/// A parsed frame, dispatched on its type tag.
#[derive(Debug)]
pub enum TypedFrame {
    RequestResponse(RequestResponseFrame),
    RequestFnf(RequestFnfFrame),
    RequestStream(RequestStreamFrame),
    RequestChannel(RequestChannelFrame),
    RequestN(RequestNFrame),
    Cancel(CancelFrame),
    Payload(PayloadFrame),
    Error(ErrorFrame),
    /// Any type this crate has no dedicated wrapper for.
    Opaque(Frame),
}

impl TypedFrame {
    /// Parse a record (length prefix stripped) into a typed frame.
    pub fn parse(record: &[u8]) -> Result<Self> {
        Self::from_frame(Frame::from_record(record)?)
    }

    /// Dispatch a base frame on its type tag and validate it.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        let typed = match frame.frame_type() {
            FrameType::RequestResponse => {
                Self::RequestResponse(RequestResponseFrame::try_from_frame(frame)?)
            }
            FrameType::RequestFnf => Self::RequestFnf(RequestFnfFrame::try_from_frame(frame)?),
            FrameType::RequestStream => {
                Self::RequestStream(RequestStreamFrame::try_from_frame(frame)?)
            }
            FrameType::RequestChannel => {
                Self::RequestChannel(RequestChannelFrame::try_from_frame(frame)?)
            }
            FrameType::RequestN => Self::RequestN(RequestNFrame::try_from_frame(frame)?),
            FrameType::Cancel => Self::Cancel(CancelFrame::try_from_frame(frame)?),
            FrameType::Payload => Self::Payload(PayloadFrame::try_from_frame(frame)?),
            FrameType::Error => Self::Error(ErrorFrame::try_from_frame(frame)?),
            _ => Self::Opaque(frame),
        };
        Ok(typed)
    }

    /// The underlying base frame.
    pub fn frame(&self) -> &Frame {
        match self {
            Self::RequestResponse(f) => f.frame(),
            Self::RequestFnf(f) => f.frame(),
            Self::RequestStream(f) => f.frame(),
            Self::RequestChannel(f) => f.frame(),
            Self::RequestN(f) => f.frame(),
            Self::Cancel(f) => f.frame(),
            Self::Payload(f) => f.frame(),
            Self::Error(f) => f.frame(),
            Self::Opaque(f) => f,
        }
    }

    /// Unwrap into the base frame.
    pub fn into_frame(self) -> Frame {
        match self {
            Self::RequestResponse(f) => f.into_frame(),
            Self::RequestFnf(f) => f.into_frame(),
            Self::RequestStream(f) => f.into_frame(),
            Self::RequestChannel(f) => f.into_frame(),
            Self::RequestN(f) => f.into_frame(),
            Self::Cancel(f) => f.into_frame(),
            Self::Payload(f) => f.into_frame(),
            Self::Error(f) => f.into_frame(),
            Self::Opaque(f) => f,
        }
    }

    /// Get the header.
    pub fn header(&self) -> &FrameHeader {
        self.frame().header()
    }

    /// Run the type-specific check. Opaque frames are always valid.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::RequestResponse(f) => f.validate(),
            Self::RequestFnf(f) => f.validate(),
            Self::RequestStream(f) => f.validate(),
            Self::RequestChannel(f) => f.validate(),
            Self::RequestN(f) => f.validate(),
            Self::Cancel(f) => f.validate(),
            Self::Payload(f) => f.validate(),
            Self::Error(f) => f.validate(),
            Self::Opaque(_) => Ok(()),
        }
    }

    /// Metadata for payload-carrying types, `None` otherwise.
    pub fn metadata(&self) -> Option<Bytes> {
        match self {
            Self::RequestResponse(f) => f.metadata(),
            Self::RequestFnf(f) => f.metadata(),
            Self::RequestStream(f) => f.metadata(),
            Self::RequestChannel(f) => f.metadata(),
            Self::Payload(f) => f.metadata(),
            Self::Error(f) => f.metadata(),
            Self::RequestN(_) | Self::Cancel(_) | Self::Opaque(_) => None,
        }
    }

    /// Data for payload-carrying types, empty otherwise.
    pub fn data(&self) -> Bytes {
        match self {
            Self::RequestResponse(f) => f.data(),
            Self::RequestFnf(f) => f.data(),
            Self::RequestStream(f) => f.data(),
            Self::RequestChannel(f) => f.data(),
            Self::Payload(f) => f.data(),
            Self::Error(f) => f.data(),
            Self::RequestN(_) | Self::Cancel(_) | Self::Opaque(_) => Bytes::new(),
        }
    }
}

impl fmt::Display for TypedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestResponse(frame) => fmt::Display::fmt(frame, f),
            Self::RequestFnf(frame) => fmt::Display::fmt(frame, f),
            Self::RequestStream(frame) => fmt::Display::fmt(frame, f),
            Self::RequestChannel(frame) => fmt::Display::fmt(frame, f),
            Self::RequestN(frame) => fmt::Display::fmt(frame, f),
            Self::Cancel(frame) => fmt::Display::fmt(frame, f),
            Self::Payload(frame) => fmt::Display::fmt(frame, f),
            Self::Error(frame) => fmt::Display::fmt(frame, f),
            Self::Opaque(frame) => fmt::Display::fmt(frame, f),
        }
    }
}
