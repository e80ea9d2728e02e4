//! Response frames: PAYLOAD and ERROR.

use std::fmt;

use super::{FrameKind, WithPayload};
use crate::error::{FrameError, Result};
use crate::protocol::frame::{fmt_payload, Frame, FrameBuilder};
use crate::protocol::wire_format::{flags, FrameType};

/// Payload on a stream, carrying NEXT and/or COMPLETE.
#[derive(Debug)]
pub struct PayloadFrame(Frame);

impl PayloadFrame {
    /// Build a PAYLOAD frame. `flags` must include NEXT or COMPLETE.
    pub fn new(stream_id: u32, data: &[u8], metadata: &[u8], flags: u16) -> Result<Self> {
        let frame = FrameBuilder::new(FrameType::Payload, flags)
            .payload(data, metadata)?
            .build(stream_id)
            .map(Self)?;
        frame.validate()?;
        Ok(frame)
    }

    /// A NEXT payload.
    pub fn next(stream_id: u32, data: &[u8], metadata: &[u8]) -> Result<Self> {
        Self::new(stream_id, data, metadata, flags::NEXT)
    }

    /// A final NEXT payload that also completes the stream.
    pub fn next_complete(stream_id: u32, data: &[u8], metadata: &[u8]) -> Result<Self> {
        Self::new(stream_id, data, metadata, flags::NEXT | flags::COMPLETE)
    }

    /// An empty COMPLETE signal.
    pub fn complete(stream_id: u32) -> Result<Self> {
        Self::new(stream_id, &[], &[], flags::COMPLETE)
    }

    #[inline]
    pub fn is_next(&self) -> bool {
        self.header().has_flag(flags::NEXT)
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.header().has_flag(flags::COMPLETE)
    }

    #[inline]
    pub fn follows(&self) -> bool {
        self.header().has_flag(flags::FOLLOWS)
    }
}

impl FrameKind for PayloadFrame {
    const FRAME_TYPE: FrameType = FrameType::Payload;

    fn from_frame_unchecked(frame: Frame) -> Self {
        Self(frame)
    }

    fn frame(&self) -> &Frame {
        &self.0
    }

    fn into_frame(self) -> Frame {
        self.0
    }

    fn validate(&self) -> Result<()> {
        if !self.is_next() && !self.is_complete() {
            return Err(FrameError::InvalidFrame(
                "PAYLOAD must set NEXT or COMPLETE".to_string(),
            ));
        }
        Ok(())
    }

    fn check_structure(frame: &Frame) -> Result<()> {
        frame.check_layout(Self::PAYLOAD_OFFSET)
    }
}

impl WithPayload for PayloadFrame {}

impl fmt::Display for PayloadFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_payload(f, "PayloadFrame", &self.0, Self::PAYLOAD_OFFSET)
    }
}

/// Error codes carried by ERROR frames.
pub mod error_codes {
    pub const INVALID_SETUP: u32 = 0x0000_0001;
    pub const UNSUPPORTED_SETUP: u32 = 0x0000_0002;
    pub const REJECTED_SETUP: u32 = 0x0000_0003;
    pub const REJECTED_RESUME: u32 = 0x0000_0004;
    pub const CONNECTION_ERROR: u32 = 0x0000_0101;
    pub const CONNECTION_CLOSE: u32 = 0x0000_0102;
    pub const APPLICATION_ERROR: u32 = 0x0000_0201;
    pub const REJECTED: u32 = 0x0000_0202;
    pub const CANCELED: u32 = 0x0000_0203;
    pub const INVALID: u32 = 0x0000_0204;
}

/// Error on a stream (or the connection, for stream 0).
///
/// Body: `[u32 error code][UTF-8 message]`. Never carries metadata.
#[derive(Debug)]
pub struct ErrorFrame(Frame);

impl ErrorFrame {
    /// Build an ERROR frame.
    pub fn new(stream_id: u32, code: u32, message: &[u8]) -> Result<Self> {
        FrameBuilder::new(FrameType::Error, 0)
            .put_u32(code)
            .payload(message, &[])?
            .build(stream_id)
            .map(Self)
    }

    /// The error code (see [`error_codes`]).
    pub fn error_code(&self) -> u32 {
        self.0.u32_at(0).unwrap_or(0)
    }

    /// The error message.
    pub fn message(&self) -> String {
        self.data_utf8()
    }
}

impl FrameKind for ErrorFrame {
    const FRAME_TYPE: FrameType = FrameType::Error;

    fn from_frame_unchecked(frame: Frame) -> Self {
        Self(frame)
    }

    fn frame(&self) -> &Frame {
        &self.0
    }

    fn into_frame(self) -> Frame {
        self.0
    }

    fn validate(&self) -> Result<()> {
        if self.header().has_metadata() {
            return Err(FrameError::InvalidFrame(
                "ERROR must not carry metadata".to_string(),
            ));
        }
        Ok(())
    }

    fn check_structure(frame: &Frame) -> Result<()> {
        frame.check_layout(Self::PAYLOAD_OFFSET)
    }
}

impl WithPayload for ErrorFrame {
    const PAYLOAD_OFFSET: usize = 4;
}

impl fmt::Display for ErrorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ErrorFrame{{{},code=0x{:08X},message={}}}",
            self.header(),
            self.error_code(),
            self.message()
        )
    }
}
