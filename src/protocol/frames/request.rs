//! Request frames: REQUEST_RESPONSE, REQUEST_FNF, REQUEST_STREAM, REQUEST_CHANNEL.

use std::fmt;

use super::{FrameKind, WithPayload};
use crate::error::{FrameError, Result};
use crate::protocol::frame::{fmt_payload, Frame, FrameBuilder};
use crate::protocol::wire_format::{FrameType, MAX_STREAM_ID};

/// Size of the initial request-N field in front of stream/channel payloads.
const REQUEST_N_SIZE: usize = 4;

/// Request for a single response.
#[derive(Debug)]
pub struct RequestResponseFrame(Frame);

impl RequestResponseFrame {
    /// Build a REQUEST_RESPONSE frame.
    ///
    /// Non-empty `metadata` sets the METADATA flag; `flags` adds any others
    /// (e.g. FOLLOWS). METADATA passed in `flags` is ignored.
    pub fn new(stream_id: u32, data: &[u8], metadata: &[u8], flags: u16) -> Result<Self> {
        FrameBuilder::new(FrameType::RequestResponse, flags)
            .payload(data, metadata)?
            .build(stream_id)
            .map(Self)
    }
}

impl FrameKind for RequestResponseFrame {
    const FRAME_TYPE: FrameType = FrameType::RequestResponse;

    fn from_frame_unchecked(frame: Frame) -> Self {
        Self(frame)
    }

    fn frame(&self) -> &Frame {
        &self.0
    }

    fn into_frame(self) -> Frame {
        self.0
    }

    /// Always valid: request-response carries no invariants beyond the
    /// shared payload layout.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn check_structure(frame: &Frame) -> Result<()> {
        frame.check_layout(Self::PAYLOAD_OFFSET)
    }
}

impl WithPayload for RequestResponseFrame {}

impl fmt::Display for RequestResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_payload(f, "RequestResponseFrame", &self.0, Self::PAYLOAD_OFFSET)
    }
}

/// Fire-and-forget request.
#[derive(Debug)]
pub struct RequestFnfFrame(Frame);

impl RequestFnfFrame {
    /// Build a REQUEST_FNF frame.
    pub fn new(stream_id: u32, data: &[u8], metadata: &[u8], flags: u16) -> Result<Self> {
        FrameBuilder::new(FrameType::RequestFnf, flags)
            .payload(data, metadata)?
            .build(stream_id)
            .map(Self)
    }
}

impl FrameKind for RequestFnfFrame {
    const FRAME_TYPE: FrameType = FrameType::RequestFnf;

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
        Ok(())
    }

    fn check_structure(frame: &Frame) -> Result<()> {
        frame.check_layout(Self::PAYLOAD_OFFSET)
    }
}

impl WithPayload for RequestFnfFrame {}

impl fmt::Display for RequestFnfFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_payload(f, "RequestFnfFrame", &self.0, Self::PAYLOAD_OFFSET)
    }
}

fn check_request_n(frame_type: FrameType, n: Option<u32>) -> Result<()> {
    match n {
        Some(n) if n > 0 && n <= MAX_STREAM_ID => Ok(()),
        Some(n) => Err(FrameError::InvalidFrame(format!(
            "{} initial request N must be in 1..=2^31-1, got {}",
            frame_type, n
        ))),
        None => Err(FrameError::InvalidFrame(format!(
            "{} missing initial request N",
            frame_type
        ))),
    }
}

/// Request for a finite or infinite stream of responses.
///
/// Body: `[u32 initial request N][metadata/data payload]`.
#[derive(Debug)]
pub struct RequestStreamFrame(Frame);

impl RequestStreamFrame {
    /// Build a REQUEST_STREAM frame.
    pub fn new(
        stream_id: u32,
        initial_request_n: u32,
        data: &[u8],
        metadata: &[u8],
        flags: u16,
    ) -> Result<Self> {
        let frame = FrameBuilder::new(FrameType::RequestStream, flags)
            .put_u32(initial_request_n)
            .payload(data, metadata)?
            .build(stream_id)
            .map(Self)?;
        frame.validate()?;
        Ok(frame)
    }

    /// Number of items initially requested.
    pub fn initial_request_n(&self) -> u32 {
        self.0.u32_at(0).unwrap_or(0)
    }
}

impl FrameKind for RequestStreamFrame {
    const FRAME_TYPE: FrameType = FrameType::RequestStream;

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
        check_request_n(Self::FRAME_TYPE, self.0.u32_at(0))
    }

    fn check_structure(frame: &Frame) -> Result<()> {
        frame.check_layout(Self::PAYLOAD_OFFSET)
    }
}

impl WithPayload for RequestStreamFrame {
    const PAYLOAD_OFFSET: usize = REQUEST_N_SIZE;
}

impl fmt::Display for RequestStreamFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("RequestStreamFrame[n={}]", self.initial_request_n());
        fmt_payload(f, &name, &self.0, Self::PAYLOAD_OFFSET)
    }
}

/// Bidirectional stream request.
///
/// Same body as REQUEST_STREAM; may also carry the COMPLETE flag.
#[derive(Debug)]
pub struct RequestChannelFrame(Frame);

impl RequestChannelFrame {
    /// Build a REQUEST_CHANNEL frame.
    pub fn new(
        stream_id: u32,
        initial_request_n: u32,
        data: &[u8],
        metadata: &[u8],
        flags: u16,
    ) -> Result<Self> {
        let frame = FrameBuilder::new(FrameType::RequestChannel, flags)
            .put_u32(initial_request_n)
            .payload(data, metadata)?
            .build(stream_id)
            .map(Self)?;
        frame.validate()?;
        Ok(frame)
    }

    /// Number of items initially requested.
    pub fn initial_request_n(&self) -> u32 {
        self.0.u32_at(0).unwrap_or(0)
    }
}

impl FrameKind for RequestChannelFrame {
    const FRAME_TYPE: FrameType = FrameType::RequestChannel;

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
        check_request_n(Self::FRAME_TYPE, self.0.u32_at(0))
    }

    fn check_structure(frame: &Frame) -> Result<()> {
        frame.check_layout(Self::PAYLOAD_OFFSET)
    }
}

impl WithPayload for RequestChannelFrame {
    const PAYLOAD_OFFSET: usize = REQUEST_N_SIZE;
}

impl fmt::Display for RequestChannelFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("RequestChannelFrame[n={}]", self.initial_request_n());
        fmt_payload(f, &name, &self.0, Self::PAYLOAD_OFFSET)
    }
}
