//! Control frames without a payload: REQUEST_N and CANCEL.

use std::fmt;

use super::FrameKind;
use crate::error::{FrameError, Result};
use crate::protocol::frame::{Frame, FrameBuilder};
use crate::protocol::wire_format::{FrameType, MAX_STREAM_ID};

/// Additional demand on a stream. Body: `[u32 N]`.
#[derive(Debug)]
pub struct RequestNFrame(Frame);

impl RequestNFrame {
    /// Build a REQUEST_N frame.
    pub fn new(stream_id: u32, n: u32) -> Result<Self> {
        let frame = FrameBuilder::new(FrameType::RequestN, 0)
            .put_u32(n)
            .build(stream_id)
            .map(Self)?;
        frame.validate()?;
        Ok(frame)
    }

    /// Number of additional items requested.
    pub fn request_n(&self) -> u32 {
        self.0.u32_at(0).unwrap_or(0)
    }
}

impl FrameKind for RequestNFrame {
    const FRAME_TYPE: FrameType = FrameType::RequestN;

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
        let body_len = self.0.body().len();
        if body_len != 4 {
            return Err(FrameError::InvalidFrame(format!(
                "REQUEST_N body must be 4 bytes, got {}",
                body_len
            )));
        }
        let n = self.request_n();
        if n == 0 || n > MAX_STREAM_ID {
            return Err(FrameError::InvalidFrame(format!(
                "REQUEST_N must be in 1..=2^31-1, got {}",
                n
            )));
        }
        Ok(())
    }
}

impl fmt::Display for RequestNFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestNFrame{{{},n={}}}", self.header(), self.request_n())
    }
}

/// Cancels an outstanding request. Empty body.
#[derive(Debug)]
pub struct CancelFrame(Frame);

impl CancelFrame {
    /// Build a CANCEL frame.
    pub fn new(stream_id: u32) -> Result<Self> {
        FrameBuilder::new(FrameType::Cancel, 0)
            .build(stream_id)
            .map(Self)
    }
}

impl FrameKind for CancelFrame {
    const FRAME_TYPE: FrameType = FrameType::Cancel;

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
        if !self.0.body().is_empty() {
            return Err(FrameError::InvalidFrame(format!(
                "CANCEL body must be empty, got {} bytes",
                self.0.body().len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CancelFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CancelFrame{{{}}}", self.header())
    }
}
