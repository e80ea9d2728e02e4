//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary frame codec:
//! - 6-byte header encoding/decoding
//! - 24-bit big-endian length fields
//! - Frame buffer for splitting a byte stream into records
//! - Pooled frame bodies with the shared metadata/data layout
//! - Typed frames with per-type validation

mod frame;
mod frame_buffer;
pub mod frames;
pub mod pool;
pub mod u24;
mod wire_format;

pub use frame::{Frame, FrameBuilder};
pub use frame_buffer::{FrameBuffer, TrailingBytes};
pub use u24::{decode_u24, encode_u24, MAX_U24};
pub use wire_format::{
    flags, FrameHeader, FrameType, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE,
    MAX_STREAM_ID,
};
