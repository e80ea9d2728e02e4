//! 24-bit big-endian unsigned integers.
//!
//! Used for the outer record length prefix and for the metadata length
//! embedded in frame bodies.

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Encoded size of a u24 in bytes.
pub const U24_SIZE: usize = 3;

/// Largest value representable in 24 bits.
pub const MAX_U24: usize = 0x00FF_FFFF;

/// Encode `n` as 3 big-endian bytes, truncating to 24 bits.
#[inline]
pub fn encode_u24(n: usize) -> [u8; U24_SIZE] {
    let n = (n & MAX_U24) as u32;
    let [_, b0, b1, b2] = n.to_be_bytes();
    [b0, b1, b2]
}

/// Decode 3 big-endian bytes starting at `offset`.
///
/// # Panics
///
/// Panics if `buf` has fewer than 3 bytes from `offset`.
#[inline]
pub fn decode_u24(buf: &[u8], offset: usize) -> usize {
    (buf[offset] as usize) << 16 | (buf[offset + 1] as usize) << 8 | buf[offset + 2] as usize
}

/// Append `n` as a u24, rejecting values that do not fit.
pub fn put_u24(buf: &mut BytesMut, n: usize, field: &'static str) -> Result<()> {
    if n > MAX_U24 {
        return Err(FrameError::FieldTooLarge { field, len: n });
    }
    buf.put_slice(&encode_u24(n));
    Ok(())
}
