//! Wire format encoding and decoding.
//!
//! Every frame travels as a length-prefixed record:
//! ```text
//! ┌──────────┬──────────────┬────────────────┬──────────────┐
//! │ Length   │ Stream ID    │ Type │ Flags   │ Body         │
//! │ 3 bytes  │ 4 bytes      │ 6 b  │ 10 b    │ variable     │
//! │ u24 BE   │ R + u31 BE   │ u16 BE         │              │
//! └──────────┴──────────────┴────────────────┴──────────────┘
//! ```
//!
//! The length counts header and body, never itself. The top bit of the
//! stream ID word is reserved and always written as zero.

use std::fmt;

use crate::error::{FrameError, Result};

/// Header size in bytes (fixed, exactly 6).
pub const HEADER_SIZE: usize = 6;

/// Largest valid stream ID (31 bits).
pub const MAX_STREAM_ID: u32 = 0x7FFF_FFFF;

/// Initial capacity of the decoder's accumulation buffer (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Maximum size of one record including its length prefix (16 MiB + 3).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024 + 3;

const TYPE_SHIFT: u16 = 10;
const TYPE_MASK: u16 = 0x3F;

/// Flag constants for the protocol.
///
/// Flags occupy the low 10 bits of the type/flags word. Only
/// [`METADATA`](flags::METADATA) is interpreted by the shared body layout;
/// the rest carry type-specific meaning.
pub mod flags {
    /// Frame can be ignored if not understood.
    pub const IGNORE: u16 = 0b10_0000_0000;
    /// Body starts with a metadata section.
    pub const METADATA: u16 = 0b01_0000_0000;
    /// More fragments follow this one.
    pub const FOLLOWS: u16 = 0b00_1000_0000;
    /// Stream completed.
    pub const COMPLETE: u16 = 0b00_0100_0000;
    /// Payload carries a next element.
    pub const NEXT: u16 = 0b00_0010_0000;

    /// KEEPALIVE: respond with a KEEPALIVE.
    pub const RESPOND: u16 = FOLLOWS;
    /// SETUP: client honours LEASE.
    pub const LEASE: u16 = 0b00_0100_0000;
    /// SETUP: client supports resumption.
    pub const RESUME_ENABLE: u16 = FOLLOWS;

    /// All bits that fit in the flags field.
    pub const MASK: u16 = 0b11_1111_1111;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u16, flag: u16) -> bool {
        flags & flag != 0
    }
}

/// Frame type tag (6 bits of the header).
///
/// Tags without a named variant decode as [`FrameType::Unknown`]; the
/// framing layer never rejects a frame because of its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Reserved,
    Setup,
    Lease,
    Keepalive,
    RequestResponse,
    RequestFnf,
    RequestStream,
    RequestChannel,
    RequestN,
    Cancel,
    Payload,
    Error,
    MetadataPush,
    Resume,
    ResumeOk,
    Extension,
    Unknown(u8),
}

impl FrameType {
    /// Raw 6-bit tag.
    pub fn tag(self) -> u8 {
        match self {
            Self::Reserved => 0x00,
            Self::Setup => 0x01,
            Self::Lease => 0x02,
            Self::Keepalive => 0x03,
            Self::RequestResponse => 0x04,
            Self::RequestFnf => 0x05,
            Self::RequestStream => 0x06,
            Self::RequestChannel => 0x07,
            Self::RequestN => 0x08,
            Self::Cancel => 0x09,
            Self::Payload => 0x0A,
            Self::Error => 0x0B,
            Self::MetadataPush => 0x0C,
            Self::Resume => 0x0D,
            Self::ResumeOk => 0x0E,
            Self::Extension => 0x3F,
            Self::Unknown(tag) => tag & TYPE_MASK as u8,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Reserved => "RESERVED",
            Self::Setup => "SETUP",
            Self::Lease => "LEASE",
            Self::Keepalive => "KEEPALIVE",
            Self::RequestResponse => "REQUEST_RESPONSE",
            Self::RequestFnf => "REQUEST_FNF",
            Self::RequestStream => "REQUEST_STREAM",
            Self::RequestChannel => "REQUEST_CHANNEL",
            Self::RequestN => "REQUEST_N",
            Self::Cancel => "CANCEL",
            Self::Payload => "PAYLOAD",
            Self::Error => "ERROR",
            Self::MetadataPush => "METADATA_PUSH",
            Self::Resume => "RESUME",
            Self::ResumeOk => "RESUME_OK",
            Self::Extension => "EXT",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<u8> for FrameType {
    fn from(tag: u8) -> Self {
        match tag & TYPE_MASK as u8 {
            0x00 => Self::Reserved,
            0x01 => Self::Setup,
            0x02 => Self::Lease,
            0x03 => Self::Keepalive,
            0x04 => Self::RequestResponse,
            0x05 => Self::RequestFnf,
            0x06 => Self::RequestStream,
            0x07 => Self::RequestChannel,
            0x08 => Self::RequestN,
            0x09 => Self::Cancel,
            0x0A => Self::Payload,
            0x0B => Self::Error,
            0x0C => Self::MetadataPush,
            0x0D => Self::Resume,
            0x0E => Self::ResumeOk,
            0x3F => Self::Extension,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(tag) => write!(f, "UNKNOWN(0x{:02X})", tag),
            other => f.write_str(other.name()),
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Stream identifier (31 bits, 0 = connection).
    pub stream_id: u32,
    /// Frame type tag.
    pub frame_type: FrameType,
    /// Flags (see `flags` module), 10 bits.
    pub flags: u16,
}

impl FrameHeader {
    /// Create a new header.
    ///
    /// Fails if `stream_id` does not fit in 31 bits. Flag bits above the
    /// 10-bit field are dropped.
    pub fn new(stream_id: u32, frame_type: FrameType, flags: u16) -> Result<Self> {
        if stream_id > MAX_STREAM_ID {
            return Err(FrameError::StreamIdOutOfRange(stream_id));
        }
        Ok(Self {
            stream_id,
            frame_type,
            flags: flags & flags::MASK,
        })
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use rsocket_framing::protocol::{flags, FrameHeader, FrameType};
    ///
    /// let header = FrameHeader::new(5, FrameType::RequestResponse, flags::METADATA).unwrap();
    /// assert_eq!(header.encode(), [0, 0, 0, 5, 0x11, 0x00]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (6 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        let word = (u16::from(self.frame_type.tag()) & TYPE_MASK) << TYPE_SHIFT
            | (self.flags & flags::MASK);
        buf[0..4].copy_from_slice(&(self.stream_id & MAX_STREAM_ID).to_be_bytes());
        buf[4..6].copy_from_slice(&word.to_be_bytes());
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// The reserved top bit of the stream ID is ignored.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(FrameError::MalformedHeader(buf.len()));
        }
        let stream_id = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) & MAX_STREAM_ID;
        let word = u16::from_be_bytes([buf[4], buf[5]]);
        Ok(Self {
            stream_id,
            frame_type: FrameType::from((word >> TYPE_SHIFT) as u8),
            flags: word & flags::MASK,
        })
    }

    /// Check if a flag is set.
    #[inline]
    pub fn has_flag(&self, flag: u16) -> bool {
        flags::has_flag(self.flags, flag)
    }

    /// Check if the body carries a metadata section.
    #[inline]
    pub fn has_metadata(&self) -> bool {
        self.has_flag(flags::METADATA)
    }
}

impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameHeader{{id={},type={},flags=0b{:010b}}}",
            self.stream_id, self.frame_type, self.flags
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original =
            FrameHeader::new(42, FrameType::Payload, flags::NEXT | flags::COMPLETE).unwrap();
        let encoded = original.encode();
        let decoded = FrameHeader::decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_bit_layout() {
        let header = FrameHeader::new(0x0102_0304, FrameType::Extension, flags::MASK).unwrap();
        let bytes = header.encode();

        // Stream ID in BE
        assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x03, 0x04]);
        // Type 0x3F in the top 6 bits, all 10 flag bits set
        assert_eq!(&bytes[4..6], &[0xFF, 0xFF]);

        let header = FrameHeader::new(1, FrameType::RequestResponse, flags::METADATA).unwrap();
        // 0x04 << 10 | 0x100 = 0x1100
        assert_eq!(&header.encode()[4..6], &[0x11, 0x00]);
    }

    #[test]
    fn test_header_size_is_exactly_6() {
        assert_eq!(HEADER_SIZE, 6);
        let header = FrameHeader::new(1, FrameType::Cancel, 0).unwrap();
        assert_eq!(header.encode().len(), 6);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; 5];
        let err = FrameHeader::decode(&buf).unwrap_err();
        assert!(matches!(err, FrameError::MalformedHeader(5)));
    }

    #[test]
    fn test_stream_id_out_of_range() {
        let err = FrameHeader::new(MAX_STREAM_ID + 1, FrameType::Payload, 0).unwrap_err();
        assert!(matches!(err, FrameError::StreamIdOutOfRange(id) if id == MAX_STREAM_ID + 1));
        assert!(FrameHeader::new(MAX_STREAM_ID, FrameType::Payload, 0).is_ok());
    }

    #[test]
    fn test_decode_ignores_reserved_bit() {
        let buf = [0x80, 0x00, 0x00, 0x07, 0x28, 0x00];
        let header = FrameHeader::decode(&buf).unwrap();
        assert_eq!(header.stream_id, 7);
        assert_eq!(header.frame_type, FrameType::Payload);
        assert_eq!(header.flags, 0);
    }

    #[test]
    fn test_new_drops_out_of_field_flag_bits() {
        let header = FrameHeader::new(1, FrameType::Payload, 0xFC00 | flags::NEXT).unwrap();
        assert_eq!(header.flags, flags::NEXT);
    }

    #[test]
    fn test_unknown_type_is_opaque() {
        let header = FrameHeader::new(3, FrameType::Unknown(0x20), flags::IGNORE).unwrap();
        let decoded = FrameHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded.frame_type, FrameType::Unknown(0x20));
        assert_eq!(decoded.frame_type.tag(), 0x20);
        assert!(decoded.has_flag(flags::IGNORE));
    }

    #[test]
    fn test_frame_type_tags_roundtrip() {
        for tag in 0u8..=0x3F {
            assert_eq!(FrameType::from(tag).tag(), tag);
        }
    }

    #[test]
    fn test_flags_has_flag() {
        let fl = flags::METADATA | flags::NEXT;
        assert!(flags::has_flag(fl, flags::METADATA));
        assert!(flags::has_flag(fl, flags::NEXT));
        assert!(!flags::has_flag(fl, flags::COMPLETE));
    }

    #[test]
    fn test_header_display() {
        let header = FrameHeader::new(5, FrameType::RequestResponse, flags::METADATA).unwrap();
        assert_eq!(
            header.to_string(),
            "FrameHeader{id=5,type=REQUEST_RESPONSE,flags=0b0100000000}"
        );
    }
}
