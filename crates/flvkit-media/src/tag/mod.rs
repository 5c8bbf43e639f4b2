//! FLV tag framing.
//!
//! A tag on disk is an 11-byte header, `data_size` payload bytes, and a
//! 4-byte big-endian back-pointer holding `data_size + 11`.
//!
//! ```text
//! byte 0      tag type (low 5 bits) | encrypted (bit 5)
//! bytes 1..3  data size, 24-bit big-endian
//! bytes 4..6  timestamp bits 0..23, big-endian
//! byte 7      timestamp bits 24..31
//! bytes 8..10 stream id, always zero
//! ```

mod payload;

pub use payload::{AudioMetadata, VideoMetadata};

use bytes::{BufMut, Bytes};

/// Size of a tag header.
pub const TAG_HEADER_LEN: usize = 11;

/// Size of the trailing back-pointer.
pub const BACK_POINTER_LEN: usize = 4;

/// Largest payload the 24-bit data size field can describe.
pub const MAX_DATA_SIZE: usize = 0x00FF_FFFF;

const TAG_TYPE_MASK: u8 = 0x1F;
const ENCRYPTED_BIT: u8 = 0x20;

/// Tag type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum TagType {
    Audio,
    Video,
    ScriptData,
    /// Structurally valid but unrecognized 5-bit code. Only codes below 32
    /// other than 8, 9 and 18 survive an encode/decode round trip; the
    /// writer rejects the rest.
    Other(u8),
}

impl TagType {
    pub const AUDIO: u8 = 8;
    pub const VIDEO: u8 = 9;
    pub const SCRIPT_DATA: u8 = 18;

    /// Create from the low 5 bits of a tag's first byte.
    pub fn from_u8(code: u8) -> Self {
        match code & TAG_TYPE_MASK {
            Self::AUDIO => Self::Audio,
            Self::VIDEO => Self::Video,
            Self::SCRIPT_DATA => Self::ScriptData,
            other => Self::Other(other),
        }
    }

    /// Numeric code.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Audio => Self::AUDIO,
            Self::Video => Self::VIDEO,
            Self::ScriptData => Self::SCRIPT_DATA,
            Self::Other(code) => *code & TAG_TYPE_MASK,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::ScriptData => "script",
            Self::Other(_) => "other",
        }
    }
}

impl std::fmt::Display for TagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(code) => write!(f, "other({})", code),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Decoded tag header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct TagHeader {
    pub tag_type: TagType,
    /// Advisory flag; carried through but never acted upon.
    pub encrypted: bool,
    /// Payload length, at most [`MAX_DATA_SIZE`].
    pub data_size: u32,
    /// Timestamp in milliseconds.
    pub timestamp: u32,
}

impl TagHeader {
    /// Create an unencrypted header.
    pub fn new(tag_type: TagType, data_size: u32, timestamp: u32) -> Self {
        Self {
            tag_type,
            encrypted: false,
            data_size,
            timestamp,
        }
    }

    /// Serialize to the on-disk layout.
    ///
    /// Bits of `data_size` above 24 are dropped; callers check the size first.
    pub fn encode(&self) -> [u8; TAG_HEADER_LEN] {
        let mut buf = [0u8; TAG_HEADER_LEN];
        let mut out = &mut buf[..];

        let mut first = self.tag_type.as_u8();
        if self.encrypted {
            first |= ENCRYPTED_BIT;
        }
        out.put_u8(first);

        // 24-bit size, then low 24 bits of the timestamp, then its top byte
        out.put_uint(self.data_size as u64 & 0x00FF_FFFF, 3);
        out.put_uint(self.timestamp as u64 & 0x00FF_FFFF, 3);
        out.put_u8((self.timestamp >> 24) as u8);

        // stream id
        out.put_uint(0, 3);

        buf
    }

    /// Parse the on-disk layout. The stream id is ignored.
    pub fn decode(bytes: &[u8; TAG_HEADER_LEN]) -> Self {
        Self {
            tag_type: TagType::from_u8(bytes[0]),
            encrypted: bytes[0] & ENCRYPTED_BIT != 0,
            data_size: u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]),
            timestamp: decode_timestamp([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Total bytes this tag occupies on disk, back-pointer included.
    pub fn record_len(&self) -> u64 {
        (TAG_HEADER_LEN + BACK_POINTER_LEN) as u64 + self.data_size as u64
    }
}

/// Rebuild a timestamp from its on-disk bytes, where the most significant
/// byte comes last.
pub fn decode_timestamp(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes([bytes[3], bytes[0], bytes[1], bytes[2]])
}

/// Back-pointer value written after a payload of `data_size` bytes.
pub fn back_pointer(data_size: u32) -> u32 {
    data_size + TAG_HEADER_LEN as u32
}

/// A tag read from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub header: TagHeader,
    pub payload: Bytes,
}

impl Tag {
    pub fn tag_type(&self) -> TagType {
        self.header.tag_type
    }

    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Decode the audio prefix byte. Meaningful for audio tags only.
    pub fn audio_metadata(&self) -> AudioMetadata {
        AudioMetadata::from_payload(&self.payload)
    }

    /// Decode the video prefix byte. Meaningful for video tags only.
    pub fn video_metadata(&self) -> VideoMetadata {
        VideoMetadata::from_payload(&self.payload)
    }
}
