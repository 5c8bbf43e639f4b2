//! FLV file preamble.
//!
//! Every file written by [`FlvWriter`](crate::FlvWriter) starts with the same
//! 68 bytes: the 9-byte FLV header, the leading zero back-pointer, and an
//! `onMetaData` script tag whose only entry is `duration`. The duration value
//! sits at [`DURATION_OFFSET`] and is patched in place by `sync()`.

use crate::{Error, Result};
use std::io::{Read, Write};

/// FLV signature.
pub const MAGIC: [u8; 3] = *b"FLV";

/// Length of the structural prefix validated on open
/// (signature, version, flags, header size, zero back-pointer).
pub const HEADER_LEN: u64 = 13;

/// Absolute file offset of the big-endian f64 duration value.
pub const DURATION_OFFSET: u64 = 53;

/// Flag bit set when the file carries video tags.
pub const FLAG_VIDEO: u8 = 0x01;

/// Flag bit set when the file carries audio tags.
pub const FLAG_AUDIO: u8 = 0x04;

/// Fixed preamble written at the start of every new file.
#[rustfmt::skip]
pub const PREAMBLE: [u8; 68] = [
    // FLV header: signature, version 1, audio+video, header size 9
    b'F', b'L', b'V', 0x01, FLAG_AUDIO | FLAG_VIDEO, 0x00, 0x00, 0x00, 0x09,
    // back-pointer of the (nonexistent) previous tag
    0x00, 0x00, 0x00, 0x00,
    // script tag header: type 18, 40 data bytes, timestamp 0, stream 0
    0x12, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // AMF0 string "onMetaData"
    0x02, 0x00, 0x0a, b'o', b'n', b'M', b'e', b't', b'a', b'D', b'a', b't', b'a',
    // AMF0 ECMA array with one entry
    0x08, 0x00, 0x00, 0x00, 0x01,
    // key "duration"
    0x00, 0x08, b'd', b'u', b'r', b'a', b't', b'i', b'o', b'n',
    // AMF0 number marker, then the 8-byte value at offset 53
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // object end marker
    0x00, 0x00, 0x09,
    // back-pointer of the script tag (11 + 40)
    0x00, 0x00, 0x00, 0x33,
];

/// Parsed structural prefix of an FLV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ContainerHeader {
    /// Format version byte.
    pub version: u8,
    /// Capability flags (see [`FLAG_AUDIO`], [`FLAG_VIDEO`]).
    pub flags: u8,
    /// Declared header size.
    pub header_size: u32,
}

impl ContainerHeader {
    /// Whether the audio flag is set.
    pub fn has_audio(&self) -> bool {
        self.flags & FLAG_AUDIO != 0
    }

    /// Whether the video flag is set.
    pub fn has_video(&self) -> bool {
        self.flags & FLAG_VIDEO != 0
    }

    /// Parse the 13-byte prefix. Only the signature is validated.
    pub fn parse(bytes: &[u8; HEADER_LEN as usize]) -> Result<Self> {
        let magic = [bytes[0], bytes[1], bytes[2]];
        if magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        Ok(Self {
            version: bytes[3],
            flags: bytes[4],
            header_size: u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
        })
    }

    /// Read and validate the prefix from the current position.
    ///
    /// A wrong signature wins over a short stream; a stream with a valid
    /// signature but shorter than the prefix is reported as truncated.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; HEADER_LEN as usize];
        let have = crate::io::read_full(reader, &mut bytes)?;
        if have >= MAGIC.len() && bytes[..3] != MAGIC {
            return Err(Error::InvalidMagic([bytes[0], bytes[1], bytes[2]]));
        }
        if have < bytes.len() {
            return Err(Error::truncated(bytes.len(), have));
        }
        Self::parse(&bytes)
    }
}

/// Write the full preamble.
pub fn write_preamble<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(&PREAMBLE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_preamble_layout() {
        assert_eq!(&PREAMBLE[..3], b"FLV");
        assert_eq!(PREAMBLE[3], 1);
        assert_eq!(PREAMBLE[4], 0x05);
        assert_eq!(&PREAMBLE[5..9], &[0, 0, 0, 9]);
        assert_eq!(&PREAMBLE[9..13], &[0, 0, 0, 0]);
        assert_eq!(PREAMBLE[13], 18);

        // "duration" key ends right before the number marker
        assert_eq!(&PREAMBLE[44..52], b"duration");
        assert_eq!(PREAMBLE[52], 0x00);
        assert_eq!(&PREAMBLE[53..61], &0f64.to_be_bytes());
    }

    #[test]
    fn test_preamble_script_tag_is_self_consistent() {
        let data_size = u32::from_be_bytes([0, PREAMBLE[14], PREAMBLE[15], PREAMBLE[16]]);
        let back_pointer =
            u32::from_be_bytes([PREAMBLE[64], PREAMBLE[65], PREAMBLE[66], PREAMBLE[67]]);

        assert_eq!(data_size, 40);
        assert_eq!(back_pointer, data_size + 11);
        assert_eq!(PREAMBLE.len() as u32, HEADER_LEN as u32 + back_pointer + 4);
        assert_eq!(&PREAMBLE[61..64], &[0, 0, 9]);
    }

    #[test]
    fn test_parse_header() {
        let mut bytes = [0u8; 13];
        bytes.copy_from_slice(&PREAMBLE[..13]);
        let header = ContainerHeader::parse(&bytes).unwrap();

        assert_eq!(header.version, 1);
        assert_eq!(header.header_size, 9);
        assert!(header.has_audio());
        assert!(header.has_video());
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = [0u8; 13];
        bytes.copy_from_slice(&PREAMBLE[..13]);
        bytes[..3].copy_from_slice(b"MP4");

        let err = ContainerHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic(m) if &m == b"MP4"));
    }

    #[test]
    fn test_read_from_short_stream() {
        let mut cursor = Cursor::new(b"FLV\x01".to_vec());
        let err = ContainerHeader::read_from(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::Truncated { need: 13, have: 4 }));
    }

    #[test]
    fn test_read_from_short_stream_with_bad_magic() {
        let mut cursor = Cursor::new(b"GIF8".to_vec());
        let err = ContainerHeader::read_from(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic(_)));
    }
}
