//! First-byte decoding for audio and video payloads.
//!
//! Values are extracted as-is and never checked against the legal ranges.
//! An empty payload yields the `-1` sentinel in every numeric field.

/// Fields packed into the first byte of an audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct AudioMetadata {
    /// Sound format (bits 4..7).
    pub format: i32,
    /// Sample rate index (bits 2..3).
    pub sample_rate: i32,
    /// Sample size index (bit 1).
    pub sample_size: i32,
    /// Stereo flag (bit 0).
    pub stereo: bool,
}

impl AudioMetadata {
    /// Result for an empty payload.
    pub const EMPTY: Self = Self {
        format: -1,
        sample_rate: -1,
        sample_size: -1,
        stereo: false,
    };

    pub fn from_payload(data: &[u8]) -> Self {
        let Some(&byte) = data.first() else {
            return Self::EMPTY;
        };

        Self {
            format: ((byte >> 4) & 0x0F) as i32,
            sample_rate: ((byte >> 2) & 0x03) as i32,
            sample_size: ((byte >> 1) & 0x01) as i32,
            stereo: byte & 0x01 != 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Human-readable sound format.
    pub fn format_name(&self) -> Option<&'static str> {
        match self.format {
            0 => Some("Linear PCM, platform endian"),
            1 => Some("ADPCM"),
            2 => Some("MP3"),
            3 => Some("Linear PCM, little endian"),
            4 => Some("Nellymoser 16 kHz mono"),
            5 => Some("Nellymoser 8 kHz mono"),
            6 => Some("Nellymoser"),
            7 => Some("G.711 A-law logarithmic PCM"),
            8 => Some("G.711 mu-law logarithmic PCM"),
            9 => Some("reserved"),
            10 => Some("AAC"),
            11 => Some("Speex"),
            14 => Some("MP3 8 kHz"),
            15 => Some("Device-specific sound"),
            _ => None,
        }
    }

    /// Sample rate in Hz for the rate index.
    pub fn sample_rate_hz(&self) -> Option<u32> {
        match self.sample_rate {
            0 => Some(5_512),
            1 => Some(11_025),
            2 => Some(22_050),
            3 => Some(44_100),
            _ => None,
        }
    }

    /// Bits per sample for the size index.
    pub fn sample_bits(&self) -> Option<u8> {
        match self.sample_size {
            0 => Some(8),
            1 => Some(16),
            _ => None,
        }
    }
}

/// Fields packed into the first byte of a video payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct VideoMetadata {
    /// Frame type (bits 4..7).
    pub frame_type: i32,
    /// Codec id (bits 0..3).
    pub codec: i32,
}

impl VideoMetadata {
    /// Result for an empty payload.
    pub const EMPTY: Self = Self {
        frame_type: -1,
        codec: -1,
    };

    pub fn from_payload(data: &[u8]) -> Self {
        let Some(&byte) = data.first() else {
            return Self::EMPTY;
        };

        Self {
            frame_type: ((byte >> 4) & 0x0F) as i32,
            codec: (byte & 0x0F) as i32,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Key frames are seekable (for AVC).
    pub fn is_keyframe(&self) -> bool {
        self.frame_type == 1
    }

    pub fn frame_type_name(&self) -> Option<&'static str> {
        match self.frame_type {
            1 => Some("key frame"),
            2 => Some("inter frame"),
            3 => Some("disposable inter frame"),
            4 => Some("generated key frame"),
            5 => Some("video info/command frame"),
            _ => None,
        }
    }

    pub fn codec_name(&self) -> Option<&'static str> {
        match self.codec {
            2 => Some("Sorenson H.263"),
            3 => Some("Screen video"),
            4 => Some("On2 VP6"),
            5 => Some("On2 VP6 with alpha channel"),
            6 => Some("Screen video version 2"),
            7 => Some("AVC"),
            _ => None,
        }
    }
}
