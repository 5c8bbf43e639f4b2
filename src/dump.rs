//! Per-tag inspection of an FLV file.
//!
//! [`Dumper`] consumes tags in file order and produces one [`TagReport`]
//! per tag plus a [`DumpSummary`] at the end. Timestamps are checked for
//! monotonicity separately for each tag type, since audio and video are
//! interleaved and only need to be ordered within their own track.

use flvkit_media::{AudioMetadata, Tag, TagHeader, TagType, VideoMetadata};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// What was learned about a single tag.
#[derive(Debug, Clone, Serialize)]
pub struct TagReport {
    /// Zero-based position of the tag in the file.
    pub index: u64,
    pub header: TagHeader,
    pub payload_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoMetadata>,
    /// Previous timestamp of the same tag type, when this one is not later.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_monotonic_after: Option<u32>,
}

impl fmt::Display for TagReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ts={} size={}",
            self.index, self.header.tag_type, self.header.timestamp, self.payload_len
        )?;
        if self.header.encrypted {
            f.write_str(" encrypted")?;
        }
        if let Some(audio) = &self.audio {
            write!(
                f,
                ", format = {} ({}), sampling rate = {}, size = {}, stereo = {}",
                audio.format,
                audio.format_name().unwrap_or("unknown"),
                audio.sample_rate,
                audio.sample_size,
                audio.stereo
            )?;
        }
        if let Some(video) = &self.video {
            write!(
                f,
                ", frame type = {} ({}), codec = {} ({})",
                video.frame_type,
                video.frame_type_name().unwrap_or("unknown"),
                video.codec,
                video.codec_name().unwrap_or("unknown")
            )?;
        }
        if let Some(previous) = self.non_monotonic_after {
            write!(
                f,
                ", non-monotonic timestamp {} -> {}",
                previous, self.header.timestamp
            )?;
        }
        Ok(())
    }
}

/// Totals for a whole file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DumpSummary {
    pub tags: u64,
    pub payload_bytes: u64,
    /// Tag count per type name.
    pub counts: BTreeMap<String, u64>,
    /// Non-monotonic timestamp count per type name.
    pub non_monotonic: BTreeMap<String, u64>,
    /// Duration stored in the file's metadata, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_duration: Option<f64>,
}

impl fmt::Display for DumpSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tags: {} ({} payload bytes)", self.tags, self.payload_bytes)?;
        for (name, count) in &self.counts {
            let late = self.non_monotonic.get(name).copied().unwrap_or(0);
            writeln!(f, "  {}: {} ({} non-monotonic)", name, count, late)?;
        }
        if let Some(duration) = self.stored_duration {
            writeln!(f, "stored duration: {:.3}s", duration)?;
        }
        Ok(())
    }
}

/// Accumulates reports and statistics over a tag sequence.
#[derive(Debug, Default)]
pub struct Dumper {
    tags: u64,
    payload_bytes: u64,
    counts: BTreeMap<TagType, u64>,
    non_monotonic: BTreeMap<TagType, u64>,
    latest: HashMap<TagType, u32>,
}

impl Dumper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tag: &Tag) -> TagReport {
        let header = tag.header;
        let tag_type = header.tag_type;

        let non_monotonic_after = match self.latest.insert(tag_type, header.timestamp) {
            Some(previous) if header.timestamp <= previous => {
                *self.non_monotonic.entry(tag_type).or_default() += 1;
                Some(previous)
            }
            _ => None,
        };

        let report = TagReport {
            index: self.tags,
            header,
            payload_len: tag.payload.len(),
            audio: (tag_type == TagType::Audio).then(|| tag.audio_metadata()),
            video: (tag_type == TagType::Video).then(|| tag.video_metadata()),
            non_monotonic_after,
        };

        self.tags += 1;
        self.payload_bytes += tag.payload.len() as u64;
        *self.counts.entry(tag_type).or_default() += 1;

        report
    }

    pub fn finish(self, stored_duration: Option<f64>) -> DumpSummary {
        DumpSummary {
            tags: self.tags,
            payload_bytes: self.payload_bytes,
            counts: by_name(self.counts),
            non_monotonic: by_name(self.non_monotonic),
            stored_duration,
        }
    }
}

fn by_name(map: BTreeMap<TagType, u64>) -> BTreeMap<String, u64> {
    map.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
