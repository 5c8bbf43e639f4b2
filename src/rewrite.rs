//! Copy the media tags of one FLV stream into a fresh one.
//!
//! The output gets its own preamble, so script tags from the input are
//! dropped. Every other tag is appended with its original timestamp and the
//! writer re-derives the duration as it goes.

use flvkit_media::{FlvReader, FlvWriter, SyncAll, TagType};
use serde::Serialize;
use std::io::{Read, Seek, Write};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteStats {
    pub tags_read: u64,
    pub tags_written: u64,
    pub script_tags_skipped: u64,
    pub checkpoints: u64,
    /// Writer duration when the copy finished, in seconds.
    pub duration: f64,
}

/// Copy all remaining tags from `reader` to `writer`.
///
/// Calls `sync()` on the writer every `sync_every` written tags (never when
/// zero). The caller is responsible for the final `close()`.
pub fn rewrite<R, W>(
    reader: &mut FlvReader<R>,
    writer: &mut FlvWriter<W>,
    sync_every: u32,
) -> flvkit_media::Result<RewriteStats>
where
    R: Read + Seek,
    W: Write + Seek + SyncAll,
{
    let mut stats = RewriteStats::default();

    while let Some(tag) = reader.next_tag()? {
        stats.tags_read += 1;

        if tag.tag_type() == TagType::ScriptData {
            tracing::debug!(size = tag.payload.len(), "Skipping script tag");
            stats.script_tags_skipped += 1;
            continue;
        }

        writer.append_tag(&tag.payload, tag.tag_type(), tag.timestamp())?;
        stats.tags_written += 1;

        if sync_every > 0 && stats.tags_written % sync_every as u64 == 0 {
            writer.sync()?;
            stats.checkpoints += 1;
        }
    }

    stats.duration = writer.duration();
    Ok(stats)
}
