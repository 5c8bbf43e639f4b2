//! Sequential FLV writer with running duration tracking.

use crate::header::{self, DURATION_OFFSET};
use crate::io::SyncAll;
use crate::tag::{back_pointer, TagHeader, TagType, MAX_DATA_SIZE};
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// What to do with a timestamp earlier than the first one of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum UnderflowPolicy {
    /// Write the tag at timestamp zero.
    #[default]
    Clamp,
    /// Subtract with 32-bit wraparound.
    Wrap,
}

/// Writer configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterOptions {
    pub underflow: UnderflowPolicy,
}

/// Running timestamp state of a write session.
///
/// The first observed timestamp becomes the zero point for every later tag.
/// `duration` is the largest normalized timestamp seen so far, in seconds,
/// and never decreases.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    first: Option<u32>,
    last: Option<u32>,
    duration: f64,
    underflow: UnderflowPolicy,
}

impl Timeline {
    pub fn new(underflow: UnderflowPolicy) -> Self {
        Self {
            underflow,
            ..Self::default()
        }
    }

    /// Account for a tag timestamp and return the normalized value to write.
    ///
    /// Out-of-order timestamps are logged and written unchanged.
    pub fn observe(&mut self, timestamp: u32) -> u32 {
        let first = match self.first {
            Some(first) => first,
            None => {
                tracing::debug!(timestamp, "First timestamp set");
                self.first = Some(timestamp);
                timestamp
            }
        };

        match self.last {
            Some(last) if timestamp < last => {
                tracing::warn!(
                    timestamp,
                    last,
                    "Non-monotonic tag timestamp, writing as given"
                );
            }
            _ => self.last = Some(timestamp),
        }

        let normalized = match timestamp.checked_sub(first) {
            Some(n) => n,
            None => {
                tracing::warn!(
                    timestamp,
                    first,
                    policy = ?self.underflow,
                    "Tag timestamp precedes first timestamp"
                );
                match self.underflow {
                    UnderflowPolicy::Clamp => 0,
                    UnderflowPolicy::Wrap => timestamp.wrapping_sub(first),
                }
            }
        };

        let duration = normalized as f64 / 1000.0;
        if duration > self.duration {
            self.duration = duration;
        }

        normalized
    }

    /// Largest normalized timestamp seen, in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    /// Zero point of the session, once a tag has been observed.
    pub fn first_timestamp(&self) -> Option<u32> {
        self.first
    }

    /// Most recent in-order timestamp.
    pub fn last_timestamp(&self) -> Option<u32> {
        self.last
    }
}

/// FLV file writer.
///
/// Writes the fixed preamble on construction, then appends tags one at a
/// time. [`sync`](Self::sync) patches the preamble's duration field with the
/// running maximum and asks the storage to persist.
///
/// The stream must be positioned at offset zero when the writer is created.
#[derive(Debug)]
pub struct FlvWriter<W> {
    inner: W,
    path: Option<PathBuf>,
    timeline: Timeline,
    tags_written: u64,
    /// Set while the cursor may sit inside the preamble after a failed sync.
    needs_reseek: bool,
}

impl FlvWriter<BufWriter<File>> {
    /// Create (or truncate) a file and write the preamble.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_options(path, WriterOptions::default())
    }

    pub fn create_with_options<P: AsRef<Path>>(path: P, options: WriterOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = Self::with_options(BufWriter::new(file), options)?;
        writer.path = Some(path.to_path_buf());
        tracing::debug!("Created FLV file {:?}", path);
        Ok(writer)
    }
}

impl<W: Write + Seek + SyncAll> FlvWriter<W> {
    /// Write the preamble to `inner` and persist it.
    pub fn new(inner: W) -> Result<Self> {
        Self::with_options(inner, WriterOptions::default())
    }

    pub fn with_options(mut inner: W, options: WriterOptions) -> Result<Self> {
        header::write_preamble(&mut inner)?;
        inner.sync_all()?;

        Ok(Self {
            inner,
            path: None,
            timeline: Timeline::new(options.underflow),
            tags_written: 0,
            needs_reseek: false,
        })
    }

    /// Append one tag.
    ///
    /// The on-disk timestamp is `timestamp` minus the session's first
    /// timestamp. A failed write may leave a partial tag at the end of the
    /// stream; nothing already written is rolled back.
    ///
    /// `TagType::Other` codes that would not read back as the same type are
    /// rejected with [`Error::InvalidTagType`].
    pub fn append_tag(&mut self, payload: &[u8], tag_type: TagType, timestamp: u32) -> Result<()> {
        if payload.len() > MAX_DATA_SIZE {
            return Err(Error::PayloadTooLarge(payload.len()));
        }
        let data_size = payload.len() as u32;
        if let TagType::Other(code) = tag_type {
            if TagType::from_u8(code) != tag_type {
                return Err(Error::InvalidTagType(code));
            }
        }

        if self.needs_reseek {
            self.inner.seek(SeekFrom::End(0))?;
            self.needs_reseek = false;
        }

        let normalized = self.timeline.observe(timestamp);
        let header = TagHeader::new(tag_type, data_size, normalized);

        self.inner.write_all(&header.encode())?;
        self.inner.write_all(payload)?;
        self.inner.write_all(&back_pointer(data_size).to_be_bytes())?;

        self.tags_written += 1;
        tracing::trace!(
            tag_type = %tag_type,
            data_size,
            timestamp = normalized,
            "Wrote tag"
        );
        Ok(())
    }

    /// Append an audio tag. `payload` starts with the audio prefix byte.
    pub fn append_audio(&mut self, payload: &[u8], timestamp: u32) -> Result<()> {
        self.append_tag(payload, TagType::Audio, timestamp)
    }

    /// Append a video tag. `payload` starts with the video prefix byte.
    pub fn append_video(&mut self, payload: &[u8], timestamp: u32) -> Result<()> {
        self.append_tag(payload, TagType::Video, timestamp)
    }

    /// Patch the duration field and persist everything written so far.
    ///
    /// Only the 8 bytes at [`DURATION_OFFSET`] are rewritten; the cursor is
    /// returned to the end of the stream afterwards. If that fails, the next
    /// append seeks to the end before writing.
    pub fn sync(&mut self) -> Result<()> {
        let duration = self.timeline.duration();

        self.needs_reseek = true;
        self.inner.seek(SeekFrom::Start(DURATION_OFFSET))?;
        self.inner.write_all(&duration.to_be_bytes())?;
        self.inner.seek(SeekFrom::End(0))?;
        self.needs_reseek = false;
        self.inner.sync_all()?;

        tracing::debug!(duration, tags = self.tags_written, "Synced FLV duration");
        Ok(())
    }

    /// Final [`sync`](Self::sync), then release the stream.
    pub fn close(self) -> Result<()> {
        self.finish().map(drop)
    }

    /// Final [`sync`](Self::sync), then hand back the stream.
    pub fn finish(mut self) -> Result<W> {
        self.sync()?;
        Ok(self.inner)
    }

    /// Hand back the stream without syncing.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> FlvWriter<W> {
    /// Current duration in seconds.
    pub fn duration(&self) -> f64 {
        self.timeline.duration()
    }

    /// Override the duration written by the next `sync()`.
    ///
    /// Later appends still raise it if they exceed the new value.
    pub fn set_duration(&mut self, duration: f64) {
        self.timeline.set_duration(duration);
    }

    pub fn first_timestamp(&self) -> Option<u32> {
        self.timeline.first_timestamp()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn tags_written(&self) -> u64 {
        self.tags_written
    }

    /// Path of the file, when created with [`FlvWriter::create`].
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{PREAMBLE, DURATION_OFFSET};
    use std::io::{self, Cursor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// In-memory stream whose next `SeekFrom::End` calls fail.
    #[derive(Debug, Default)]
    struct FailingEndSeek {
        inner: Cursor<Vec<u8>>,
        failures: u32,
    }

    impl Write for FailingEndSeek {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for FailingEndSeek {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            if matches!(pos, SeekFrom::End(_)) && self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "seek failed"));
            }
            self.inner.seek(pos)
        }
    }

    impl SyncAll for FailingEndSeek {
        fn sync_all(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Counts warn-level events carrying a `last` field.
    struct NonMonotonicWarnings(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for NonMonotonicWarnings {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let meta = event.metadata();
            if *meta.level() == Level::WARN && meta.fields().field("last").is_some() {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn memory_writer() -> FlvWriter<Cursor<Vec<u8>>> {
        FlvWriter::new(Cursor::new(Vec::new())).unwrap()
    }

    fn stored_duration(bytes: &[u8]) -> f64 {
        let at = DURATION_OFFSET as usize;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[at..at + 8]);
        f64::from_be_bytes(raw)
    }

    #[test]
    fn test_new_writes_preamble() {
        let writer = memory_writer();
        assert_eq!(writer.get_ref().get_ref().as_slice(), &PREAMBLE[..]);
        assert_eq!(writer.duration(), 0.0);
        assert_eq!(writer.first_timestamp(), None);
    }

    #[test]
    fn test_append_tag_layout() {
        let mut writer = memory_writer();
        writer.append_video(&[0x17, 0x01, 0x02], 5000).unwrap();
        writer.append_audio(&[0xAF], 5040).unwrap();

        let bytes = writer.into_inner().into_inner();
        let tags = &bytes[PREAMBLE.len()..];

        // first tag normalized to zero
        assert_eq!(&tags[..11], &[9, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&tags[11..14], &[0x17, 0x01, 0x02]);
        assert_eq!(&tags[14..18], &14u32.to_be_bytes());

        // second tag at 40ms
        let second = &tags[18..];
        assert_eq!(&second[..11], &[8, 0, 0, 1, 0, 0, 40, 0, 0, 0, 0]);
        assert_eq!(second[11], 0xAF);
        assert_eq!(&second[12..16], &12u32.to_be_bytes());
        assert_eq!(second.len(), 16);
    }

    #[test]
    fn test_duration_tracks_maximum() {
        let mut writer = memory_writer();
        writer.append_video(&[0x17], 1000).unwrap();
        writer.append_video(&[0x27], 5000).unwrap();
        writer.append_video(&[0x27], 3000).unwrap();

        assert_eq!(writer.duration(), 4.0);
        assert_eq!(writer.timeline().last_timestamp(), Some(5000));
        assert_eq!(writer.tags_written(), 3);
    }

    #[test]
    fn test_out_of_order_timestamp_written_as_given() {
        let mut writer = memory_writer();
        writer.append_audio(&[0xAF], 1000).unwrap();
        writer.append_audio(&[0xAF], 5000).unwrap();
        writer.append_audio(&[0xAF], 3000).unwrap();

        let bytes = writer.into_inner().into_inner();
        let third = PREAMBLE.len() + 2 * 16;
        let ts = crate::tag::decode_timestamp([
            bytes[third + 4],
            bytes[third + 5],
            bytes[third + 6],
            bytes[third + 7],
        ]);
        assert_eq!(ts, 2000);
    }

    #[test]
    fn test_out_of_order_timestamp_logs_warning() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber =
            tracing_subscriber::registry().with(NonMonotonicWarnings(warnings.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let mut timeline = Timeline::default();
            timeline.observe(1000);
            timeline.observe(5000);
            assert_eq!(warnings.load(Ordering::SeqCst), 0);

            assert_eq!(timeline.observe(3000), 2000);
            assert_eq!(timeline.last_timestamp(), Some(5000));
        });

        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_underflow_clamps_by_default() {
        let mut timeline = Timeline::new(UnderflowPolicy::Clamp);
        assert_eq!(timeline.observe(1000), 0);
        assert_eq!(timeline.observe(400), 0);
        assert_eq!(timeline.duration(), 0.0);
    }

    #[test]
    fn test_underflow_wraps_when_configured() {
        let mut timeline = Timeline::new(UnderflowPolicy::Wrap);
        timeline.observe(1000);
        assert_eq!(timeline.observe(400), u32::MAX - 599);
    }

    #[test]
    fn test_sync_patches_only_duration() {
        let mut writer = memory_writer();
        writer.append_video(&[0x17, 0xAA], 1000).unwrap();
        writer.append_video(&[0x27, 0xBB], 2500).unwrap();
        writer.sync().unwrap();

        let first = writer.get_ref().get_ref().clone();
        assert_eq!(stored_duration(&first), 1.5);

        writer.append_audio(&[0xAF, 0x00], 4000).unwrap();
        writer.sync().unwrap();
        let second = writer.into_inner().into_inner();

        assert_eq!(stored_duration(&second), 3.0);
        let at = DURATION_OFFSET as usize;
        assert_eq!(&first[..at], &second[..at]);
        assert_eq!(&first[at + 8..], &second[at + 8..first.len()]);
        assert_eq!(second.len(), first.len() + 11 + 2 + 4);
    }

    #[test]
    fn test_append_after_sync_goes_to_end() {
        let mut writer = memory_writer();
        writer.append_video(&[0x17], 0).unwrap();
        writer.sync().unwrap();
        writer.append_video(&[0x27], 40).unwrap();

        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes.len(), PREAMBLE.len() + 2 * 16);
    }

    #[test]
    fn test_append_after_failed_sync_goes_to_end() {
        let mut writer = FlvWriter::new(FailingEndSeek::default()).unwrap();
        writer.append_video(&[0x17; 20], 1000).unwrap();
        writer.append_video(&[0x27; 20], 2000).unwrap();
        let before = writer.get_ref().inner.get_ref().len();

        writer.inner.failures = 1;
        assert!(writer.sync().is_err());

        writer.append_video(&[0x27; 3], 3000).unwrap();
        let bytes = writer.into_inner().inner.into_inner();

        assert_eq!(bytes.len(), before + 11 + 3 + 4);
        assert_eq!(&bytes[..DURATION_OFFSET as usize], &PREAMBLE[..DURATION_OFFSET as usize]);
        let after_duration = DURATION_OFFSET as usize + 8;
        assert_eq!(&bytes[after_duration..PREAMBLE.len()], &PREAMBLE[after_duration..]);
        assert_eq!(stored_duration(&bytes), 1.0);

        let tail = &bytes[before..];
        assert_eq!(&tail[..4], &[9, 0, 0, 3]);
        assert_eq!(decode_ts(&tail[4..8]), 2000);
    }

    #[test]
    fn test_invalid_other_tag_type_rejected() {
        let mut writer = memory_writer();
        for code in [8u8, 9, 18, 40] {
            let err = writer.append_tag(&[0x00], TagType::Other(code), 0).unwrap_err();
            assert!(matches!(err, Error::InvalidTagType(c) if c == code));
        }
        writer.append_tag(&[0x00], TagType::Other(15), 0).unwrap();

        assert_eq!(writer.tags_written(), 1);
        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes.len(), PREAMBLE.len() + 16);
        assert_eq!(bytes[PREAMBLE.len()], 15);
    }

    #[test]
    fn test_set_duration_override() {
        let mut writer = memory_writer();
        writer.append_video(&[0x17], 0).unwrap();
        writer.set_duration(12.5);
        let bytes = writer.finish().unwrap().into_inner();
        assert_eq!(stored_duration(&bytes), 12.5);
    }

    #[test]
    fn test_payload_too_large_rejected_before_write() {
        let mut writer = memory_writer();
        let payload = vec![0u8; MAX_DATA_SIZE + 1];
        let err = writer.append_video(&payload, 0).unwrap_err();

        assert!(matches!(err, Error::PayloadTooLarge(n) if n == MAX_DATA_SIZE + 1));
        assert_eq!(writer.first_timestamp(), None);
        assert_eq!(writer.into_inner().into_inner().len(), PREAMBLE.len());
    }

    #[test]
    fn test_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.flv");

        let mut writer = FlvWriter::create(&path).unwrap();
        assert_eq!(writer.path(), Some(path.as_path()));
        writer.append_audio(&[0xAF, 0x01], 100).unwrap();
        writer.append_audio(&[0xAF, 0x01], 2100).unwrap();
        writer.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), PREAMBLE.len() + 2 * 17);
        assert_eq!(stored_duration(&bytes), 2.0);
    }

    fn decode_ts(raw: &[u8]) -> u32 {
        crate::tag::decode_timestamp([raw[0], raw[1], raw[2], raw[3]])
    }
}
