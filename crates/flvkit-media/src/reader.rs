//! Sequential FLV reader.

use crate::header::{ContainerHeader, DURATION_OFFSET, HEADER_LEN};
use crate::io::read_full;
use crate::tag::{back_pointer, Tag, TagHeader, BACK_POINTER_LEN, TAG_HEADER_LEN};
use crate::{Error, Result};
use bytes::BytesMut;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// FLV file reader.
///
/// Construction validates the 13-byte structural prefix and leaves the
/// cursor on the first tag. [`next_tag`](Self::next_tag) then decodes one
/// tag per call.
pub struct FlvReader<R> {
    inner: R,
    path: Option<PathBuf>,
    size: u64,
    header: ContainerHeader,
    strict: bool,
}

impl FlvReader<BufReader<File>> {
    /// Open an existing file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = Self::new(BufReader::new(file))?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: Read + Seek> FlvReader<R> {
    /// Record the stream length, then read and validate the prefix.
    pub fn new(mut inner: R) -> Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        let header = ContainerHeader::read_from(&mut inner)?;
        tracing::debug!(
            size,
            version = header.version,
            flags = header.flags,
            "Opened FLV stream"
        );

        Ok(Self {
            inner,
            path: None,
            size,
            header,
            strict: false,
        })
    }

    /// Verify each tag's trailing back-pointer against its data size.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Read the next tag.
    ///
    /// Returns `Ok(None)` when the stream ends exactly on a tag boundary and
    /// [`Error::Truncated`] when it ends inside a tag. After a truncation the
    /// cursor position is unspecified.
    pub fn next_tag(&mut self) -> Result<Option<Tag>> {
        let mut head = [0u8; TAG_HEADER_LEN];
        let have = read_full(&mut self.inner, &mut head)?;
        if have == 0 {
            return Ok(None);
        }
        if have < TAG_HEADER_LEN {
            return Err(Error::truncated(TAG_HEADER_LEN, have));
        }
        let header = TagHeader::decode(&head);

        let need = header.data_size as usize;
        let mut payload = BytesMut::zeroed(need);
        let have = read_full(&mut self.inner, &mut payload)?;
        if have < need {
            return Err(Error::truncated(need, have));
        }

        let mut trailer = [0u8; BACK_POINTER_LEN];
        let have = read_full(&mut self.inner, &mut trailer)?;
        if have < BACK_POINTER_LEN {
            return Err(Error::truncated(BACK_POINTER_LEN, have));
        }

        if self.strict {
            let expected = back_pointer(header.data_size);
            let found = u32::from_be_bytes(trailer);
            if found != expected {
                return Err(Error::BackPointerMismatch { expected, found });
            }
        }

        tracing::trace!(
            tag_type = %header.tag_type,
            data_size = header.data_size,
            timestamp = header.timestamp,
            "Read tag"
        );

        Ok(Some(Tag {
            header,
            payload: payload.freeze(),
        }))
    }

    /// Iterate over the remaining tags. Stops after the first error.
    pub fn tags(&mut self) -> Tags<'_, R> {
        Tags {
            reader: self,
            done: false,
        }
    }

    /// True when the cursor is at or past the end recorded at open, or when
    /// the position cannot be determined.
    pub fn is_finished(&mut self) -> bool {
        match self.inner.stream_position() {
            Ok(pos) => pos >= self.size,
            Err(_) => true,
        }
    }

    /// Move the cursor back to the first tag for another pass.
    pub fn rewind_to_first_tag(&mut self) -> Result<()> {
        self.inner.seek(SeekFrom::Start(HEADER_LEN))?;
        Ok(())
    }

    /// Read the duration stored in the preamble, leaving the cursor where
    /// it was.
    pub fn stored_duration(&mut self) -> Result<f64> {
        let pos = self.inner.stream_position()?;

        self.inner.seek(SeekFrom::Start(DURATION_OFFSET))?;
        let mut raw = [0u8; 8];
        let have = read_full(&mut self.inner, &mut raw);
        self.inner.seek(SeekFrom::Start(pos))?;

        let have = have?;
        if have < raw.len() {
            return Err(Error::truncated(raw.len(), have));
        }
        Ok(f64::from_be_bytes(raw))
    }
}

impl<R> FlvReader<R> {
    /// Stream length recorded at open.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Path of the file, when opened with [`FlvReader::open`].
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Iterator returned by [`FlvReader::tags`].
pub struct Tags<'a, R> {
    reader: &'a mut FlvReader<R>,
    done: bool,
}

impl<R: Read + Seek> Iterator for Tags<'_, R> {
    type Item = Result<Tag>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_tag() {
            Ok(Some(tag)) => Some(Ok(tag)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read + Seek> std::iter::FusedIterator for Tags<'_, R> {}
