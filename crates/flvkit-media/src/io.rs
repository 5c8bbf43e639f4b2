//! Stream helpers shared by the reader and writer.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, ErrorKind, Read, Write};

/// Storage that can be asked to persist everything written so far.
///
/// `sync_all` must flush any userspace buffering before asking the
/// operating system to commit the data.
pub trait SyncAll: Write {
    /// Flush buffers and commit written data to durable storage.
    fn sync_all(&mut self) -> io::Result<()>;
}

impl SyncAll for File {
    fn sync_all(&mut self) -> io::Result<()> {
        File::sync_all(self)
    }
}

impl SyncAll for BufWriter<File> {
    fn sync_all(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_ref().sync_all()
    }
}

impl SyncAll for Cursor<Vec<u8>> {
    fn sync_all(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: SyncAll + ?Sized> SyncAll for &mut T {
    fn sync_all(&mut self) -> io::Result<()> {
        (**self).sync_all()
    }
}

/// Read until `buf` is full or the stream ends.
///
/// Returns the number of bytes read; anything short of `buf.len()` means
/// end of stream was reached.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
