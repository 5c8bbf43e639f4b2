//! flvkit-media: FLV tag framing for incremental writers and sequential readers
//!
//! # Modules
//!
//! - `header` - The fixed file preamble and its 13-byte structural prefix
//! - `tag` - Tag header encoding, back-pointers, payload prefix decoding
//! - `writer` - Append-only writer that tracks timestamps and duration
//! - `reader` - Forward tag-by-tag reader
//!
//! # Duration checkpoints
//!
//! The preamble carries an `onMetaData` script tag whose `duration` value
//! lives at a fixed file offset. The writer keeps the largest normalized
//! timestamp seen so far and `FlvWriter::sync` overwrites just those 8 bytes,
//! so the file stays valid without a second pass over the tags.
//!
//! ```no_run
//! use flvkit_media::{FlvReader, FlvWriter};
//!
//! let mut writer = FlvWriter::create("out.flv")?;
//! writer.append_video(&[0x17, 0x00], 1000)?;
//! writer.append_audio(&[0xAF, 0x01], 1023)?;
//! writer.close()?;
//!
//! let mut reader = FlvReader::open("out.flv")?;
//! while let Some(tag) = reader.next_tag()? {
//!     println!("{} @ {}ms, {} bytes", tag.tag_type(), tag.timestamp(), tag.payload.len());
//! }
//! # Ok::<(), flvkit_media::Error>(())
//! ```

pub mod error;
pub mod header;
mod io;
pub mod reader;
pub mod tag;
pub mod writer;

pub use error::{Error, Result};
pub use header::ContainerHeader;
pub use io::SyncAll;
pub use reader::{FlvReader, Tags};
pub use tag::{AudioMetadata, Tag, TagHeader, TagType, VideoMetadata};
pub use writer::{FlvWriter, Timeline, UnderflowPolicy, WriterOptions};
