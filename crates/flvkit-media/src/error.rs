//! Error types for flvkit-media.

use std::io;
use thiserror::Error;

/// Result type for flvkit-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for flvkit-media operations.
///
/// Reaching the end of the stream at a tag boundary is not an error; the
/// reader reports it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream does not start with the `FLV` signature.
    #[error("Invalid FLV signature: {0:02x?}")]
    InvalidMagic([u8; 3]),

    /// The stream ended in the middle of a tag.
    #[error("Truncated stream: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    /// Trailing back-pointer disagrees with the tag it follows.
    #[error("Back-pointer mismatch: expected {expected}, found {found}")]
    BackPointerMismatch { expected: u32, found: u32 },

    /// Payload length does not fit the 24-bit data size field.
    #[error("Payload too large: {0} bytes (max: {max})", max = crate::tag::MAX_DATA_SIZE)]
    PayloadTooLarge(usize),

    /// `TagType::Other` code that is a known type or does not fit in 5 bits.
    #[error("Invalid tag type code: {0}")]
    InvalidTagType(u8),
}

impl Error {
    /// Create a truncation error.
    pub fn truncated(need: usize, have: usize) -> Self {
        Self::Truncated { need, have }
    }

    /// Whether this error means the stream ended mid-tag.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}
