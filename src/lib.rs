//! flvkit - FLV inspection and rewriting tools
//!
//! This library crate exposes the command implementations for integration
//! testing. Tag framing itself lives in `flvkit-media`.

pub mod config;
pub mod dump;
pub mod rewrite;
