//! compression/mod.rs
//! Streaming compression and decompression behind a uniform capability.
//!
//! - Decompressors pull from a raw byte source and hand out decoded chunks;
//!   an empty chunk means end of stream.
//! - Compressors push into a sink and finish the frame on `close()`.
//! - `registry` resolves a `Compression` identifier to an implementation.

pub mod types;
pub mod registry;
pub mod codecs;

pub use types::*;
pub use registry::*;
