//! osm/mod.rs
//! In-memory entity model: points, ways, relations, changesets, the
//! stream header, and the opaque `EntityBuffer` that carries decoded
//! batches between codecs and pipelines.

pub mod types;
pub mod object;
pub mod header;
pub mod buffer;

pub use types::*;
pub use object::*;
pub use header::Header;
pub use buffer::{EntityBuffer, EntityBufferBuilder, EntityIter};
