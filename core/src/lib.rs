//! osmio-core
//!
//! Streaming I/O for OSM entity data: a threaded reader that decodes from
//! files, stdin or a retrieval subprocess, and an output pipeline that
//! encodes blocks in parallel while writing them in order.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;

// Data model, compression and wire formats
pub mod osm;
pub mod compression;
pub mod format;
pub mod telemetry;

// Stream layer
pub mod stream;

pub mod prelude {
    pub use crate::compression::Compression;
    pub use crate::config::{ReaderConfig, WriterConfig};
    pub use crate::format::{CodecError, ConfigError, FileSpec, FormatDescriptor, Registries};
    pub use crate::osm::{
        BoundingBox, Changeset, Entity, EntityBuffer, EntityBufferBuilder, EntityKinds, Header,
        ItemType, Location, Member, Node, NodeRef, Relation, TagList, Timestamp, Way,
    };
    pub use crate::stream::{OutputPipeline, Reader, ReaderState, WorkerPool};
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::StreamError;
}
