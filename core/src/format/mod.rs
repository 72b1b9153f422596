//! format/mod.rs
//! Wire formats: descriptors, the codec registry and builtin codecs.

pub mod types;
pub mod descriptor;
pub mod registry;
pub mod codecs;

pub use types::*;
pub use descriptor::{FileSpec, FormatDescriptor};
pub use registry::{CodecRegistry, DecoderFactory, EncoderFactory, Registries};
