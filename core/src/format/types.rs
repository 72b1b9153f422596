//! format/types.rs
//! Codec traits, decoder context and the format-level error types.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::format::descriptor::FormatDescriptor;
use crate::osm::{EntityBuffer, EntityKinds, Header};
use crate::stream::io::QueueReader;

/// Which side of the registry a codec belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Decode,
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Decode => f.write_str("input"),
            Direction::Encode => f.write_str("output"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown scheme '{scheme}' in '{location}'")]
    UnknownScheme { scheme: String, location: String },

    #[error("format '{format}' not supported for {direction}")]
    UnsupportedFormat { format: String, direction: Direction },

    #[error("cannot detect format of '{location}'")]
    UndetectableFormat { location: String },

    #[error("unknown compression '{name}'")]
    UnknownCompression { name: String },

    #[error("format '{format}' already registered for {direction}")]
    DuplicateCodec { format: String, direction: Direction },

    #[error("invalid option {key}: {msg}")]
    InvalidOption { key: String, msg: String },

    #[error("codec registry already installed")]
    RegistryAlreadyInstalled,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{format}: malformed input: {msg}")]
    Malformed { format: &'static str, msg: String },

    #[error("{format}: input truncated")]
    Truncated { format: &'static str },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    #[error("entity data: {0}")]
    Entity(String),

    #[error("encoder failure: {0}")]
    Internal(String),
}

impl CodecError {
    pub fn malformed(format: &'static str, msg: impl Into<String>) -> Self {
        CodecError::Malformed { format, msg: msg.into() }
    }
}

/// Everything a decoder constructor receives.
pub struct DecoderContext {
    pub descriptor: FormatDescriptor,
    pub read_types: EntityKinds,
    pub input: QueueReader,
    pub batch_size: usize,
}

/// Decoder instance for one open stream. Runs on the caller's thread.
pub trait InputFormat: Send {
    /// Consume the header region. Called exactly once, before `next_buffer`.
    fn read_header(&mut self) -> Result<Header, CodecError>;

    /// Next non-empty buffer of requested entities, or the empty sentinel
    /// once the input is exhausted.
    fn next_buffer(&mut self) -> Result<EntityBuffer, CodecError>;
}

/// Encoder shared by the worker pool. `encode_block` may run on many
/// threads at once, so implementations keep no per-call state.
pub trait OutputFormat: Send + Sync {
    fn encode_header(&self, header: &Header) -> Result<Vec<u8>, CodecError>;

    fn encode_block(&self, buffer: EntityBuffer) -> Result<Vec<u8>, CodecError>;

    /// Trailer written when the stream closes.
    fn encode_close(&self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }
}
