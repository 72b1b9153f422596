//! compression/types.rs
//! Compression identifiers, error type and the capability traits.

use std::fmt;
use std::io;

use thiserror::Error;

/// Supported stream compressions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
    Lz4,
}

impl Compression {
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
            Compression::Lz4  => "lz4",
        }
    }

    /// Accepts both the long name and the file suffix (`gz`, `zst`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "" | "none" => Some(Compression::None),
            "gz" | "gzip" => Some(Compression::Gzip),
            "zst" | "zstd" => Some(Compression::Zstd),
            "lz4" => Some(Compression::Lz4),
            _ => None,
        }
    }

    /// Compression implied by the last path suffix, if it names one.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gz" => Some(Compression::Gzip),
            "zst" => Some(Compression::Zstd),
            "lz4" => Some(Compression::Lz4),
            _ => None,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("codec {codec} init failed: {source}")]
    CodecInitFailed {
        codec: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("codec {codec} process failed: {source}")]
    CodecProcessFailed {
        codec: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("chunk size {have} outside 1..={max}")]
    ChunkSize { have: usize, max: usize },

    #[error("compression state error: {0}")]
    StateError(&'static str),
}

/// Pull side. Implementations own their raw source.
pub trait Decompressor: Send {
    /// Next decoded chunk; empty once the stream is exhausted.
    fn read(&mut self) -> Result<Vec<u8>, CompressionError>;

    /// Discard whatever raw bytes remain in the source and return how many
    /// were skipped. Used when a reader closes before EOF.
    fn drain(&mut self) -> Result<u64, CompressionError>;

    /// Release the source. Further reads return EOF.
    fn close(&mut self) -> Result<(), CompressionError>;
}

/// Push side. Implementations own their sink.
pub trait Compressor: Send {
    fn write(&mut self, data: &[u8]) -> Result<(), CompressionError>;

    /// Finish the frame and flush the sink. Further writes fail.
    fn close(&mut self) -> Result<(), CompressionError>;
}
