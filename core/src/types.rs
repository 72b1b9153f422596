//! types.rs
//! Unified error surfaced by readers and output pipelines.

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::{compression::CompressionError, format::{CodecError, ConfigError}};

/// Unified stream error covering configuration, OS resources, the
/// retrieval subprocess, codecs and compression.
/// - `From<T>` impls enable `?` across the pipeline.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Unknown scheme, unregistered format, bad option.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Pipe, spawn or file-open failure at the OS level.
    #[error("resource error: {context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Retrieval subprocess exited non-zero or was killed. Raised from `close()`.
    #[error("process error: {program} exited with {status}")]
    Process { program: String, status: ExitStatus },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Lifecycle misuse or a halted pipeline.
    #[error("pipeline error: {0}")]
    Pipeline(&'static str),
}

impl StreamError {
    pub fn resource(context: impl Into<String>, source: io::Error) -> Self {
        StreamError::Resource { context: context.into(), source }
    }

    /// Underlying OS error code for resource failures.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            StreamError::Resource { source, .. } => source.raw_os_error(),
            StreamError::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, StreamError::Configuration(_))
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, StreamError::Resource { .. })
    }

    pub fn is_process(&self) -> bool {
        matches!(self, StreamError::Process { .. })
    }

    pub fn is_codec(&self) -> bool {
        matches!(self, StreamError::Codec(_))
    }
}
