//! config.rs
//! Reader and writer settings with defaults and validation.

use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_ENTITIES_PER_BUFFER, DEFAULT_MAX_IN_FLIGHT, DEFAULT_QUEUE_DEPTH,
    DEFAULT_RETRIEVAL_PROGRAM, MAX_CHUNK_SIZE,
};
use crate::format::ConfigError;

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Raw chunks held between the pump and the decoder.
    pub queue_depth: usize,
    /// Bytes requested per decompressor read.
    pub chunk_size: usize,
    /// Program spawned for network schemes; gets the URL as its only argument.
    pub retrieval_program: String,
    /// Upper bound on entities per decoded buffer.
    pub entities_per_buffer: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retrieval_program: DEFAULT_RETRIEVAL_PROGRAM.to_string(),
            entities_per_buffer: DEFAULT_ENTITIES_PER_BUFFER,
        }
    }
}

impl ReaderConfig {
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_retrieval_program(mut self, program: impl Into<String>) -> Self {
        self.retrieval_program = program.into();
        self
    }

    pub fn with_entities_per_buffer(mut self, n: usize) -> Self {
        self.entities_per_buffer = n;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_depth == 0 {
            return Err(ConfigError::InvalidOption {
                key: "queue_depth".into(),
                msg: "must be at least 1".into(),
            });
        }
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidOption {
                key: "chunk_size".into(),
                msg: format!("{} not in 1..={}", self.chunk_size, MAX_CHUNK_SIZE),
            });
        }
        if self.retrieval_program.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                key: "retrieval_program".into(),
                msg: "empty program name".into(),
            });
        }
        if self.entities_per_buffer == 0 {
            return Err(ConfigError::InvalidOption {
                key: "entities_per_buffer".into(),
                msg: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Outstanding encode tasks before `submit` blocks on the oldest one.
    pub max_in_flight: usize,
    /// Replace an existing output file instead of failing.
    pub overwrite: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            overwrite: false,
        }
    }
}

impl WriterConfig {
    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidOption {
                key: "max_in_flight".into(),
                msg: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
