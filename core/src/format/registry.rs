//! format/registry.rs
//! Format identifier → codec constructor, one registry per direction.
//!
//! Registries are plain values filled by explicit `register` calls.
//! `Registries::builtin()` registers the codecs shipped with this crate;
//! `install()` publishes a set process-wide, and `global()` falls back to
//! the builtin set when nothing was installed.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::constants::format_ids;
use crate::format::codecs::{debug, opl, osmb};
use crate::format::descriptor::FormatDescriptor;
use crate::format::types::{CodecError, ConfigError, DecoderContext, Direction, InputFormat, OutputFormat};

pub type DecoderFactory = fn(DecoderContext) -> Result<Box<dyn InputFormat>, CodecError>;
pub type EncoderFactory = fn(&FormatDescriptor) -> Result<Arc<dyn OutputFormat>, CodecError>;

#[derive(Debug)]
pub struct CodecRegistry<F> {
    direction: Direction,
    factories: HashMap<String, F>,
}

impl<F: Copy> CodecRegistry<F> {
    pub fn new(direction: Direction) -> Self {
        Self { direction, factories: HashMap::new() }
    }

    /// Registering an identifier twice is an error; the first entry stays.
    pub fn register(&mut self, format: &str, factory: F) -> Result<(), ConfigError> {
        if self.factories.contains_key(format) {
            return Err(ConfigError::DuplicateCodec {
                format: format.to_string(),
                direction: self.direction,
            });
        }
        self.factories.insert(format.to_string(), factory);
        Ok(())
    }

    pub fn lookup(&self, format: &str) -> Result<F, ConfigError> {
        self.factories
            .get(format)
            .copied()
            .ok_or_else(|| ConfigError::UnsupportedFormat {
                format: format.to_string(),
                direction: self.direction,
            })
    }

    pub fn contains(&self, format: &str) -> bool {
        self.factories.contains_key(format)
    }

    /// Registered identifiers, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

#[derive(Debug)]
pub struct Registries {
    pub decoders: CodecRegistry<DecoderFactory>,
    pub encoders: CodecRegistry<EncoderFactory>,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

impl Registries {
    /// Empty registries.
    pub fn new() -> Self {
        Self {
            decoders: CodecRegistry::new(Direction::Decode),
            encoders: CodecRegistry::new(Direction::Encode),
        }
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        let mut r = Self::new();
        r.encoders.register(format_ids::DEBUG, debug::create_encoder)?;
        r.decoders.register(format_ids::OPL, opl::create_decoder)?;
        r.encoders.register(format_ids::OPL, opl::create_encoder)?;
        r.decoders.register(format_ids::OSMB, osmb::create_decoder)?;
        r.encoders.register(format_ids::OSMB, osmb::create_encoder)?;
        Ok(r)
    }
}

static GLOBAL: OnceLock<Registries> = OnceLock::new();

/// Publish `registries` as the process-wide set. Fails if a set was
/// already installed or `global()` already fell back to the builtins.
pub fn install(registries: Registries) -> Result<(), ConfigError> {
    GLOBAL
        .set(registries)
        .map_err(|_| ConfigError::RegistryAlreadyInstalled)
}

pub fn global() -> Result<&'static Registries, ConfigError> {
    if let Some(r) = GLOBAL.get() {
        return Ok(r);
    }
    let builtin = Registries::builtin()?;
    Ok(GLOBAL.get_or_init(|| builtin))
}
