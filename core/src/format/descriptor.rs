//! format/descriptor.rs
//! Format identifiers with compression and an option bag.
//!
//! A descriptor string reads `format[.compression][,key=value...]`, for
//! example `opl.gz` or `debug,add_metadata=false,color=true`. A bare key
//! (`color`) means `key=true`. When the format part is empty it is
//! detected from the file name suffix.

use std::path::Path;

use crate::compression::Compression;
use crate::constants::STDIO_LOCATION;
use crate::format::types::ConfigError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatDescriptor {
    format: String,
    compression: Compression,
    options: Vec<(String, String)>,
}

impl FormatDescriptor {
    pub fn new(format: impl Into<String>, compression: Compression) -> Self {
        Self { format: format.into(), compression, options: Vec::new() }
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut parts = text.split(',');
        let head = parts.next().unwrap_or_default().trim();
        let mut descriptor = if head.is_empty() {
            Self::default()
        } else {
            Self::parse_head(head)?
        };
        for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((k, v)) => descriptor.set(k.trim(), v.trim()),
                None => descriptor.set(part, "true"),
            }
        }
        Ok(descriptor)
    }

    /// Detect format and compression from a file name such as
    /// `extract.osm.opl.gz`.
    pub fn from_path(location: &str) -> Result<Self, ConfigError> {
        let undetectable = || ConfigError::UndetectableFormat { location: location.to_string() };
        let name = Path::new(location)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(undetectable)?;

        let mut suffixes: Vec<&str> = name.split('.').skip(1).collect();
        let mut compression = Compression::None;
        if let Some(c) = suffixes.last().and_then(|s| Compression::from_suffix(s)) {
            compression = c;
            suffixes.pop();
        }
        let format = suffixes.pop().ok_or_else(undetectable)?;
        Ok(Self::new(format, compression))
    }

    fn parse_head(head: &str) -> Result<Self, ConfigError> {
        let (format, compression) = match head.split_once('.') {
            Some((f, c)) => {
                let compression = Compression::from_name(c)
                    .ok_or_else(|| ConfigError::UnknownCompression { name: c.to_string() })?;
                (f, compression)
            }
            None => match Compression::from_suffix(head) {
                // "gz" alone: compression only, format still to be detected
                Some(c) => ("", c),
                None => (head, Compression::None),
            },
        };
        Ok(Self::new(format, compression))
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Set an option, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.options.push((key, value)),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A location plus the descriptor used to read or write it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSpec {
    location: String,
    descriptor: FormatDescriptor,
}

impl FileSpec {
    /// `format` may be empty, carry only options (`",color=true"`), or
    /// only a compression (`"gz"`); missing parts come from the file name.
    pub fn new(location: impl Into<String>, format: &str) -> Result<Self, ConfigError> {
        let location = location.into();
        let mut descriptor = FormatDescriptor::parse(format)?;
        if descriptor.format.is_empty() {
            if location.is_empty() || location == STDIO_LOCATION {
                return Err(ConfigError::UndetectableFormat { location });
            }
            let detected = FormatDescriptor::from_path(&location)?;
            descriptor.format = detected.format;
            if descriptor.compression == Compression::None {
                descriptor.compression = detected.compression;
            }
        }
        Ok(Self { location, descriptor })
    }

    pub fn from_descriptor(location: impl Into<String>, descriptor: FormatDescriptor) -> Self {
        Self { location: location.into(), descriptor }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    /// Read or write standard streams instead of a file.
    pub fn is_stdio(&self) -> bool {
        self.location.is_empty() || self.location == STDIO_LOCATION
    }
}
