//! stream/resolver.rs
//! Turns a location string into an open byte source.

use std::fs::File;
use std::io;

use log::debug;

use crate::constants::{DEFAULT_RETRIEVAL_PROGRAM, NETWORK_SCHEMES, STDIO_LOCATION};
use crate::format::ConfigError;
use crate::stream::io::ByteSource;
use crate::stream::subprocess::SubprocessHandle;
use crate::types::StreamError;
use crate::utils::url_scheme;

/// An open source, plus the retrieval process feeding it when there is one.
pub struct ResolvedSource {
    pub source: ByteSource,
    pub subprocess: Option<SubprocessHandle>,
}

#[derive(Debug, Clone)]
pub struct SourceResolver {
    retrieval_program: String,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIEVAL_PROGRAM)
    }
}

impl SourceResolver {
    pub fn new(retrieval_program: impl Into<String>) -> Self {
        Self { retrieval_program: retrieval_program.into() }
    }

    pub fn is_network(location: &str) -> bool {
        url_scheme(location)
            .map(|s| NETWORK_SCHEMES.iter().any(|n| n.eq_ignore_ascii_case(s)))
            .unwrap_or(false)
    }

    /// - `""` / `"-"`: stdin.
    /// - network scheme: spawn `[retrieval_program, location]` and read its stdout.
    /// - any other `scheme://`: configuration error.
    /// - otherwise: open as a local file.
    pub fn resolve(&self, location: &str) -> Result<ResolvedSource, StreamError> {
        if location.is_empty() || location == STDIO_LOCATION {
            return Ok(ResolvedSource { source: ByteSource::Stdin(io::stdin()), subprocess: None });
        }

        if let Some(scheme) = url_scheme(location) {
            if !Self::is_network(location) {
                return Err(ConfigError::UnknownScheme {
                    scheme: scheme.to_string(),
                    location: location.to_string(),
                }
                .into());
            }
            let mut handle = SubprocessHandle::spawn(&self.retrieval_program, &[location])?;
            let stdout = handle.take_stdout().ok_or_else(|| {
                StreamError::resource(
                    format!("pipe from '{}'", self.retrieval_program),
                    io::Error::new(io::ErrorKind::BrokenPipe, "child has no stdout"),
                )
            })?;
            debug!("[RESOLVER] {} via {}", location, self.retrieval_program);
            return Ok(ResolvedSource { source: ByteSource::Pipe(stdout), subprocess: Some(handle) });
        }

        let file = File::open(location)
            .map_err(|e| StreamError::resource(format!("open '{location}'"), e))?;
        debug!("[RESOLVER] {} as local file", location);
        Ok(ResolvedSource { source: ByteSource::File(file), subprocess: None })
    }
}
