//! compression/codecs/mod.rs
//! Generic stream adapters plus one module per compression.
//!
//! Every codec is a `Read` (or `Write`) wrapper around the raw source (or
//! sink). `StreamDecompressor` and `StreamCompressor` turn those wrappers
//! into the `Decompressor` / `Compressor` capability.

pub mod gzip;
pub mod lz4;
pub mod none;
pub mod zstd;

use std::io::{self, Read, Write};

use crate::compression::registry::RawSink;
use crate::compression::types::{CompressionError, Compressor, Decompressor};

/// A decoding reader that can hand out its undecoded source.
pub trait DecodeStream: Read + Send {
    fn raw_mut(&mut self) -> &mut dyn Read;
}

/// An encoding writer that can finish its frame and return the sink.
pub trait EncodeStream: Write + Send {
    fn finish_stream(self) -> io::Result<RawSink>;
}

pub struct StreamDecompressor<D> {
    codec: &'static str,
    inner: Option<D>,
    buf: Vec<u8>,
}

impl<D: DecodeStream> StreamDecompressor<D> {
    pub fn new(codec: &'static str, inner: D, chunk_size: usize) -> Self {
        Self { codec, inner: Some(inner), buf: vec![0u8; chunk_size] }
    }
}

impl<D: DecodeStream> Decompressor for StreamDecompressor<D> {
    fn read(&mut self) -> Result<Vec<u8>, CompressionError> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };
        loop {
            match inner.read(&mut self.buf) {
                Ok(n) => return Ok(self.buf[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(CompressionError::CodecProcessFailed { codec: self.codec, source: e })
                }
            }
        }
    }

    fn drain(&mut self) -> Result<u64, CompressionError> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(0);
        };
        io::copy(inner.raw_mut(), &mut io::sink())
            .map_err(|e| CompressionError::CodecProcessFailed { codec: self.codec, source: e })
    }

    fn close(&mut self) -> Result<(), CompressionError> {
        self.inner = None;
        Ok(())
    }
}

pub struct StreamCompressor<E> {
    codec: &'static str,
    inner: Option<E>,
}

impl<E: EncodeStream> StreamCompressor<E> {
    pub fn new(codec: &'static str, inner: E) -> Self {
        Self { codec, inner: Some(inner) }
    }
}

impl<E: EncodeStream> Compressor for StreamCompressor<E> {
    fn write(&mut self, data: &[u8]) -> Result<(), CompressionError> {
        let inner = self
            .inner
            .as_mut()
            .ok_or(CompressionError::StateError("write after close"))?;
        inner
            .write_all(data)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: self.codec, source: e })
    }

    fn close(&mut self) -> Result<(), CompressionError> {
        let Some(inner) = self.inner.take() else {
            return Ok(());
        };
        let mut sink = inner
            .finish_stream()
            .map_err(|e| CompressionError::CodecProcessFailed { codec: self.codec, source: e })?;
        sink.flush()
            .map_err(|e| CompressionError::CodecProcessFailed { codec: self.codec, source: e })
    }
}
