//! compression/registry.rs
//! Factory functions resolving a `Compression` to an implementation.

use std::io::{Read, Write};

use crate::compression::codecs::{gzip, lz4, none, zstd};
use crate::compression::types::{Compression, CompressionError, Compressor, Decompressor};
use crate::constants::MAX_CHUNK_SIZE;

pub type RawSource = Box<dyn Read + Send>;
pub type RawSink = Box<dyn Write + Send>;

pub fn create_decompressor(kind: Compression, source: RawSource, chunk_size: usize)
    -> Result<Box<dyn Decompressor>, CompressionError>
{
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(CompressionError::ChunkSize { have: chunk_size, max: MAX_CHUNK_SIZE });
    }
    match kind {
        Compression::None => Ok(Box::new(none::decompressor(source, chunk_size))),
        Compression::Gzip => Ok(Box::new(gzip::decompressor(source, chunk_size))),
        Compression::Zstd => Ok(Box::new(zstd::decompressor(source, chunk_size)?)),
        Compression::Lz4  => Ok(Box::new(lz4::decompressor(source, chunk_size))),
    }
}

pub fn create_compressor(kind: Compression, sink: RawSink)
    -> Result<Box<dyn Compressor>, CompressionError>
{
    match kind {
        Compression::None => Ok(Box::new(none::compressor(sink))),
        Compression::Gzip => Ok(Box::new(gzip::compressor(sink))),
        Compression::Zstd => Ok(Box::new(zstd::compressor(sink)?)),
        Compression::Lz4  => Ok(Box::new(lz4::compressor(sink))),
    }
}
