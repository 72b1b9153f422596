//! compression/codecs/zstd.rs
//! Zstandard streaming encoder/decoder.

use std::io::{self, BufReader};

use crate::compression::codecs::{DecodeStream, EncodeStream, StreamCompressor, StreamDecompressor};
use crate::compression::registry::{RawSink, RawSource};
use crate::compression::types::CompressionError;

/// Balanced default level.
pub const DEFAULT_LEVEL_ZSTD: i32 = 6;

type ZstdReader = zstd::stream::read::Decoder<'static, BufReader<RawSource>>;
type ZstdWriter = zstd::stream::write::Encoder<'static, RawSink>;

impl DecodeStream for ZstdReader {
    fn raw_mut(&mut self) -> &mut dyn io::Read {
        self.get_mut()
    }
}

impl EncodeStream for ZstdWriter {
    fn finish_stream(self) -> io::Result<RawSink> {
        self.finish()
    }
}

pub fn decompressor(source: RawSource, chunk_size: usize)
    -> Result<StreamDecompressor<ZstdReader>, CompressionError>
{
    let decoder = zstd::stream::read::Decoder::new(source)
        .map_err(|e| CompressionError::CodecInitFailed { codec: "zstd", source: e })?;
    Ok(StreamDecompressor::new("zstd", decoder, chunk_size))
}

pub fn compressor(sink: RawSink) -> Result<StreamCompressor<ZstdWriter>, CompressionError> {
    let encoder = zstd::stream::write::Encoder::new(sink, DEFAULT_LEVEL_ZSTD)
        .map_err(|e| CompressionError::CodecInitFailed { codec: "zstd", source: e })?;
    Ok(StreamCompressor::new("zstd", encoder))
}
