//! compression/codecs/gzip.rs
//! gzip via flate2. Concatenated members decode as one stream.

use std::io;

use flate2::{read::MultiGzDecoder, write::GzEncoder};

use crate::compression::codecs::{DecodeStream, EncodeStream, StreamCompressor, StreamDecompressor};
use crate::compression::registry::{RawSink, RawSource};

impl DecodeStream for MultiGzDecoder<RawSource> {
    fn raw_mut(&mut self) -> &mut dyn io::Read {
        self.get_mut().as_mut()
    }
}

impl EncodeStream for GzEncoder<RawSink> {
    fn finish_stream(self) -> io::Result<RawSink> {
        self.finish()
    }
}

pub fn decompressor(source: RawSource, chunk_size: usize) -> StreamDecompressor<MultiGzDecoder<RawSource>> {
    StreamDecompressor::new("gzip", MultiGzDecoder::new(source), chunk_size)
}

pub fn compressor(sink: RawSink) -> StreamCompressor<GzEncoder<RawSink>> {
    StreamCompressor::new("gzip", GzEncoder::new(sink, flate2::Compression::default()))
}
