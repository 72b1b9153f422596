//! compression/codecs/none.rs
//! Pass-through codec.

use std::io;

use crate::compression::codecs::{DecodeStream, EncodeStream, StreamCompressor, StreamDecompressor};
use crate::compression::registry::{RawSink, RawSource};

impl DecodeStream for RawSource {
    fn raw_mut(&mut self) -> &mut dyn io::Read {
        self.as_mut()
    }
}

impl EncodeStream for RawSink {
    fn finish_stream(self) -> io::Result<RawSink> {
        Ok(self)
    }
}

pub fn decompressor(source: RawSource, chunk_size: usize) -> StreamDecompressor<RawSource> {
    StreamDecompressor::new("none", source, chunk_size)
}

pub fn compressor(sink: RawSink) -> StreamCompressor<RawSink> {
    StreamCompressor::new("none", sink)
}
