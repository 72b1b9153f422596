//! compression/codecs/lz4.rs
//! LZ4 frame format via lz4_flex.

use std::io;

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::compression::codecs::{DecodeStream, EncodeStream, StreamCompressor, StreamDecompressor};
use crate::compression::registry::{RawSink, RawSource};

impl DecodeStream for FrameDecoder<RawSource> {
    fn raw_mut(&mut self) -> &mut dyn io::Read {
        self.get_mut().as_mut()
    }
}

impl EncodeStream for FrameEncoder<RawSink> {
    fn finish_stream(self) -> io::Result<RawSink> {
        self.finish().map_err(io::Error::from)
    }
}

pub fn decompressor(source: RawSource, chunk_size: usize) -> StreamDecompressor<FrameDecoder<RawSource>> {
    StreamDecompressor::new("lz4", FrameDecoder::new(source), chunk_size)
}

pub fn compressor(sink: RawSink) -> StreamCompressor<FrameEncoder<RawSink>> {
    StreamCompressor::new("lz4", FrameEncoder::new(sink))
}
