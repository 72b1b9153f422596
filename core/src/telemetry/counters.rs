//! telemetry/counters.rs
//! Mutable counters collected while a stream is open.
//!
//! Each side owns its counters; the pump reports its totals once, when
//! it is joined.

use bincode::{Decode, Encode};

#[derive(Default, Clone, Debug, Encode, Decode, PartialEq, Eq)]
pub struct TelemetryCounters {
    pub chunks_read: u64,
    pub bytes_read: u64,
    pub buffers_decoded: u64,
    pub entities_decoded: u64,
    pub blocks_encoded: u64,
    pub entities_encoded: u64,
    pub bytes_written: u64,
}

impl TelemetryCounters {
    /// Totals reported by the input pump when it stops.
    pub fn add_pumped(&mut self, chunks: u64, bytes: u64) {
        self.chunks_read += chunks;
        self.bytes_read += bytes;
    }

    /// One non-empty buffer returned by `Reader::read`.
    pub fn add_decoded(&mut self, entities: usize) {
        self.buffers_decoded += 1;
        self.entities_decoded += entities as u64;
    }

    pub fn add_encoded(&mut self, entities: usize) {
        self.blocks_encoded += 1;
        self.entities_encoded += entities as u64;
    }

    pub fn add_written(&mut self, len: usize) {
        self.bytes_written += len as u64;
    }
}
