//! telemetry/snapshot.rs
//! Immutable view of a finished (or in-progress) stream.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub chunks_read: u64,
    pub bytes_read: u64,
    pub buffers_decoded: u64,
    pub entities_decoded: u64,
    pub blocks_encoded: u64,
    pub entities_encoded: u64,
    pub bytes_written: u64,
    pub throughput_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    /// Throughput counts raw input bytes for readers and sink bytes for
    /// writers, whichever side moved data.
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();
        let moved = counters.bytes_read.max(counters.bytes_written);
        let throughput = if elapsed.as_secs_f64() > 0.0 {
            moved as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            chunks_read: counters.chunks_read,
            bytes_read: counters.bytes_read,
            buffers_decoded: counters.buffers_decoded,
            entities_decoded: counters.entities_decoded,
            blocks_encoded: counters.blocks_encoded,
            entities_encoded: counters.entities_encoded,
            bytes_written: counters.bytes_written,
            throughput_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
