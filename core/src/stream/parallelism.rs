//! stream/parallelism.rs
//! Sizing of the encode worker pool and the in-flight window.

use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub worker_count: usize,
    pub max_in_flight: usize,
}

impl ParallelismProfile {
    pub fn single_threaded() -> Self {
        Self { worker_count: 1, max_in_flight: 1 }
    }

    /// One worker per core but one, and as many blocks in flight as
    /// `mem_fraction` of available memory holds at `avg_block_bytes` each,
    /// capped at `hard_cap`. Both are at least 1.
    pub fn dynamic(avg_block_bytes: u64, mem_fraction: f64, hard_cap: usize) -> Self {
        let worker_count = num_cpus::get().saturating_sub(1).max(1);

        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let budget = (sys.available_memory() as f64 * mem_fraction) as u64;
        let blocks = budget / avg_block_bytes.max(1);
        let max_in_flight = blocks.min(hard_cap as u64).max(1) as usize;

        debug!("[POOL] profile workers={} max_in_flight={}", worker_count, max_in_flight);
        Self { worker_count, max_in_flight }
    }
}
