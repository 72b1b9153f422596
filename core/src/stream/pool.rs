//! stream/pool.rs
//! Fixed worker pool for encode tasks, and the per-task completion handle.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, trace};

use crate::constants::DEFAULT_MAX_IN_FLIGHT;
use crate::format::CodecError;
use crate::stream::parallelism::ParallelismProfile;
use crate::types::StreamError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Result of one encode task.
#[derive(Debug)]
pub struct EncodedBlock {
    pub result: Result<Vec<u8>, CodecError>,
    pub encode_time: Duration,
}

/// Completion handle for one submitted task, tagged with its sequence number.
#[derive(Debug)]
pub struct PendingBlock {
    seq: u64,
    rx: Receiver<EncodedBlock>,
}

impl PendingBlock {
    /// Handle that is already resolved, for work done on the caller's thread.
    pub fn ready(seq: u64, result: Result<Vec<u8>, CodecError>) -> Self {
        let (tx, rx) = bounded(1);
        let _ = tx.send(EncodedBlock { result, encode_time: Duration::ZERO });
        Self { seq, rx }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_ready(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Block until the task finishes.
    pub fn wait(self) -> EncodedBlock {
        self.rx.recv().unwrap_or_else(|_| EncodedBlock {
            result: Err(CodecError::Internal(format!("encode task {} was dropped", self.seq))),
            encode_time: Duration::ZERO,
        })
    }
}

pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

static SHARED: OnceLock<Arc<WorkerPool>> = OnceLock::new();

impl WorkerPool {
    pub fn new(worker_count: usize) -> Result<Self, StreamError> {
        let worker_count = worker_count.max(1);
        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("osmio-worker-{i}"))
                .spawn(move || {
                    trace!("[POOL] worker {i} started");
                    for job in rx.iter() {
                        job();
                    }
                    trace!("[POOL] worker {i} finished");
                })
                .map_err(|e| StreamError::resource("spawn worker thread", e))?;
            workers.push(handle);
        }
        debug!("[POOL] started {} workers", worker_count);
        Ok(Self { tx: Some(tx), workers })
    }

    /// Process-wide pool shared by every pipeline that does not bring its own.
    pub fn shared() -> Result<Arc<WorkerPool>, StreamError> {
        if let Some(pool) = SHARED.get() {
            return Ok(pool.clone());
        }
        let profile = ParallelismProfile::dynamic(1 << 20, 0.25, DEFAULT_MAX_IN_FLIGHT);
        let pool = Arc::new(WorkerPool::new(profile.worker_count)?);
        Ok(SHARED.get_or_init(|| pool).clone())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue `task` and return its handle. A panicking task resolves to
    /// `CodecError::Internal`; the worker survives.
    pub fn submit<F>(&self, seq: u64, task: F) -> Result<PendingBlock, StreamError>
    where
        F: FnOnce() -> Result<Vec<u8>, CodecError> + Send + 'static,
    {
        let (done_tx, done_rx) = bounded(1);
        let job: Job = Box::new(move || {
            let started = Instant::now();
            let result = panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|_| {
                error!("[POOL] encode task {seq} panicked");
                Err(CodecError::Internal(format!("encode task {seq} panicked")))
            });
            let _ = done_tx.send(EncodedBlock { result, encode_time: started.elapsed() });
        });
        self.tx
            .as_ref()
            .ok_or(StreamError::Pipeline("worker pool shut down"))?
            .send(job)
            .map_err(|_| StreamError::Pipeline("worker pool shut down"))?;
        Ok(PendingBlock { seq, rx: done_rx })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.tx.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("[POOL] worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panicking_task_resolves_to_error() {
        let pool = WorkerPool::new(1).unwrap();
        let bad = pool.submit(0, || panic!("boom")).unwrap();
        let good = pool.submit(1, || Ok(b"ok".to_vec())).unwrap();
        assert!(matches!(bad.wait().result, Err(CodecError::Internal(_))));
        assert_eq!(good.wait().result.unwrap(), b"ok");
    }

    #[test]
    fn ready_handle() {
        let block = PendingBlock::ready(7, Ok(vec![1, 2]));
        assert_eq!(block.seq(), 7);
        assert!(block.is_ready());
        assert_eq!(block.wait().result.unwrap(), vec![1, 2]);
    }
}
