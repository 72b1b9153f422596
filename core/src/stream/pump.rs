//! stream/pump.rs
//! Background thread moving decompressed chunks into the bounded queue.
//!
//! The queue is a crossbeam `bounded(depth)` channel, so the pump blocks
//! while `depth` chunks are waiting and the consumer blocks while none are.
//! The last chunk sent is always the empty end marker. If the consumer
//! hangs up first the pump stops early, draining the remaining raw input
//! when asked to so a subprocess writing into it can finish.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::Sender;
use log::{debug, trace, warn};

use crate::compression::Decompressor;
use crate::types::StreamError;

/// What the pump moved before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub chunks: u64,
    pub bytes: u64,
    /// Raw bytes skipped after the consumer hung up.
    pub drained: u64,
    pub decompress_time: Duration,
}

pub struct InputPump {
    handle: Option<JoinHandle<Result<PumpStats, StreamError>>>,
}

impl InputPump {
    pub fn spawn(
        decompressor: Box<dyn Decompressor>,
        tx: Sender<Bytes>,
        drain_on_hangup: bool,
    ) -> Result<Self, StreamError> {
        let handle = thread::Builder::new()
            .name("osmio-pump".into())
            .spawn(move || run(decompressor, tx, drain_on_hangup))
            .map_err(|e| StreamError::resource("spawn input pump thread", e))?;
        Ok(Self { handle: Some(handle) })
    }

    /// Wait for the thread. The consumer must have dropped its receiver
    /// or read the end marker first, otherwise this blocks on a full queue.
    pub fn join(mut self) -> Result<PumpStats, StreamError> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<PumpStats, StreamError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StreamError::Pipeline("input pump panicked"))?,
            None => Ok(PumpStats::default()),
        }
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        if let Err(e) = self.join_inner() {
            warn!("[PUMP] dropped with error: {e}");
        }
    }
}

fn run(
    mut decompressor: Box<dyn Decompressor>,
    tx: Sender<Bytes>,
    drain_on_hangup: bool,
) -> Result<PumpStats, StreamError> {
    let mut stats = PumpStats::default();
    let outcome = pump(decompressor.as_mut(), &tx, drain_on_hangup, &mut stats);
    let closed = decompressor.close();
    drop(tx);
    debug!(
        "[PUMP] stopped after {} chunks / {} bytes (drained {})",
        stats.chunks, stats.bytes, stats.drained
    );
    outcome?;
    closed?;
    Ok(stats)
}

fn pump(
    decompressor: &mut dyn Decompressor,
    tx: &Sender<Bytes>,
    drain_on_hangup: bool,
    stats: &mut PumpStats,
) -> Result<(), StreamError> {
    loop {
        let started = Instant::now();
        let chunk = decompressor.read()?;
        stats.decompress_time += started.elapsed();

        let last = chunk.is_empty();
        if !last {
            stats.chunks += 1;
            stats.bytes += chunk.len() as u64;
            trace!("[PUMP] chunk {} ({} bytes)", stats.chunks, chunk.len());
        }

        if tx.send(Bytes::from(chunk)).is_err() {
            debug!("[PUMP] consumer hung up");
            if drain_on_hangup && !last {
                stats.drained = decompressor.drain()?;
            }
            return Ok(());
        }
        if last {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{create_decompressor, Compression};
    use std::io::Cursor;

    fn source(data: &[u8], chunk: usize) -> Box<dyn Decompressor> {
        create_decompressor(Compression::None, Box::new(Cursor::new(data.to_vec())), chunk).unwrap()
    }

    #[test]
    fn sends_all_chunks_then_marker() {
        let (tx, rx) = crossbeam::channel::bounded(2);
        let pump = InputPump::spawn(source(b"abcdefgh", 3), tx, false).unwrap();
        let chunks: Vec<Bytes> = rx.iter().collect();
        assert_eq!(chunks.last().map(|c| c.is_empty()), Some(true));
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined, b"abcdefgh");
        let stats = pump.join().unwrap();
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.bytes, 8);
    }

    #[test]
    fn hangup_drains_remaining_input() {
        let (tx, rx) = crossbeam::channel::bounded(1);
        let pump = InputPump::spawn(source(&[7u8; 1000], 10), tx, true).unwrap();
        let first = rx.recv().unwrap();
        assert_eq!(first.len(), 10);
        drop(rx);
        let stats = pump.join().unwrap();
        assert_eq!(stats.bytes + stats.drained, 1000);
    }
}
