//! stream/pipeline.rs
//! Ordered parallel encoding into one sink.
//!
//! Every block gets a sequence number: 0 is the header, then one per
//! submitted buffer, then the close marker. Entity blocks are encoded on
//! the worker pool; the header and close marker are encoded inline but go
//! through the same delivery list. Only one caller drains at a time and it
//! always takes the front of the list, so sink bytes follow submit order
//! whatever order the workers finish in.
//!
//! Lock order is `sink` before `delivery`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use log::{debug, error, trace};

use crate::compression::{create_compressor, Compressor, RawSink};
use crate::config::WriterConfig;
use crate::format::registry::{global, Registries};
use crate::format::{FileSpec, FormatDescriptor, OutputFormat};
use crate::osm::{EntityBuffer, Header};
use crate::stream::io::open_output;
use crate::stream::pool::{PendingBlock, WorkerPool};
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::StreamError;

struct Queued {
    block: PendingBlock,
    entities: usize,
}

struct Delivery {
    next_seq: u64,
    pending: VecDeque<Queued>,
    closed: bool,
}

struct SinkState {
    compressor: Option<Box<dyn Compressor>>,
    halted: bool,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
    snapshot: Option<TelemetrySnapshot>,
}

pub struct OutputPipeline {
    encoder: Arc<dyn OutputFormat>,
    pool: Arc<WorkerPool>,
    max_in_flight: usize,
    delivery: Mutex<Delivery>,
    sink: Mutex<SinkState>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StreamError> {
    m.lock().map_err(|_| StreamError::Pipeline("output pipeline lock poisoned"))
}

impl OutputPipeline {
    /// Open `file` for writing with the global registry and shared pool,
    /// and write `header`.
    pub fn create(file: &FileSpec, header: &Header, config: WriterConfig) -> Result<Self, StreamError> {
        Self::create_with(file, header, config, global()?, WorkerPool::shared()?)
    }

    pub fn create_with(
        file: &FileSpec,
        header: &Header,
        config: WriterConfig,
        registries: &Registries,
        pool: Arc<WorkerPool>,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        // Resolve the encoder before touching the filesystem.
        let factory = registries.encoders.lookup(file.descriptor().format())?;
        let encoder = factory(file.descriptor())?;
        let sink = open_output(file.location(), config.overwrite)?;
        debug!("[PIPELINE] writing {} as {}", file.location(), file.descriptor().format());
        Self::start(encoder, sink, file.descriptor(), header, config, pool)
    }

    /// Pipeline over a caller-supplied sink.
    pub fn with_sink(
        sink: RawSink,
        descriptor: &FormatDescriptor,
        header: &Header,
        config: WriterConfig,
        registries: &Registries,
        pool: Arc<WorkerPool>,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let factory = registries.encoders.lookup(descriptor.format())?;
        let encoder = factory(descriptor)?;
        Self::start(encoder, sink, descriptor, header, config, pool)
    }

    fn start(
        encoder: Arc<dyn OutputFormat>,
        sink: RawSink,
        descriptor: &FormatDescriptor,
        header: &Header,
        config: WriterConfig,
        pool: Arc<WorkerPool>,
    ) -> Result<Self, StreamError> {
        let compressor = create_compressor(descriptor.compression(), sink)?;
        let header_bytes = encoder.encode_header(header)?;

        let mut pending = VecDeque::new();
        pending.push_back(Queued { block: PendingBlock::ready(0, Ok(header_bytes)), entities: 0 });

        let pipeline = Self {
            encoder,
            pool,
            max_in_flight: config.max_in_flight,
            delivery: Mutex::new(Delivery { next_seq: 1, pending, closed: false }),
            sink: Mutex::new(SinkState {
                compressor: Some(compressor),
                halted: false,
                counters: TelemetryCounters::default(),
                timer: TelemetryTimer::new(),
                snapshot: None,
            }),
        };
        pipeline.drain(0)?;
        Ok(pipeline)
    }

    /// Queue `buffer` for encoding. Returns once the block is queued and
    /// every already-finished block at the front has been written; blocks
    /// on the oldest block while more than `max_in_flight` are pending.
    /// Empty buffers are ignored.
    pub fn submit(&self, buffer: EntityBuffer) -> Result<(), StreamError> {
        if buffer.is_empty() {
            return Ok(());
        }
        {
            let mut delivery = lock(&self.delivery)?;
            if delivery.closed {
                return Err(StreamError::Pipeline("submit after close"));
            }
            let seq = delivery.next_seq;
            let entities = buffer.len();
            let encoder = Arc::clone(&self.encoder);
            let block = self.pool.submit(seq, move || encoder.encode_block(buffer))?;
            delivery.next_seq += 1;
            delivery.pending.push_back(Queued { block, entities });
            trace!("[PIPELINE] submitted block {} ({} entities)", seq, entities);
        }
        self.drain(self.max_in_flight)
    }

    /// Blocks encoded but not yet written.
    pub fn pending(&self) -> usize {
        lock(&self.delivery).map_or(0, |d| d.pending.len())
    }

    /// Write blocks from the front of the list while the front one is
    /// finished or more than `limit` remain.
    fn drain(&self, limit: usize) -> Result<(), StreamError> {
        let mut sink = lock(&self.sink)?;
        if sink.halted {
            return Err(StreamError::Pipeline("output pipeline halted by an earlier error"));
        }
        loop {
            let next = {
                let mut delivery = lock(&self.delivery)?;
                let take = match delivery.pending.front() {
                    Some(front) => front.block.is_ready() || delivery.pending.len() > limit,
                    None => false,
                };
                if take { delivery.pending.pop_front() } else { None }
            };
            let Some(Queued { block, entities }) = next else {
                return Ok(());
            };

            let seq = block.seq();
            let encoded = block.wait();
            sink.timer.add_stage_time(Stage::Encode, encoded.encode_time);
            let bytes = match encoded.result {
                Ok(bytes) => bytes,
                Err(e) => {
                    sink.halted = true;
                    error!("[PIPELINE] block {seq} failed to encode: {e}");
                    return Err(e.into());
                }
            };
            if entities > 0 {
                sink.counters.add_encoded(entities);
            }
            if bytes.is_empty() {
                continue;
            }

            let started = Instant::now();
            let written = match sink.compressor.as_mut() {
                Some(c) => c.write(&bytes),
                None => return Err(StreamError::Pipeline("sink already closed")),
            };
            sink.timer.add_stage_time(Stage::Write, started.elapsed());
            if let Err(e) = written {
                sink.halted = true;
                error!("[PIPELINE] write of block {seq} failed: {e}");
                return Err(e.into());
            }
            sink.counters.add_written(bytes.len());
            trace!("[PIPELINE] wrote block {} ({} bytes)", seq, bytes.len());
        }
    }

    /// Write the close marker, flush everything and close the sink.
    /// Later calls return the same snapshot.
    pub fn close(&self) -> Result<TelemetrySnapshot, StreamError> {
        if let Some(snapshot) = lock(&self.sink)?.snapshot.clone() {
            return Ok(snapshot);
        }
        {
            let mut delivery = lock(&self.delivery)?;
            if !delivery.closed {
                delivery.closed = true;
                let seq = delivery.next_seq;
                delivery.next_seq += 1;
                let trailer = self.encoder.encode_close();
                delivery.pending.push_back(Queued { block: PendingBlock::ready(seq, trailer), entities: 0 });
            }
        }
        let drained = self.drain(0);

        let mut sink = lock(&self.sink)?;
        if let Some(snapshot) = sink.snapshot.clone() {
            return Ok(snapshot);
        }
        let closed = match sink.compressor.take() {
            Some(mut c) => c.close().map_err(StreamError::from),
            None => Ok(()),
        };
        sink.timer.finish();
        let snapshot = TelemetrySnapshot::from(&sink.counters, &sink.timer);
        sink.snapshot = Some(snapshot.clone());
        debug!(
            "[PIPELINE] closed after {} blocks / {} bytes",
            snapshot.blocks_encoded, snapshot.bytes_written
        );
        drained?;
        closed?;
        Ok(snapshot)
    }
}

impl Drop for OutputPipeline {
    fn drop(&mut self) {
        let open = lock(&self.sink).map(|s| s.snapshot.is_none()).unwrap_or(false);
        if open {
            if let Err(e) = self.close() {
                error!("[PIPELINE] close during drop failed: {e}");
            }
        }
    }
}
