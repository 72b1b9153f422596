//! stream/reader.rs
//! Open/read/close lifecycle over one input location.
//!
//! ```text
//! Unopened --open()--> Opened --read()--> Reading --close()--> Closed
//!     \___________________\__________________________/
//!                          close() from any state
//! ```
//!
//! `open` resolves the location, starts the input pump and decodes the
//! header on the caller's thread. `read` decodes one more buffer from the
//! queue. `close` stops the pump and reaps the retrieval process; a bad
//! exit status is reported there, after the entities were delivered.

use std::fmt;
use std::io;
use std::time::Instant;

use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver};
use log::{debug, error, trace};

use crate::compression::create_decompressor;
use crate::config::ReaderConfig;
use crate::format::registry::{global, DecoderFactory, Registries};
use crate::format::{CodecError, DecoderContext, FileSpec, FormatDescriptor, InputFormat};
use crate::osm::{EntityBuffer, EntityKinds, Header};
use crate::stream::io::{ByteSource, QueueReader};
use crate::stream::pump::{InputPump, PumpStats};
use crate::stream::resolver::{ResolvedSource, SourceResolver};
use crate::stream::subprocess::SubprocessHandle;
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::StreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unopened,
    Opened,
    Reading,
    Closed,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReaderState::Unopened => "unopened",
            ReaderState::Opened => "opened",
            ReaderState::Reading => "reading",
            ReaderState::Closed => "closed",
        })
    }
}

pub struct Reader {
    file: FileSpec,
    config: ReaderConfig,
    factory: DecoderFactory,
    state: ReaderState,
    read_types: EntityKinds,
    /// Source supplied up front instead of resolving `file`.
    preset: Option<ByteSource>,
    decoder: Option<Box<dyn InputFormat>>,
    queue: Option<Receiver<Bytes>>,
    pump: Option<InputPump>,
    subprocess: Option<SubprocessHandle>,
    header: Option<Header>,
    exhausted: bool,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl Reader {
    /// Reader using the process-wide codec registry. Fails on invalid
    /// settings or a format with no registered decoder.
    pub fn new(file: FileSpec, config: ReaderConfig) -> Result<Self, StreamError> {
        Self::with_registry(file, config, global()?)
    }

    pub fn with_registry(
        file: FileSpec,
        config: ReaderConfig,
        registries: &Registries,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let factory = registries.decoders.lookup(file.descriptor().format())?;
        Ok(Self {
            file,
            config,
            factory,
            state: ReaderState::Unopened,
            read_types: EntityKinds::ALL,
            preset: None,
            decoder: None,
            queue: None,
            pump: None,
            subprocess: None,
            header: None,
            exhausted: false,
            counters: TelemetryCounters::default(),
            timer: TelemetryTimer::new(),
        })
    }

    /// Reader over an already open source, e.g. an in-memory buffer.
    pub fn from_source(
        source: ByteSource,
        descriptor: FormatDescriptor,
        config: ReaderConfig,
    ) -> Result<Self, StreamError> {
        let label = format!("<{}>", source.kind());
        let mut reader =
            Self::with_registry(FileSpec::from_descriptor(label, descriptor), config, global()?)?;
        reader.preset = Some(source);
        Ok(reader)
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn file(&self) -> &FileSpec {
        &self.file
    }

    /// Header decoded by `open`.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Raw chunks currently waiting between the pump and the decoder.
    pub fn queued_chunks(&self) -> usize {
        self.queue.as_ref().map_or(0, Receiver::len)
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(&self.counters, &self.timer)
    }

    /// Start streaming and decode the header. `read_types` selects which
    /// entity kinds `read` delivers; `EntityKinds::NOTHING` reads the
    /// header only.
    pub fn open(&mut self, read_types: EntityKinds) -> Result<Header, StreamError> {
        if self.state != ReaderState::Unopened {
            return Err(StreamError::Pipeline("reader already opened"));
        }
        self.read_types = read_types;

        let resolved = match self.preset.take() {
            Some(source) => ResolvedSource { source, subprocess: None },
            None => SourceResolver::new(self.config.retrieval_program.clone())
                .resolve(self.file.location())?,
        };
        self.state = ReaderState::Opened;
        debug!(
            "[READER] open {} ({} source, format {}, compression {})",
            self.file.location(),
            resolved.source.kind(),
            self.file.descriptor().format(),
            self.file.descriptor().compression()
        );

        match self.start(resolved) {
            Ok(header) => {
                self.header = Some(header.clone());
                Ok(header)
            }
            Err(e) => {
                if let Err(teardown) = self.teardown() {
                    error!("[READER] teardown after failed open: {teardown}");
                }
                Err(e)
            }
        }
    }

    fn start(&mut self, resolved: ResolvedSource) -> Result<Header, StreamError> {
        let ResolvedSource { source, subprocess } = resolved;
        let drain_on_hangup = subprocess.is_some();
        self.subprocess = subprocess;

        let (tx, rx) = bounded::<Bytes>(self.config.queue_depth);
        let decompressor = create_decompressor(
            self.file.descriptor().compression(),
            source.into_raw(),
            self.config.chunk_size,
        )?;
        self.pump = Some(InputPump::spawn(decompressor, tx, drain_on_hangup)?);
        self.queue = Some(rx.clone());

        let ctx = DecoderContext {
            descriptor: self.file.descriptor().clone(),
            read_types: self.read_types,
            input: QueueReader::new(rx),
            batch_size: self.config.entities_per_buffer,
        };
        let mut decoder = (self.factory)(ctx)?;

        let started = Instant::now();
        let header = decoder.read_header();
        self.timer.add_stage_time(Stage::Decode, started.elapsed());
        self.decoder = Some(decoder);
        header.map_err(|e| self.pump_error_or(e))
    }

    /// Next buffer of requested entities. The empty buffer marks the end
    /// of the stream and is returned again on every later call.
    pub fn read(&mut self) -> Result<EntityBuffer, StreamError> {
        match self.state {
            ReaderState::Unopened => return Err(StreamError::Pipeline("read before open")),
            ReaderState::Closed => return Err(StreamError::Pipeline("read after close")),
            ReaderState::Opened | ReaderState::Reading => {}
        }
        if self.read_types == EntityKinds::NOTHING || self.exhausted {
            return Ok(EntityBuffer::empty());
        }
        self.state = ReaderState::Reading;

        let Some(decoder) = self.decoder.as_mut() else {
            return Err(StreamError::Pipeline("reader has no decoder"));
        };
        let started = Instant::now();
        let result = decoder.next_buffer();
        self.timer.add_stage_time(Stage::Decode, started.elapsed());

        match result {
            Ok(buffer) if buffer.is_empty() => {
                debug!("[READER] end of stream after {} entities", self.counters.entities_decoded);
                self.exhausted = true;
                Ok(buffer)
            }
            Ok(buffer) => {
                self.counters.add_decoded(buffer.len());
                trace!("[READER] buffer with {} entities", buffer.len());
                Ok(buffer)
            }
            Err(e) => {
                self.exhausted = true;
                Err(self.pump_error_or(e))
            }
        }
    }

    /// A hangup on the queue means the pump died; its error is the real cause.
    fn pump_error_or(&mut self, err: CodecError) -> StreamError {
        let hangup = matches!(&err, CodecError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe);
        if !hangup {
            return err.into();
        }
        match self.pump.take().map(InputPump::join) {
            Some(Err(pump_err)) => pump_err,
            Some(Ok(stats)) => {
                self.record_pump(&stats);
                err.into()
            }
            None => err.into(),
        }
    }

    fn record_pump(&mut self, stats: &PumpStats) {
        self.counters.add_pumped(stats.chunks, stats.bytes);
        self.timer.add_stage_time(Stage::Decompress, stats.decompress_time);
    }

    /// Stop the pump, reap the retrieval process and report how it ended.
    /// A second call does nothing.
    pub fn close(&mut self) -> Result<(), StreamError> {
        if self.state == ReaderState::Closed {
            return Ok(());
        }
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), StreamError> {
        self.state = ReaderState::Closed;
        self.preset = None;

        // Hanging up the queue unblocks a pump waiting on a full channel.
        self.decoder = None;
        self.queue = None;

        let pumped = match self.pump.take() {
            Some(pump) => pump.join().map(|stats| self.record_pump(&stats)),
            None => Ok(()),
        };
        let reaped = match self.subprocess.take() {
            Some(process) => process.close(),
            None => Ok(()),
        };
        self.timer.finish();
        debug!(
            "[READER] closed {} ({} chunks, {} entities)",
            self.file.location(),
            self.counters.chunks_read,
            self.counters.entities_decoded
        );
        reaped?;
        pumped
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("[READER] close during drop failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn memory_reader(text: &str) -> Reader {
        let source = ByteSource::Memory(Cursor::new(text.as_bytes().to_vec()));
        let descriptor = FormatDescriptor::parse("opl").unwrap();
        Reader::from_source(source, descriptor, ReaderConfig::default()).unwrap()
    }

    #[test]
    fn lifecycle_states() {
        let mut reader = memory_reader("n1 v1\n");
        assert_eq!(reader.state(), ReaderState::Unopened);
        assert!(reader.read().is_err());
        reader.open(EntityKinds::ALL).unwrap();
        assert_eq!(reader.state(), ReaderState::Opened);
        assert_eq!(reader.read().unwrap().len(), 1);
        assert_eq!(reader.state(), ReaderState::Reading);
        assert!(reader.read().unwrap().is_empty());
        reader.close().unwrap();
        assert_eq!(reader.state(), ReaderState::Closed);
        assert!(reader.read().is_err());
        assert!(reader.open(EntityKinds::ALL).is_err());
    }

    #[test]
    fn close_before_end_of_stream() {
        let text: String = (1..=5000).map(|i| format!("n{i} v1\n")).collect();
        let mut reader = memory_reader(&text);
        reader.open(EntityKinds::ALL).unwrap();
        assert!(!reader.read().unwrap().is_empty());
        reader.close().unwrap();
        reader.close().unwrap();
    }
}
