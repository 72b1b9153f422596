//! stream/io.rs
//! Byte sources, the queue-backed reader used by decoders, and sinks.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Cursor, Read, Write};
use std::process::ChildStdout;
use std::sync::{Arc, Mutex};

use bytes::{Buf, Bytes};
use crossbeam::channel::Receiver;

use crate::compression::{RawSink, RawSource};
use crate::constants::STDIO_LOCATION;
use crate::types::StreamError;

/// Readable end of a resolved location.
pub enum ByteSource {
    File(File),
    Stdin(io::Stdin),
    /// Standard output of a retrieval subprocess.
    Pipe(ChildStdout),
    Memory(Cursor<Vec<u8>>),
}

impl ByteSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ByteSource::File(_) => "file",
            ByteSource::Stdin(_) => "stdin",
            ByteSource::Pipe(_) => "pipe",
            ByteSource::Memory(_) => "memory",
        }
    }

    pub fn into_raw(self) -> RawSource {
        Box::new(self)
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ByteSource::File(f) => f.read(buf),
            ByteSource::Stdin(s) => s.read(buf),
            ByteSource::Pipe(p) => p.read(buf),
            ByteSource::Memory(c) => c.read(buf),
        }
    }
}

/// Consumer end of the raw chunk queue, presented as a `BufRead`.
///
/// An empty chunk marks the end of the stream. If the producer goes away
/// without sending it, reads fail with `BrokenPipe`.
pub struct QueueReader {
    rx: Receiver<Bytes>,
    current: Bytes,
    eof: bool,
}

impl QueueReader {
    pub fn new(rx: Receiver<Bytes>) -> Self {
        Self { rx, current: Bytes::new(), eof: false }
    }

    /// Feed a fixed sequence of chunks; the end marker is appended.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        let (tx, rx) = crossbeam::channel::unbounded();
        for chunk in chunks {
            let chunk: Bytes = chunk.into();
            if !chunk.is_empty() {
                let _ = tx.send(chunk);
            }
        }
        let _ = tx.send(Bytes::new());
        Self::new(rx)
    }

    pub fn is_eof(&self) -> bool {
        self.eof && self.current.is_empty()
    }
}

impl BufRead for QueueReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.current.is_empty() && !self.eof {
            match self.rx.recv() {
                Ok(chunk) if chunk.is_empty() => self.eof = true,
                Ok(chunk) => self.current = chunk,
                Err(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "input pump stopped before end of stream",
                    ))
                }
            }
        }
        Ok(&self.current)
    }

    fn consume(&mut self, amt: usize) {
        self.current.advance(amt.min(self.current.len()));
    }
}

impl Read for QueueReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

/// Open an output location. `""` and `"-"` mean stdout. Existing files
/// are only replaced when `overwrite` is set.
pub fn open_output(location: &str, overwrite: bool) -> Result<RawSink, StreamError> {
    if location.is_empty() || location == STDIO_LOCATION {
        return Ok(Box::new(io::stdout()));
    }
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let file = options
        .open(location)
        .map_err(|e| StreamError::resource(format!("open '{location}' for writing"), e))?;
    Ok(Box::new(io::BufWriter::new(file)))
}

/// In-memory sink whose contents stay reachable after the writer moves
/// into a pipeline.
#[derive(Clone, Default)]
pub struct SharedBufferWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedBufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        match self.buf.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Write for SharedBufferWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .buf
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "shared buffer poisoned"))?;
        guard.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_reader_joins_chunks() {
        let mut r = QueueReader::from_chunks(vec![&b"n1 v1\nn"[..], &b"2 v1\n"[..]]);
        let mut lines = Vec::new();
        let mut line = String::new();
        while r.read_line(&mut line).unwrap() > 0 {
            lines.push(line.clone());
            line.clear();
        }
        assert_eq!(lines, vec!["n1 v1\n", "n2 v1\n"]);
        assert!(r.is_eof());
    }

    #[test]
    fn queue_reader_reports_hangup() {
        let (tx, rx) = crossbeam::channel::bounded::<Bytes>(1);
        tx.send(Bytes::from_static(b"abc")).unwrap();
        drop(tx);
        let mut r = QueueReader::new(rx);
        let mut buf = Vec::new();
        let err = r.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(buf, b"abc");
    }

    #[test]
    fn exclusive_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.opl");
        std::fs::write(&path, b"x").unwrap();
        let location = path.to_str().unwrap();
        let err = open_output(location, false).err().unwrap();
        assert!(err.is_resource());
        assert!(open_output(location, true).is_ok());
    }
}
