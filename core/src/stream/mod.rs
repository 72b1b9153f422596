//! stream/mod.rs
//! Threaded input and ordered parallel output.
//!
//! - `resolver` / `subprocess`: turn a location into bytes, spawning the
//!   retrieval program for network schemes.
//! - `pump` / `reader`: one background thread per open reader feeding a
//!   bounded chunk queue, decoded on the caller's thread.
//! - `pool` / `pipeline`: encode blocks on a shared worker pool and write
//!   them in submission order.

pub mod io;
pub mod parallelism;
pub mod pipeline;
pub mod pool;
pub mod pump;
pub mod reader;
pub mod resolver;
pub mod subprocess;

pub use io::{open_output, ByteSource, QueueReader, SharedBufferWriter};
pub use parallelism::ParallelismProfile;
pub use pipeline::OutputPipeline;
pub use pool::{EncodedBlock, PendingBlock, WorkerPool};
pub use pump::{InputPump, PumpStats};
pub use reader::{Reader, ReaderState};
pub use resolver::{ResolvedSource, SourceResolver};
pub use subprocess::SubprocessHandle;
