//! constants.rs
//! Stable defaults shared by the input and output sides.

/// Maximum number of raw chunks queued between the input pump and the decoder.
pub const DEFAULT_QUEUE_DEPTH: usize = 10;

/// Size of one read from the decompressor (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Max chunk size sanity bound (32 MiB).
pub const MAX_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Upper bound on entities per decoded buffer for line-oriented formats.
pub const DEFAULT_ENTITIES_PER_BUFFER: usize = 4096;

/// Encode tasks allowed in flight before `submit` starts draining synchronously.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 20;

/// Program spawned to fetch network locations. Receives the URL as its only argument.
pub const DEFAULT_RETRIEVAL_PROGRAM: &str = "curl";

/// Schemes handed to the retrieval program instead of being opened locally.
pub const NETWORK_SCHEMES: &[&str] = &["http", "https", "ftp", "file"];

/// Location meaning stdin (input) or stdout (output).
pub const STDIO_LOCATION: &str = "-";

/// Way size limits flagged by the debug format.
pub mod way_limits {
    pub const MIN_NODES: usize = 2;
    pub const MAX_NODES: usize = 2000;
}

/// Stable format identifiers for the builtin codecs.
pub mod format_ids {
    pub const DEBUG: &str = "debug";
    pub const OPL: &str = "opl";
    pub const OSMB: &str = "osmb";
}

/// Magic number for the osmb block format.
pub const MAGIC_OSMB: [u8; 4] = *b"OSMB";
pub const OSMB_VERSION: u16 = 1;

/// Largest osmb header or block payload accepted by the decoder (256 MiB).
pub const MAX_OSMB_BLOCK: usize = 256 * 1024 * 1024;

/// Longest OPL line accepted by the decoder, newline included (16 MiB).
pub const MAX_OPL_LINE: usize = 16 * 1024 * 1024;
