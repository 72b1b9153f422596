//! format/codecs/osmb.rs
//! Binary block stream carrying `EntityBuffer` payloads unchanged.
//!
//! Layout (little-endian):
//!
//! ```text
//! [ magic "OSMB" (4) ]
//! [ version (2) ]
//! [ header_len (4) ][ header (bincode) ]
//! repeated:
//!   [ count (4) ][ payload_len (4) ][ payload ][ crc32(payload) (4) ]
//! [ count = 0 ][ payload_len = 0 ]      end of stream
//! ```

use std::io::{self, Read};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

use crate::constants::{format_ids, MAGIC_OSMB, MAX_OSMB_BLOCK, OSMB_VERSION};
use crate::format::descriptor::FormatDescriptor;
use crate::format::types::{CodecError, DecoderContext, InputFormat, OutputFormat};
use crate::osm::{EntityBuffer, EntityKinds, Header};
use crate::stream::io::QueueReader;
use crate::utils::{bincode_config, bincode_decode_config, compute_checksum};

const FORMAT: &str = format_ids::OSMB;

/// End-of-file inside a structure means the stream was cut short.
fn read_err(e: io::Error) -> CodecError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CodecError::Truncated { format: FORMAT }
    } else {
        CodecError::Io(e)
    }
}

fn checked_len(len: u32, what: &str) -> Result<usize, CodecError> {
    let len = len as usize;
    if len > MAX_OSMB_BLOCK {
        return Err(CodecError::malformed(FORMAT, format!("{what} length {len} exceeds {MAX_OSMB_BLOCK}")));
    }
    Ok(len)
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct OsmbEncoder;

pub fn create_encoder(_descriptor: &FormatDescriptor) -> Result<Arc<dyn OutputFormat>, CodecError> {
    Ok(Arc::new(OsmbEncoder))
}

impl OutputFormat for OsmbEncoder {
    fn encode_header(&self, header: &Header) -> Result<Vec<u8>, CodecError> {
        let body = bincode::encode_to_vec(header, bincode_config())
            .map_err(|e| CodecError::Internal(e.to_string()))?;
        let body_len = u32::try_from(body.len())
            .map_err(|_| CodecError::Internal("header too large".into()))?;

        let mut out = Vec::with_capacity(10 + body.len());
        out.extend_from_slice(&MAGIC_OSMB);
        out.write_u16::<LittleEndian>(OSMB_VERSION)?;
        out.write_u32::<LittleEndian>(body_len)?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn encode_block(&self, buffer: EntityBuffer) -> Result<Vec<u8>, CodecError> {
        let count = u32::try_from(buffer.len())
            .map_err(|_| CodecError::Internal("too many entities in block".into()))?;
        let payload = buffer.as_bytes();
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| CodecError::Internal("block too large".into()))?;

        let mut out = Vec::with_capacity(12 + payload.len());
        out.write_u32::<LittleEndian>(count)?;
        out.write_u32::<LittleEndian>(payload_len)?;
        out.extend_from_slice(payload);
        out.write_u32::<LittleEndian>(compute_checksum(payload))?;
        Ok(out)
    }

    fn encode_close(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(8);
        out.write_u32::<LittleEndian>(0)?;
        out.write_u32::<LittleEndian>(0)?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

pub struct OsmbDecoder {
    input: QueueReader,
    read_types: EntityKinds,
    done: bool,
}

pub fn create_decoder(ctx: DecoderContext) -> Result<Box<dyn InputFormat>, CodecError> {
    Ok(Box::new(OsmbDecoder { input: ctx.input, read_types: ctx.read_types, done: false }))
}

impl OsmbDecoder {
    fn read_payload(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
        let mut payload = vec![0u8; len];
        self.input.read_exact(&mut payload).map_err(read_err)?;
        Ok(payload)
    }
}

impl InputFormat for OsmbDecoder {
    fn read_header(&mut self) -> Result<Header, CodecError> {
        let mut magic = [0u8; 4];
        self.input.read_exact(&mut magic).map_err(read_err)?;
        if magic != MAGIC_OSMB {
            return Err(CodecError::malformed(FORMAT, format!("bad magic {magic:02x?}")));
        }
        let version = self.input.read_u16::<LittleEndian>().map_err(read_err)?;
        if version != OSMB_VERSION {
            return Err(CodecError::malformed(FORMAT, format!("unsupported version {version}")));
        }
        let len = checked_len(self.input.read_u32::<LittleEndian>().map_err(read_err)?, "header")?;
        let body = self.read_payload(len)?;
        let (header, used) = bincode::decode_from_slice::<Header, _>(&body, bincode_decode_config())
            .map_err(|e| CodecError::malformed(FORMAT, format!("header: {e}")))?;
        if used != body.len() {
            return Err(CodecError::malformed(FORMAT, "trailing bytes in header"));
        }
        Ok(header)
    }

    fn next_buffer(&mut self) -> Result<EntityBuffer, CodecError> {
        while !self.done {
            let count = self.input.read_u32::<LittleEndian>().map_err(read_err)?;
            let len = checked_len(self.input.read_u32::<LittleEndian>().map_err(read_err)?, "block")?;
            if count == 0 && len == 0 {
                self.done = true;
                break;
            }
            if count == 0 || len == 0 {
                return Err(CodecError::malformed(FORMAT, format!("block with {count} entities in {len} bytes")));
            }
            let payload = self.read_payload(len)?;
            let expected = self.input.read_u32::<LittleEndian>().map_err(read_err)?;
            let actual = compute_checksum(&payload);
            if expected != actual {
                return Err(CodecError::Checksum { expected, actual });
            }

            let block = EntityBuffer::from_raw(Bytes::from(payload), count as usize)
                .filtered(self.read_types)
                .map_err(|e| CodecError::malformed(FORMAT, format!("block payload: {e}")))?;
            if !block.is_empty() {
                return Ok(block);
            }
        }
        Ok(EntityBuffer::empty())
    }
}
