//! osm/buffer.rs
//! Immutable batches of decoded entities.
//!
//! An `EntityBuffer` is a contiguous byte region of consecutive
//! bincode-encoded `Entity` records plus the number of records it holds.
//! Buffers move between stages by value; they are never cloned. The
//! zero-length buffer is the end-of-stream sentinel.

use bytes::{BufMut, Bytes, BytesMut};

use crate::format::CodecError;
use crate::osm::object::Entity;
use crate::osm::types::EntityKinds;
use crate::utils::{bincode_config, bincode_decode_config};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EntityBuffer {
    data: Bytes,
    count: usize,
}

impl EntityBuffer {
    /// The end-of-stream sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap bytes produced elsewhere (e.g. an osmb block). The contents are
    /// validated lazily by `iter()`.
    pub fn from_raw(data: Bytes, count: usize) -> Self {
        Self { data, count }
    }

    pub fn from_entities<'a, I>(entities: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        let mut builder = EntityBufferBuilder::new();
        for e in entities {
            builder.push(e)?;
        }
        Ok(builder.finish())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn iter(&self) -> EntityIter<'_> {
        EntityIter { data: &self.data, offset: 0, remaining: self.count, failed: false }
    }

    /// Decode every entity, failing on the first malformed record.
    pub fn entities(&self) -> Result<Vec<Entity>, CodecError> {
        self.iter().collect()
    }

    /// Fails unless the data holds exactly `len()` well-formed entities.
    pub fn validate(&self) -> Result<(), CodecError> {
        self.iter().try_for_each(|e| e.map(drop))
    }

    /// Re-pack only the entities whose kind is in `kinds`. Every record is
    /// decoded either way, so a bad buffer fails here.
    pub fn filtered(self, kinds: EntityKinds) -> Result<Self, CodecError> {
        if kinds.contains(EntityKinds::ALL) {
            self.validate()?;
            return Ok(self);
        }
        let mut builder = EntityBufferBuilder::new();
        for e in self.iter() {
            let e = e?;
            if kinds.contains(e.kind()) {
                builder.push(&e)?;
            }
        }
        Ok(builder.finish())
    }
}

/// Lazily decodes entities. Yields exactly `count` items, then reports
/// trailing bytes as malformed; stops after the first error.
pub struct EntityIter<'a> {
    data: &'a [u8],
    offset: usize,
    remaining: usize,
    failed: bool,
}

impl<'a> Iterator for EntityIter<'a> {
    type Item = Result<Entity, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.remaining == 0 {
            if self.offset < self.data.len() {
                self.failed = true;
                return Some(Err(CodecError::Entity(format!(
                    "{} trailing bytes after last entity",
                    self.data.len() - self.offset
                ))));
            }
            return None;
        }
        match bincode::decode_from_slice::<Entity, _>(&self.data[self.offset..], bincode_decode_config()) {
            Ok((entity, used)) => {
                self.offset += used;
                self.remaining -= 1;
                Some(Ok(entity))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(CodecError::Entity(e.to_string())))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.remaining + 1))
        }
    }
}

/// Appends entities into a fresh buffer.
#[derive(Default)]
pub struct EntityBufferBuilder {
    data: BytesMut,
    count: usize,
}

impl EntityBufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: &Entity) -> Result<(), CodecError> {
        let mut w = (&mut self.data).writer();
        bincode::encode_into_std_write(entity, &mut w, bincode_config())
            .map_err(|e| CodecError::Entity(e.to_string()))?;
        self.count += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn finish(self) -> EntityBuffer {
        EntityBuffer { data: self.data.freeze(), count: self.count }
    }
}
