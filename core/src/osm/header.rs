//! osm/header.rs
//! File-level metadata decoded before the first entity.

use bincode::{Decode, Encode};

use crate::osm::types::BoundingBox;

/// Bounding boxes, the multi-version flag and an ordered option list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Header {
    pub boxes: Vec<BoundingBox>,
    pub multiple_object_versions: bool,
    options: Vec<(String, String)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.options.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn add_box(&mut self, bbox: BoundingBox) {
        self.boxes.push(bbox);
    }

    /// Smallest box covering every set box; unset when there are none.
    pub fn joined_box(&self) -> BoundingBox {
        let mut joined = BoundingBox::default();
        for b in self.boxes.iter().filter(|b| b.is_set()) {
            joined.extend(b.bottom_left);
            joined.extend(b.top_right);
        }
        joined
    }
}
