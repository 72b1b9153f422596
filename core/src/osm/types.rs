//! osm/types.rs
//! Value types shared by every entity: fixed-point locations, boxes,
//! timestamps, item type codes and the entity-kind filter.

use std::fmt;

use bincode::{Decode, Encode};
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use num_enum::TryFromPrimitive;

/// Coordinates are stored as integers in units of 1e-7 degrees.
pub const COORDINATE_PRECISION: i32 = 10_000_000;

/// A longitude/latitude pair in fixed-point representation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub struct Location {
    x: i32,
    y: i32,
}

impl Location {
    pub const UNDEFINED_COORDINATE: i32 = i32::MAX;

    pub const fn undefined() -> Self {
        Self { x: Self::UNDEFINED_COORDINATE, y: Self::UNDEFINED_COORDINATE }
    }

    pub const fn from_fixed(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self {
            x: degrees_to_fixed(lon),
            y: degrees_to_fixed(lat),
        }
    }

    pub const fn x(&self) -> i32 {
        self.x
    }

    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Longitude in degrees, without checking validity.
    pub fn lon(&self) -> f64 {
        f64::from(self.x) / f64::from(COORDINATE_PRECISION)
    }

    /// Latitude in degrees, without checking validity.
    pub fn lat(&self) -> f64 {
        f64::from(self.y) / f64::from(COORDINATE_PRECISION)
    }

    pub const fn is_defined(&self) -> bool {
        self.x != Self::UNDEFINED_COORDINATE || self.y != Self::UNDEFINED_COORDINATE
    }

    pub const fn is_valid(&self) -> bool {
        self.x >= -180 * COORDINATE_PRECISION
            && self.x <= 180 * COORDINATE_PRECISION
            && self.y >= -90 * COORDINATE_PRECISION
            && self.y <= 90 * COORDINATE_PRECISION
    }

    /// `lon<sep>lat` with trailing zeros removed, e.g. `1.02,1.12`.
    pub fn to_compact(&self, sep: char) -> String {
        format!("{}{}{}", format_coordinate(self.x), sep, format_coordinate(self.y))
    }
}

/// Shortest decimal form of a fixed-point coordinate (at most 7 decimals).
pub fn format_coordinate(value: i32) -> String {
    let precision = COORDINATE_PRECISION as u32;
    let abs = value.unsigned_abs();
    let sign = if value < 0 { "-" } else { "" };
    let whole = abs / precision;
    let frac = abs % precision;
    if frac == 0 {
        return format!("{sign}{whole}");
    }
    let digits = format!("{frac:07}");
    format!("{sign}{whole}.{}", digits.trim_end_matches('0'))
}

impl Default for Location {
    fn default() -> Self {
        Self::undefined()
    }
}

fn degrees_to_fixed(value: f64) -> i32 {
    let scaled = (value * f64::from(COORDINATE_PRECISION)).round();
    if scaled.is_nan() || scaled >= f64::from(i32::MAX) || scaled < f64::from(i32::MIN) {
        Location::UNDEFINED_COORDINATE
    } else {
        scaled as i32
    }
}

/// Axis-aligned bounding box. Unset while either corner is undefined.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct BoundingBox {
    pub bottom_left: Location,
    pub top_right: Location,
}

impl BoundingBox {
    pub const fn new(bottom_left: Location, top_right: Location) -> Self {
        Self { bottom_left, top_right }
    }

    pub const fn is_set(&self) -> bool {
        self.bottom_left.is_defined() && self.top_right.is_defined()
    }

    /// Both corners valid and ordered bottom-left to top-right.
    pub const fn is_valid(&self) -> bool {
        self.is_set()
            && self.bottom_left.is_valid()
            && self.top_right.is_valid()
            && self.bottom_left.x <= self.top_right.x
            && self.bottom_left.y <= self.top_right.y
    }

    /// Grow the box to include `location`. Undefined locations are ignored.
    pub fn extend(&mut self, location: Location) {
        if !location.is_defined() {
            return;
        }
        if !self.is_set() {
            self.bottom_left = location;
            self.top_right = location;
            return;
        }
        self.bottom_left.x = self.bottom_left.x.min(location.x);
        self.bottom_left.y = self.bottom_left.y.min(location.y);
        self.top_right.x = self.top_right.x.max(location.x);
        self.top_right.y = self.top_right.y.max(location.y);
    }
}

/// Seconds since the Unix epoch. Zero means "not set".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    pub const fn seconds(&self) -> i64 {
        self.0
    }

    pub const fn is_set(&self) -> bool {
        self.0 != 0
    }

    /// ISO-8601 form (`2015-01-01T00:00:00Z`), empty when unset.
    pub fn to_iso(&self) -> String {
        if !self.is_set() {
            return String::new();
        }
        DateTime::<Utc>::from_timestamp(self.0, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_default()
    }

    pub fn parse_iso(text: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| Self(dt.timestamp()))
    }
}

impl From<i64> for Timestamp {
    fn from(seconds: i64) -> Self {
        Self(seconds)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entity type codes. The discriminant is the one-letter code used by
/// line-oriented formats.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum ItemType {
    Node      = b'n',
    Way       = b'w',
    Relation  = b'r',
    Changeset = b'c',
}

impl ItemType {
    pub const fn name(self) -> &'static str {
        match self {
            ItemType::Node      => "node",
            ItemType::Way       => "way",
            ItemType::Relation  => "relation",
            ItemType::Changeset => "changeset",
        }
    }

    pub const fn code(self) -> char {
        self as u8 as char
    }

    pub const fn kind(self) -> EntityKinds {
        match self {
            ItemType::Node      => EntityKinds::NODE,
            ItemType::Way       => EntityKinds::WAY,
            ItemType::Relation  => EntityKinds::RELATION,
            ItemType::Changeset => EntityKinds::CHANGESET,
        }
    }
}

// Encoded as the one-letter code rather than the variant index.
impl Encode for ItemType {
    fn encode<E: bincode::enc::Encoder>(&self, encoder: &mut E) -> Result<(), bincode::error::EncodeError> {
        (*self as u8).encode(encoder)
    }
}

impl<Context> Decode<Context> for ItemType {
    fn decode<D: bincode::de::Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, bincode::error::DecodeError> {
        let raw = u8::decode(decoder)?;
        ItemType::try_from_primitive(raw)
            .map_err(|_| bincode::error::DecodeError::Other("unknown item type code"))
    }
}
bincode::impl_borrow_decode!(ItemType);

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Which entity kinds a reader should deliver.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct EntityKinds: u8 {
        const NODE      = 0x01;
        const WAY       = 0x02;
        const RELATION  = 0x04;
        const CHANGESET = 0x08;
        const OBJECT    = Self::NODE.bits() | Self::WAY.bits() | Self::RELATION.bits();
        const ALL       = Self::OBJECT.bits() | Self::CHANGESET.bits();
    }
}

impl EntityKinds {
    /// Header only; every `read()` returns the empty buffer.
    pub const NOTHING: Self = Self::empty();

    pub fn wants(&self, item: ItemType) -> bool {
        self.contains(item.kind())
    }
}

impl Default for EntityKinds {
    fn default() -> Self {
        Self::ALL
    }
}
