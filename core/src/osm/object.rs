//! osm/object.rs
//! Entity records: nodes, ways, relations and changesets.

use bincode::{Decode, Encode};

use crate::osm::types::{BoundingBox, EntityKinds, ItemType, Location, Timestamp};

#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Ordered key/value tags.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct TagList {
    tags: Vec<Tag>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.push(Tag { key: key.into(), value: value.into() });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|t| t.key == key).map(|t| t.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = TagList::new();
        for (k, v) in iter {
            list.push(k, v);
        }
        list
    }
}

/// Attributes common to nodes, ways and relations.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct ObjectMeta {
    pub id: i64,
    pub version: u32,
    pub visible: bool,
    pub changeset: u32,
    pub timestamp: Timestamp,
    pub uid: u32,
    pub user: String,
}

impl ObjectMeta {
    pub fn new(id: i64) -> Self {
        Self { id, ..Self::default() }
    }
}

impl Default for ObjectMeta {
    fn default() -> Self {
        Self {
            id: 0,
            version: 0,
            visible: true,
            changeset: 0,
            timestamp: Timestamp::default(),
            uid: 0,
            user: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Node {
    pub meta: ObjectMeta,
    pub location: Location,
    pub tags: TagList,
}

impl Node {
    pub fn new(id: i64, location: Location) -> Self {
        Self { meta: ObjectMeta::new(id), location, tags: TagList::new() }
    }
}

/// Reference from a way to a node, optionally carrying the node location.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct NodeRef {
    pub reference: i64,
    pub location: Location,
}

impl NodeRef {
    pub fn new(reference: i64) -> Self {
        Self { reference, location: Location::undefined() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Way {
    pub meta: ObjectMeta,
    pub tags: TagList,
    pub nodes: Vec<NodeRef>,
}

impl Way {
    pub fn new(id: i64, refs: impl IntoIterator<Item = i64>) -> Self {
        Self {
            meta: ObjectMeta::new(id),
            tags: TagList::new(),
            nodes: refs.into_iter().map(NodeRef::new).collect(),
        }
    }

    /// First and last node reference are the same.
    pub fn is_closed(&self) -> bool {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(first), Some(last)) => first.reference == last.reference,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Member {
    pub kind: ItemType,
    pub reference: i64,
    pub role: String,
}

impl Member {
    pub fn new(kind: ItemType, reference: i64, role: impl Into<String>) -> Self {
        Self { kind, reference, role: role.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Relation {
    pub meta: ObjectMeta,
    pub tags: TagList,
    pub members: Vec<Member>,
}

impl Relation {
    pub fn new(id: i64, members: Vec<Member>) -> Self {
        Self { meta: ObjectMeta::new(id), tags: TagList::new(), members }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct ChangesetComment {
    pub date: Timestamp,
    pub uid: u32,
    pub user: String,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Changeset {
    pub id: u32,
    pub num_changes: u32,
    pub created_at: Timestamp,
    /// `None` while the changeset is still open.
    pub closed_at: Option<Timestamp>,
    pub uid: u32,
    pub user: String,
    pub bounds: BoundingBox,
    pub tags: TagList,
    pub comments: Vec<ChangesetComment>,
}

impl Changeset {
    pub fn new(id: u32) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// One decoded record of any kind.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Entity {
    Node(Node),
    Way(Way),
    Relation(Relation),
    Changeset(Changeset),
}

impl Entity {
    pub fn item_type(&self) -> ItemType {
        match self {
            Entity::Node(_)      => ItemType::Node,
            Entity::Way(_)       => ItemType::Way,
            Entity::Relation(_)  => ItemType::Relation,
            Entity::Changeset(_) => ItemType::Changeset,
        }
    }

    pub fn kind(&self) -> EntityKinds {
        self.item_type().kind()
    }

    pub fn id(&self) -> i64 {
        match self {
            Entity::Node(n)      => n.meta.id,
            Entity::Way(w)       => w.meta.id,
            Entity::Relation(r)  => r.meta.id,
            Entity::Changeset(c) => i64::from(c.id),
        }
    }

    /// Shared metadata, absent for changesets.
    pub fn meta(&self) -> Option<&ObjectMeta> {
        match self {
            Entity::Node(n)      => Some(&n.meta),
            Entity::Way(w)       => Some(&w.meta),
            Entity::Relation(r)  => Some(&r.meta),
            Entity::Changeset(_) => None,
        }
    }
}

impl From<Node> for Entity {
    fn from(n: Node) -> Self {
        Entity::Node(n)
    }
}

impl From<Way> for Entity {
    fn from(w: Way) -> Self {
        Entity::Way(w)
    }
}

impl From<Relation> for Entity {
    fn from(r: Relation) -> Self {
        Entity::Relation(r)
    }
}

impl From<Changeset> for Entity {
    fn from(c: Changeset) -> Self {
        Entity::Changeset(c)
    }
}
