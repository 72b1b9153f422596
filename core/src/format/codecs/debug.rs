//! format/codecs/debug.rs
//! Human-readable diagnostic output with inline structural warnings.
//!
//! Options:
//! - `add_metadata` (default on, disabled only by `false`): version,
//!   changeset, timestamp and user lines.
//! - `color` (off unless `true`): ANSI colour escapes.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::constants::way_limits::{MAX_NODES, MIN_NODES};
use crate::format::descriptor::FormatDescriptor;
use crate::format::types::{CodecError, OutputFormat};
use crate::osm::{
    BoundingBox, Changeset, Entity, EntityBuffer, Header, ItemType, Location, Node, ObjectMeta,
    Relation, TagList, Way,
};
use crate::utils::decimal_width;

const COLOR_BOLD: &str = "\x1b[1m";
const COLOR_RED: &str = "\x1b[31m";
const COLOR_BLUE: &str = "\x1b[34m";
const COLOR_CYAN: &str = "\x1b[36m";
const COLOR_WHITE: &str = "\x1b[37m";
const COLOR_RESET: &str = "\x1b[0m";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DebugOptions {
    pub add_metadata: bool,
    pub use_color: bool,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self { add_metadata: true, use_color: false }
    }
}

impl DebugOptions {
    pub fn from_descriptor(descriptor: &FormatDescriptor) -> Self {
        Self {
            add_metadata: descriptor.get("add_metadata") != Some("false"),
            use_color: descriptor.get("color") == Some("true"),
        }
    }
}

/// Code points passed through verbatim; everything else is escaped.
fn is_printable(c: char) -> bool {
    matches!(u32::from(c),
        0x0020..=0x0021
        | 0x0023..=0x003b
        | 0x003d
        | 0x003f..=0x007e
        | 0x00a1..=0x00ac
        | 0x00ae..=0x05ff)
}

#[derive(Debug)]
pub struct DebugEncoder {
    options: DebugOptions,
}

impl DebugEncoder {
    pub fn new(options: DebugOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> DebugOptions {
        self.options
    }
}

pub fn create_encoder(descriptor: &FormatDescriptor) -> Result<Arc<dyn OutputFormat>, CodecError> {
    Ok(Arc::new(DebugEncoder::new(DebugOptions::from_descriptor(descriptor))))
}

impl OutputFormat for DebugEncoder {
    fn encode_header(&self, header: &Header) -> Result<Vec<u8>, CodecError> {
        let mut w = BlockWriter::new(self.options);
        w.color(COLOR_BOLD);
        w.out.push_str("header\n");
        w.color(COLOR_RESET);

        w.fieldname("multiple object versions");
        w.out.push_str(if header.multiple_object_versions { "yes" } else { "no" });
        w.out.push('\n');

        w.fieldname("bounding boxes");
        w.out.push('\n');
        for bbox in &header.boxes {
            w.out.push_str("    ");
            w.out.push_str(&corner_text(bbox.bottom_left));
            w.out.push(' ');
            w.out.push_str(&corner_text(bbox.top_right));
            w.out.push('\n');
        }

        w.fieldname("options");
        w.out.push('\n');
        for (key, value) in header.options() {
            let _ = writeln!(w.out, "    {key} = {value}");
        }
        w.out.push_str("\n=============================================\n\n");
        Ok(w.out.into_bytes())
    }

    fn encode_block(&self, buffer: EntityBuffer) -> Result<Vec<u8>, CodecError> {
        let mut w = BlockWriter::new(self.options);
        for entity in buffer.iter() {
            match entity? {
                Entity::Node(n)      => w.node(&n),
                Entity::Way(way)     => w.way(&way),
                Entity::Relation(r)  => w.relation(&r),
                Entity::Changeset(c) => w.changeset(&c),
            }
        }
        Ok(w.out.into_bytes())
    }
}

fn corner_text(location: Location) -> String {
    if location.is_defined() {
        location.to_compact(',')
    } else {
        "undefined".to_string()
    }
}

/// Renders one block. `fmt::Write` into a `String` cannot fail, so write
/// results are discarded.
struct BlockWriter {
    options: DebugOptions,
    out: String,
}

impl BlockWriter {
    fn new(options: DebugOptions) -> Self {
        Self { options, out: String::new() }
    }

    fn color(&mut self, code: &str) {
        if self.options.use_color {
            self.out.push_str(code);
        }
    }

    fn encoded(&mut self, text: &str) {
        for c in text.chars() {
            if is_printable(c) {
                self.out.push(c);
            } else {
                self.color(COLOR_RED);
                let _ = write!(self.out, "<U+{:04X}>", u32::from(c));
                self.color(COLOR_BLUE);
            }
        }
    }

    fn string(&mut self, text: &str) {
        self.out.push('"');
        self.color(COLOR_BLUE);
        self.encoded(text);
        self.color(COLOR_RESET);
        self.out.push('"');
    }

    fn object_type(&mut self, name: &str, visible: bool) {
        self.color(if visible { COLOR_BOLD } else { COLOR_WHITE });
        self.out.push_str(name);
        self.color(COLOR_RESET);
        self.out.push(' ');
    }

    fn fieldname(&mut self, name: &str) {
        self.out.push_str("  ");
        self.color(COLOR_CYAN);
        self.out.push_str(name);
        self.color(COLOR_RESET);
        self.out.push_str(": ");
    }

    fn comment_field(&mut self, name: &str) {
        self.color(COLOR_CYAN);
        self.out.push_str(name);
        self.color(COLOR_RESET);
        self.out.push_str(": ");
    }

    fn counter(&mut self, width: usize, n: usize) {
        self.color(COLOR_WHITE);
        let _ = write!(self.out, "    {n:0width$}: ");
        self.color(COLOR_RESET);
    }

    fn error(&mut self, msg: &str) {
        self.color(COLOR_RED);
        self.out.push_str(msg);
        self.color(COLOR_RESET);
    }

    fn meta(&mut self, meta: &ObjectMeta) {
        let _ = writeln!(self.out, "{}", meta.id);
        if !self.options.add_metadata {
            return;
        }
        self.fieldname("version");
        let _ = write!(self.out, "  {}", meta.version);
        if meta.visible {
            self.out.push_str(" visible\n");
        } else {
            self.error(" deleted\n");
        }
        self.fieldname("changeset");
        let _ = writeln!(self.out, "{}", meta.changeset);
        self.fieldname("timestamp");
        self.out.push_str(&meta.timestamp.to_iso());
        let _ = writeln!(self.out, " ({})", meta.timestamp);
        self.fieldname("user");
        let _ = write!(self.out, "     {} ", meta.uid);
        self.string(&meta.user);
        self.out.push('\n');
    }

    fn tags(&mut self, tags: &TagList, padding: &str) {
        if tags.is_empty() {
            return;
        }
        self.fieldname("tags");
        self.out.push_str(padding);
        let _ = writeln!(self.out, "     {}", tags.len());

        let max = tags.iter().map(|t| t.key.len()).max().unwrap_or(0);
        for tag in tags {
            self.out.push_str("    ");
            self.string(&tag.key);
            for _ in tag.key.len()..max {
                self.out.push(' ');
            }
            self.out.push_str(" = ");
            self.string(&tag.value);
            self.out.push('\n');
        }
    }

    fn location(&mut self, location: Location) {
        self.fieldname("lon/lat");
        let _ = write!(self.out, "  {:.7},{:.7}", location.lon(), location.lat());
        if !location.is_valid() {
            self.error(" INVALID LOCATION!");
        }
        self.out.push('\n');
    }

    fn bbox(&mut self, bbox: &BoundingBox) {
        self.fieldname("box l/b/r/t");
        if !bbox.is_set() {
            self.error("BOX NOT SET!\n");
            return;
        }
        let (bl, tr) = (bbox.bottom_left, bbox.top_right);
        let _ = write!(self.out, "{:.7},{:.7} {:.7},{:.7}", bl.lon(), bl.lat(), tr.lon(), tr.lat());
        if !bbox.is_valid() {
            self.error(" INVALID BOX!");
        }
        self.out.push('\n');
    }

    fn node(&mut self, node: &Node) {
        self.object_type("node", node.meta.visible);
        self.meta(&node.meta);
        if node.meta.visible {
            self.location(node.location);
        }
        self.tags(&node.tags, "");
        self.out.push('\n');
    }

    fn way(&mut self, way: &Way) {
        self.object_type("way", way.meta.visible);
        self.meta(&way.meta);
        self.tags(&way.tags, "");
        self.fieldname("nodes");

        let count = way.nodes.len();
        let _ = write!(self.out, "    {count}");
        if count < MIN_NODES {
            self.error(" LESS THAN 2 NODES!\n");
        } else if count > MAX_NODES {
            self.error(" MORE THAN 2000 NODES!\n");
        } else if way.is_closed() {
            self.out.push_str(" (closed)\n");
        } else {
            self.out.push_str(" (open)\n");
        }

        let width = decimal_width(count);
        for (n, node_ref) in way.nodes.iter().enumerate() {
            self.counter(width, n);
            let _ = write!(self.out, "{:10}", node_ref.reference);
            if node_ref.location.is_valid() {
                let _ = write!(self.out, " ({:.7},{:.7})", node_ref.location.lon(), node_ref.location.lat());
            }
            self.out.push('\n');
        }
        self.out.push('\n');
    }

    fn relation(&mut self, relation: &Relation) {
        self.object_type("relation", relation.meta.visible);
        self.meta(&relation.meta);
        self.tags(&relation.tags, "");
        self.fieldname("members");
        let _ = writeln!(self.out, "  {}", relation.members.len());

        let width = decimal_width(relation.members.len());
        for (n, member) in relation.members.iter().enumerate() {
            self.counter(width, n);
            self.out.push_str(match member.kind {
                ItemType::Node => "node",
                ItemType::Way => "way ",
                ItemType::Relation | ItemType::Changeset => "rel ",
            });
            let _ = write!(self.out, " {:10} ", member.reference);
            self.string(&member.role);
            self.out.push('\n');
        }
        self.out.push('\n');
    }

    fn changeset(&mut self, cs: &Changeset) {
        self.object_type("changeset", true);
        let _ = writeln!(self.out, "{}", cs.id);

        self.fieldname("num changes");
        let _ = write!(self.out, "{}", cs.num_changes);
        if cs.num_changes == 0 {
            self.error(" NO CHANGES!");
        }
        self.out.push('\n');

        self.fieldname("created at");
        self.out.push(' ');
        self.out.push_str(&cs.created_at.to_iso());
        let _ = writeln!(self.out, " ({})", cs.created_at);

        self.fieldname("closed at");
        self.out.push_str("  ");
        match cs.closed_at {
            Some(closed) => {
                self.out.push_str(&closed.to_iso());
                let _ = writeln!(self.out, " ({closed})");
            }
            None => self.error("OPEN!\n"),
        }

        self.fieldname("user");
        let _ = write!(self.out, "       {} ", cs.uid);
        self.string(&cs.user);
        self.out.push('\n');

        self.bbox(&cs.bounds);
        self.tags(&cs.tags, "  ");

        if !cs.comments.is_empty() {
            self.fieldname("comments");
            let _ = writeln!(self.out, "   {}", cs.comments.len());
            let width = decimal_width(cs.comments.len());
            for (n, comment) in cs.comments.iter().enumerate() {
                self.counter(width, n);
                self.comment_field("date");
                self.out.push_str(&comment.date.to_iso());
                let _ = write!(self.out, " ({})\n      {:width$}", comment.date, "");
                self.comment_field("user");
                let _ = write!(self.out, "{} ", comment.uid);
                self.string(&comment.user);
                let _ = write!(self.out, "\n      {:width$}", "");
                self.comment_field("text");
                self.string(&comment.text);
                self.out.push('\n');
            }
        }
        self.out.push('\n');
    }
}
