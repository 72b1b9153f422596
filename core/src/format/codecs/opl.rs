//! format/codecs/opl.rs
//! Object-per-line text format.
//!
//! One entity per line, space separated fields, each field a one-letter
//! key followed by its value:
//!
//! ```text
//! n110000 v1 dV c5 t2015-01-01T00:00:00Z i1 utest T x1.02 y1.12
//! w110800 v1 dV c5 t2015-01-01T00:00:00Z i1 utest Ttest:id=110 Nn110000,n110001
//! r1 v1 dV c0 t i0 u T Mn1@stop,w2@
//! c7 k3 s2015-01-01T00:00:00Z e i1 utest x1 y1 X2 Y2 Tcomment=fix
//! ```
//!
//! Characters that would break the line structure are written as
//! `%<hex code point>%`. The format has no header.

use std::fmt::Write as _;
use std::io::{BufRead, Read};
use std::sync::Arc;

use crate::constants::{format_ids, MAX_OPL_LINE};
use crate::format::descriptor::FormatDescriptor;
use crate::format::types::{CodecError, DecoderContext, InputFormat, OutputFormat};
use crate::osm::{
    Changeset, Entity, EntityBuffer, EntityBufferBuilder, EntityKinds, Header, ItemType, Location,
    Member, Node, NodeRef, ObjectMeta, Relation, TagList, Timestamp, Way, format_coordinate,
};
use crate::stream::io::QueueReader;
use crate::utils::enum_name_or_hex;
use num_enum::TryFromPrimitive;

const FORMAT: &str = format_ids::OPL;

fn needs_escape(c: char) -> bool {
    c.is_control() || c.is_whitespace() || matches!(c, '%' | ',' | '=' | '@')
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        if needs_escape(c) {
            let _ = write!(out, "%{:x}%", u32::from(c));
        } else {
            out.push(c);
        }
    }
}

fn unescape(text: &str, line: usize) -> Result<String, CodecError> {
    if !text.contains('%') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('%')
            .ok_or_else(|| CodecError::malformed(FORMAT, format!("line {line}: unterminated escape")))?;
        let c = u32::from_str_radix(&after[..end], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| CodecError::malformed(FORMAT, format!("line {line}: bad escape '%{}%'", &after[..end])))?;
        out.push(c);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct OplEncoder {
    add_metadata: bool,
}

pub fn create_encoder(descriptor: &FormatDescriptor) -> Result<Arc<dyn OutputFormat>, CodecError> {
    Ok(Arc::new(OplEncoder { add_metadata: descriptor.get("add_metadata") != Some("false") }))
}

impl OplEncoder {
    fn meta(&self, out: &mut String, code: char, meta: &ObjectMeta) {
        let _ = write!(out, "{code}{}", meta.id);
        if self.add_metadata {
            let _ = write!(
                out,
                " v{} d{} c{} t{} i{} u",
                meta.version,
                if meta.visible { 'V' } else { 'D' },
                meta.changeset,
                meta.timestamp.to_iso(),
                meta.uid
            );
            escape_into(out, &meta.user);
        }
    }

    fn entity(&self, out: &mut String, entity: &Entity) {
        match entity {
            Entity::Node(n) => {
                self.meta(out, 'n', &n.meta);
                tags(out, &n.tags);
                location(out, n.location);
            }
            Entity::Way(w) => {
                self.meta(out, 'w', &w.meta);
                tags(out, &w.tags);
                out.push_str(" N");
                for (i, nr) in w.nodes.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "n{}", nr.reference);
                    if nr.location.is_defined() {
                        let _ = write!(out, "x{}", nr.location.to_compact('y'));
                    }
                }
            }
            Entity::Relation(r) => {
                self.meta(out, 'r', &r.meta);
                tags(out, &r.tags);
                out.push_str(" M");
                for (i, m) in r.members.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{}{}@", m.kind.code(), m.reference);
                    escape_into(out, &m.role);
                }
            }
            Entity::Changeset(c) => {
                let _ = write!(
                    out,
                    "c{} k{} s{} e{} d{} i{} u",
                    c.id,
                    c.num_changes,
                    c.created_at.to_iso(),
                    c.closed_at.map(|t| t.to_iso()).unwrap_or_default(),
                    c.comments.len(),
                    c.uid
                );
                escape_into(out, &c.user);
                if c.bounds.is_set() {
                    let _ = write!(
                        out,
                        " x{} y{} X{} Y{}",
                        format_coordinate(c.bounds.bottom_left.x()),
                        format_coordinate(c.bounds.bottom_left.y()),
                        format_coordinate(c.bounds.top_right.x()),
                        format_coordinate(c.bounds.top_right.y()),
                    );
                } else {
                    out.push_str(" x y X Y");
                }
                tags(out, &c.tags);
            }
        }
        out.push('\n');
    }
}

fn tags(out: &mut String, tags: &TagList) {
    out.push_str(" T");
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        escape_into(out, &tag.key);
        out.push('=');
        escape_into(out, &tag.value);
    }
}

fn location(out: &mut String, location: Location) {
    if location.is_defined() {
        let _ = write!(
            out,
            " x{} y{}",
            format_coordinate(location.x()),
            format_coordinate(location.y())
        );
    } else {
        out.push_str(" x y");
    }
}

impl OutputFormat for OplEncoder {
    fn encode_header(&self, _header: &Header) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }

    fn encode_block(&self, buffer: EntityBuffer) -> Result<Vec<u8>, CodecError> {
        let mut out = String::with_capacity(buffer.byte_len() * 2);
        for entity in buffer.iter() {
            self.entity(&mut out, &entity?);
        }
        Ok(out.into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

pub struct OplDecoder {
    input: QueueReader,
    read_types: EntityKinds,
    batch_size: usize,
    line_no: usize,
    line: Vec<u8>,
    done: bool,
}

pub fn create_decoder(ctx: DecoderContext) -> Result<Box<dyn InputFormat>, CodecError> {
    Ok(Box::new(OplDecoder {
        input: ctx.input,
        read_types: ctx.read_types,
        batch_size: ctx.batch_size.max(1),
        line_no: 0,
        line: Vec::new(),
        done: false,
    }))
}

impl InputFormat for OplDecoder {
    fn read_header(&mut self) -> Result<Header, CodecError> {
        Ok(Header::default())
    }

    fn next_buffer(&mut self) -> Result<EntityBuffer, CodecError> {
        let mut builder = EntityBufferBuilder::new();
        while !self.done && builder.len() < self.batch_size {
            self.line.clear();
            let limit = MAX_OPL_LINE as u64 + 1;
            if (&mut self.input).take(limit).read_until(b'\n', &mut self.line)? == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;
            if self.line.len() > MAX_OPL_LINE {
                return Err(bad(self.line_no, format_args!("line longer than {MAX_OPL_LINE} bytes")));
            }
            let text = std::str::from_utf8(&self.line)
                .map_err(|e| CodecError::malformed(FORMAT, format!("line {}: {e}", self.line_no)))?;
            let text = text.trim_end_matches(['\n', '\r']);
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let entity = parse_line(text, self.line_no)?;
            if self.read_types.contains(entity.kind()) {
                builder.push(&entity)?;
            }
        }
        Ok(builder.finish())
    }
}

fn bad(line: usize, msg: impl std::fmt::Display) -> CodecError {
    CodecError::malformed(FORMAT, format!("line {line}: {msg}"))
}

fn number<T: std::str::FromStr>(value: &str, field: char, line: usize) -> Result<T, CodecError> {
    value
        .parse()
        .map_err(|_| bad(line, format_args!("bad value '{value}' for field '{field}'")))
}

fn timestamp(value: &str, line: usize) -> Result<Timestamp, CodecError> {
    if value.is_empty() {
        return Ok(Timestamp::default());
    }
    Timestamp::parse_iso(value).ok_or_else(|| bad(line, format_args!("bad timestamp '{value}'")))
}

fn coordinate(value: &str, field: char, line: usize) -> Result<Option<f64>, CodecError> {
    if value.is_empty() {
        return Ok(None);
    }
    number::<f64>(value, field, line).map(Some)
}

fn parse_tags(value: &str, line: usize) -> Result<TagList, CodecError> {
    let mut list = TagList::new();
    for pair in value.split(',').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').ok_or_else(|| bad(line, format_args!("tag without '=': '{pair}'")))?;
        list.push(unescape(k, line)?, unescape(v, line)?);
    }
    Ok(list)
}

fn parse_node_refs(value: &str, line: usize) -> Result<Vec<NodeRef>, CodecError> {
    let mut refs = Vec::new();
    for item in value.split(',').filter(|p| !p.is_empty()) {
        let body = item.strip_prefix('n').ok_or_else(|| bad(line, format_args!("bad node ref '{item}'")))?;
        let node_ref = match body.split_once('x') {
            None => NodeRef::new(number(body, 'N', line)?),
            Some((id, loc)) => {
                let (x, y) = loc.split_once('y').ok_or_else(|| bad(line, format_args!("bad node ref '{item}'")))?;
                let mut nr = NodeRef::new(number(id, 'N', line)?);
                if let (Some(x), Some(y)) = (coordinate(x, 'x', line)?, coordinate(y, 'y', line)?) {
                    nr.location = Location::from_degrees(x, y);
                }
                nr
            }
        };
        refs.push(node_ref);
    }
    Ok(refs)
}

fn parse_members(value: &str, line: usize) -> Result<Vec<Member>, CodecError> {
    let mut members = Vec::new();
    for item in value.split(',').filter(|p| !p.is_empty()) {
        let (head, role) = item.split_once('@').ok_or_else(|| bad(line, format_args!("member without role: '{item}'")))?;
        let mut chars = head.chars();
        let code = chars.next().ok_or_else(|| bad(line, "empty member"))?;
        let kind = item_type(code, line)?;
        members.push(Member::new(kind, number(chars.as_str(), 'M', line)?, unescape(role, line)?));
    }
    Ok(members)
}

fn item_type(code: char, line: usize) -> Result<ItemType, CodecError> {
    u8::try_from(code)
        .ok()
        .and_then(|b| ItemType::try_from_primitive(b).ok())
        .ok_or_else(|| {
            let raw = u8::try_from(code).unwrap_or(b'?');
            bad(line, format_args!("unknown item type {}", enum_name_or_hex::<ItemType>(raw)))
        })
}

fn apply_meta(meta: &mut ObjectMeta, key: char, value: &str, line: usize) -> Result<bool, CodecError> {
    match key {
        'v' => meta.version = number(value, key, line)?,
        'd' => {
            meta.visible = match value {
                "V" => true,
                "D" => false,
                other => return Err(bad(line, format_args!("bad visibility '{other}'"))),
            }
        }
        'c' => meta.changeset = number(value, key, line)?,
        't' => meta.timestamp = timestamp(value, line)?,
        'i' => meta.uid = number(value, key, line)?,
        'u' => meta.user = unescape(value, line)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_line(text: &str, line: usize) -> Result<Entity, CodecError> {
    let mut fields = text.split(' ').filter(|f| !f.is_empty());
    let first = fields.next().ok_or_else(|| bad(line, "empty line"))?;
    let mut chars = first.chars();
    let code = chars.next().ok_or_else(|| bad(line, "missing type"))?;
    let id_text = chars.as_str();

    let split = |field: &str| -> Result<(char, String), CodecError> {
        let mut cs = field.chars();
        let key = cs.next().ok_or_else(|| bad(line, "empty field"))?;
        Ok((key, cs.as_str().to_string()))
    };

    match item_type(code, line)? {
        ItemType::Node => {
            let mut node = Node::new(number(id_text, code, line)?, Location::undefined());
            let (mut x, mut y) = (None, None);
            for field in fields {
                let (key, value) = split(field)?;
                if apply_meta(&mut node.meta, key, &value, line)? {
                    continue;
                }
                match key {
                    'T' => node.tags = parse_tags(&value, line)?,
                    'x' => x = coordinate(&value, key, line)?,
                    'y' => y = coordinate(&value, key, line)?,
                    other => return Err(bad(line, format_args!("unknown node field '{other}'"))),
                }
            }
            if let (Some(x), Some(y)) = (x, y) {
                node.location = Location::from_degrees(x, y);
            }
            Ok(node.into())
        }
        ItemType::Way => {
            let mut way = Way::new(number(id_text, code, line)?, []);
            for field in fields {
                let (key, value) = split(field)?;
                if apply_meta(&mut way.meta, key, &value, line)? {
                    continue;
                }
                match key {
                    'T' => way.tags = parse_tags(&value, line)?,
                    'N' => way.nodes = parse_node_refs(&value, line)?,
                    other => return Err(bad(line, format_args!("unknown way field '{other}'"))),
                }
            }
            Ok(way.into())
        }
        ItemType::Relation => {
            let mut relation = Relation::new(number(id_text, code, line)?, Vec::new());
            for field in fields {
                let (key, value) = split(field)?;
                if apply_meta(&mut relation.meta, key, &value, line)? {
                    continue;
                }
                match key {
                    'T' => relation.tags = parse_tags(&value, line)?,
                    'M' => relation.members = parse_members(&value, line)?,
                    other => return Err(bad(line, format_args!("unknown relation field '{other}'"))),
                }
            }
            Ok(relation.into())
        }
        ItemType::Changeset => {
            let mut cs = Changeset::new(number(id_text, code, line)?);
            let mut corners: [Option<f64>; 4] = [None; 4];
            for field in fields {
                let (key, value) = split(field)?;
                match key {
                    'k' => cs.num_changes = number(&value, key, line)?,
                    's' => cs.created_at = timestamp(&value, line)?,
                    'e' => {
                        let closed = timestamp(&value, line)?;
                        cs.closed_at = closed.is_set().then_some(closed);
                    }
                    // comment count; comments themselves are not carried
                    'd' => {}
                    'i' => cs.uid = number(&value, key, line)?,
                    'u' => cs.user = unescape(&value, line)?,
                    'x' => corners[0] = coordinate(&value, key, line)?,
                    'y' => corners[1] = coordinate(&value, key, line)?,
                    'X' => corners[2] = coordinate(&value, key, line)?,
                    'Y' => corners[3] = coordinate(&value, key, line)?,
                    'T' => cs.tags = parse_tags(&value, line)?,
                    other => return Err(bad(line, format_args!("unknown changeset field '{other}'"))),
                }
            }
            if let [Some(x0), Some(y0), Some(x1), Some(y1)] = corners {
                cs.bounds.bottom_left = Location::from_degrees(x0, y0);
                cs.bounds.top_right = Location::from_degrees(x1, y1);
            }
            Ok(cs.into())
        }
    }
}
