#[cfg(test)]
mod debug_format_tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use osmio_core::format::codecs::debug;
    use osmio_core::format::{FormatDescriptor, OutputFormat};
    use osmio_core::osm::{
        BoundingBox, Changeset, Entity, EntityBuffer, Header, ItemType, Location, Member, Node,
        Relation, Timestamp, Way,
    };

    fn encoder(options: &str) -> Arc<dyn OutputFormat> {
        let text = if options.is_empty() { "debug".to_string() } else { format!("debug,{options}") };
        debug::create_encoder(&FormatDescriptor::parse(&text).unwrap()).unwrap()
    }

    fn render(options: &str, entity: Entity) -> String {
        let buffer = EntityBuffer::from_entities([&entity]).unwrap();
        String::from_utf8(encoder(options).encode_block(buffer).unwrap()).unwrap()
    }

    // ------------------------------------------------------------
    // Escaping
    // ------------------------------------------------------------
    #[test]
    fn emoji_is_escaped() {
        let mut node = Node::new(1, Location::from_degrees(1.0, 2.0));
        node.tags.push("name", "caf\u{e9} \u{1F600}!");
        let out = render("", node.into());
        assert!(out.contains("\"caf\u{e9} <U+1F600>!\""), "{out}");
    }

    #[test]
    fn control_and_quote_characters_are_escaped() {
        let mut node = Node::new(1, Location::from_degrees(1.0, 2.0));
        node.tags.push("note", "a\"b\n<c>");
        let out = render("", node.into());
        assert!(out.contains("a<U+0022>b<U+000A><U+003C>c<U+003E>"), "{out}");
    }

    proptest! {
        #[test]
        fn allow_listed_text_passes_through(text in "[a-zA-Z0-9 !#$%&()*+,./:;=?@_~-]{0,40}") {
            let mut node = Node::new(1, Location::from_degrees(0.0, 0.0));
            node.tags.push("k", text.clone());
            let out = render("", node.into());
            let needle = format!("\"{}\"", text);
            prop_assert!(out.contains(&needle));
        }
    }

    // ------------------------------------------------------------
    // Structural warnings
    // ------------------------------------------------------------
    #[test]
    fn way_with_one_node() {
        let out = render("", Way::new(10, [1]).into());
        assert!(out.contains("    1 LESS THAN 2 NODES!\n"), "{out}");
    }

    #[test]
    fn way_with_2001_nodes() {
        let out = render("", Way::new(10, 1..=2001).into());
        assert!(out.contains("    2001 MORE THAN 2000 NODES!\n"));
        assert!(out.contains("    0000: "));
        assert!(out.contains("    2000: "));
    }

    #[test]
    fn closed_and_open_ways() {
        assert!(render("", Way::new(10, [1, 2, 3, 1]).into()).contains("    4 (closed)\n"));
        assert!(render("", Way::new(10, [1, 2, 3]).into()).contains("    3 (open)\n"));
    }

    #[test]
    fn deleted_object_and_invalid_location() {
        let mut node = Node::new(3, Location::from_fixed(2_000_000_000, 0));
        node.meta.version = 2;
        let out = render("", node.clone().into());
        assert!(out.contains("  version:   2 visible\n"), "{out}");
        assert!(out.contains(" INVALID LOCATION!"));

        node.meta.visible = false;
        let out = render("", node.into());
        assert!(out.contains("   2 deleted\n"));
        assert!(!out.contains("lon/lat"));
    }

    #[test]
    fn changeset_warnings() {
        let cs = Changeset::new(42);
        let out = render("", cs.into());
        assert!(out.starts_with("changeset 42\n"), "{out}");
        assert!(out.contains("0 NO CHANGES!\n"));
        assert!(out.contains("OPEN!\n"));
        assert!(out.contains("BOX NOT SET!\n"));

        let mut cs = Changeset::new(43);
        cs.num_changes = 5;
        cs.closed_at = Some(Timestamp::new(1_420_070_400));
        cs.bounds = BoundingBox::new(Location::from_degrees(2.0, 2.0), Location::from_degrees(1.0, 1.0));
        let out = render("", cs.into());
        assert!(!out.contains("NO CHANGES!"));
        assert!(out.contains("2015-01-01T00:00:00Z (1420070400)"));
        assert!(out.contains(" INVALID BOX!"));
    }

    #[test]
    fn relation_members() {
        let relation = Relation::new(
            9,
            vec![Member::new(ItemType::Node, 1, "stop"), Member::new(ItemType::Way, 2, "")],
        );
        let out = render("", relation.into());
        assert!(out.contains("  members:   2\n"));
        assert!(out.contains("    0: node          1 \"stop\"\n"), "{out}");
        assert!(out.contains("    1: way           2 \"\"\n"));
    }

    // ------------------------------------------------------------
    // Options and header
    // ------------------------------------------------------------
    #[test]
    fn metadata_can_be_disabled() {
        let node = Node::new(1, Location::from_degrees(1.0, 2.0));
        assert!(render("", node.clone().into()).contains("version"));
        let out = render("add_metadata=false", node.into());
        assert!(!out.contains("version"));
        assert!(out.starts_with("node 1\n  lon/lat:   1.0000000,2.0000000\n"), "{out}");
    }

    #[test]
    fn color_only_when_requested() {
        let node: Entity = Node::new(1, Location::from_degrees(1.0, 2.0)).into();
        assert!(!render("", node.clone()).contains('\x1b'));
        assert!(render("color=true", node.clone()).contains("\x1b[1mnode\x1b[0m"));
        assert!(render("color", node).contains('\x1b'));
    }

    #[test]
    fn header_rendering() {
        let mut header = Header::new();
        header.add_box(BoundingBox::new(Location::from_degrees(-1.5, 2.0), Location::from_degrees(3.25, 4.0)));
        header.add_box(BoundingBox::default());
        header.set("generator", "test");
        let out = String::from_utf8(encoder("").encode_header(&header).unwrap()).unwrap();
        assert_eq!(
            out,
            "header\n  multiple object versions: no\n  bounding boxes: \n    -1.5,2 3.25,4\n    undefined undefined\n  options: \n    generator = test\n\n=============================================\n\n"
        );
    }
}
