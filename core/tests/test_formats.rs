#[cfg(test)]
mod format_tests {
    use std::io::Cursor;

    use bytes::Bytes;

    use osmio_core::format::codecs::{opl, osmb};
    use osmio_core::format::{CodecError, DecoderContext, FileSpec, FormatDescriptor, InputFormat, OutputFormat};
    use osmio_core::compression::Compression;
    use osmio_core::osm::{
        BoundingBox, Changeset, ChangesetComment, Entity, EntityBuffer, EntityKinds, Header, ItemType,
        Location, Member, Node, Relation, Timestamp, Way,
    };
    use osmio_core::config::ReaderConfig;
    use osmio_core::constants::MAX_OPL_LINE;
    use osmio_core::stream::{ByteSource, QueueReader, Reader};
    use osmio_core::utils::compute_checksum;

    fn context(format: &str, data: Vec<u8>, kinds: EntityKinds, batch: usize) -> DecoderContext {
        DecoderContext {
            descriptor: FormatDescriptor::parse(format).unwrap(),
            read_types: kinds,
            input: QueueReader::from_chunks(vec![data]),
            batch_size: batch,
        }
    }

    fn decode_all(decoder: &mut dyn InputFormat) -> Result<Vec<Entity>, CodecError> {
        let mut out = Vec::new();
        loop {
            let buffer = decoder.next_buffer()?;
            if buffer.is_empty() {
                return Ok(out);
            }
            out.extend(buffer.entities()?);
        }
    }

    fn sample() -> Vec<Entity> {
        let mut node = Node::new(110000, Location::from_degrees(1.02, 1.12));
        node.meta.version = 1;
        node.meta.changeset = 5;
        node.meta.timestamp = Timestamp::new(1_420_070_400);
        node.meta.uid = 1;
        node.meta.user = "test user".into();
        node.tags.push("name", "a=b, c@d");

        let mut way = Way::new(110800, [110000, 110001]);
        way.meta.visible = false;
        way.tags.push("test:id", "110");

        let relation = Relation::new(
            1,
            vec![Member::new(ItemType::Node, 1, "stop"), Member::new(ItemType::Way, 2, "")],
        );

        let mut cs = Changeset::new(7);
        cs.num_changes = 3;
        cs.created_at = Timestamp::new(1_420_070_400);
        cs.uid = 1;
        cs.user = "test".into();
        cs.bounds = BoundingBox::new(Location::from_degrees(1.0, 1.0), Location::from_degrees(2.0, 2.0));
        cs.tags.push("comment", "fix");
        cs.comments.push(ChangesetComment {
            date: Timestamp::new(1_420_070_500),
            uid: 2,
            user: "other".into(),
            text: "ok".into(),
        });

        vec![node.into(), way.into(), relation.into(), cs.into()]
    }

    // ------------------------------------------------------------
    // opl
    // ------------------------------------------------------------
    #[test]
    fn opl_encodes_documented_layout() {
        let enc = opl::create_encoder(&FormatDescriptor::parse("opl").unwrap()).unwrap();
        let entities = sample();
        let text = String::from_utf8(enc.encode_block(EntityBuffer::from_entities(&entities).unwrap()).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "n110000 v1 dV c5 t2015-01-01T00:00:00Z i1 utest%20%user Tname=a%3d%b%2c%%20%c%40%d x1.02 y1.12"
        );
        assert_eq!(lines[1], "w110800 v0 dD c0 t i0 u Ttest:id=110 Nn110000,n110001");
        assert_eq!(lines[2], "r1 v0 dV c0 t i0 u T Mn1@stop,w2@");
    }

    #[test]
    fn opl_decodes_what_it_encodes() {
        let enc = opl::create_encoder(&FormatDescriptor::parse("opl").unwrap()).unwrap();
        let entities = sample();
        let text = enc.encode_block(EntityBuffer::from_entities(&entities).unwrap()).unwrap();

        let mut dec = opl::create_decoder(context("opl", text, EntityKinds::ALL, 2)).unwrap();
        assert_eq!(dec.read_header().unwrap(), Header::default());
        let first = dec.next_buffer().unwrap();
        assert_eq!(first.len(), 2);
        let mut decoded = first.entities().unwrap();
        decoded.extend(decode_all(dec.as_mut()).unwrap());

        let mut expected = entities;
        // Comment bodies are not carried by opl, only their count.
        if let Some(Entity::Changeset(cs)) = expected.last_mut() {
            cs.comments.clear();
        }
        if let Some(Entity::Changeset(cs)) = decoded.last_mut() {
            assert_eq!(cs.comments.len(), 0);
        }
        assert_eq!(decoded, expected);
    }

    #[test]
    fn opl_skips_comments_and_filters_kinds() {
        let text = b"# comment\n\nn1 x1 y1\nw2 Nn1,n2\nn3\n".to_vec();
        let mut dec = opl::create_decoder(context("opl", text, EntityKinds::NODE, 100)).unwrap();
        let ids: Vec<i64> = decode_all(dec.as_mut()).unwrap().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn opl_malformed_line_reports_line_number() {
        let text = b"n1\nq7 v1\n".to_vec();
        let mut dec = opl::create_decoder(context("opl", text, EntityKinds::ALL, 100)).unwrap();
        match dec.next_buffer() {
            Err(CodecError::Malformed { msg, .. }) => assert!(msg.contains("line 2"), "{msg}"),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    // ------------------------------------------------------------
    // osmb
    // ------------------------------------------------------------
    fn osmb_bytes(blocks: &[&[Entity]]) -> Vec<u8> {
        let enc = osmb::create_encoder(&FormatDescriptor::parse("osmb").unwrap()).unwrap();
        let mut header = Header::new();
        header.add_box(BoundingBox::new(Location::from_degrees(0.0, 0.0), Location::from_degrees(1.0, 1.0)));
        let mut out = enc.encode_header(&header).unwrap();
        for block in blocks {
            out.extend(enc.encode_block(EntityBuffer::from_entities(*block).unwrap()).unwrap());
        }
        out.extend(enc.encode_close().unwrap());
        out
    }

    #[test]
    fn osmb_keeps_blocks_and_header() {
        let entities = sample();
        let data = osmb_bytes(&[&entities[..2], &entities[2..]]);
        let mut dec = osmb::create_decoder(context("osmb", data, EntityKinds::ALL, 1)).unwrap();
        let header = dec.read_header().unwrap();
        assert_eq!(header.boxes.len(), 1);
        assert_eq!(dec.next_buffer().unwrap().len(), 2);
        assert_eq!(dec.next_buffer().unwrap().len(), 2);
        assert!(dec.next_buffer().unwrap().is_empty());
        assert!(dec.next_buffer().unwrap().is_empty());
    }

    #[test]
    fn osmb_filters_and_skips_emptied_blocks() {
        let entities = sample();
        let data = osmb_bytes(&[&entities[..1], &entities[3..], &entities[..2]]);
        let mut dec = osmb::create_decoder(context("osmb", data, EntityKinds::WAY, 1)).unwrap();
        dec.read_header().unwrap();
        let all = decode_all(dec.as_mut()).unwrap();
        assert_eq!(all, vec![entities[1].clone()]);
    }

    #[test]
    fn osmb_detects_corruption() {
        let entities = sample();
        let mut data = osmb_bytes(&[&entities[..]]);
        let last_payload_byte = data.len() - 8 - 5;
        data[last_payload_byte] ^= 0x55;
        let mut dec = osmb::create_decoder(context("osmb", data, EntityKinds::ALL, 1)).unwrap();
        dec.read_header().unwrap();
        assert!(matches!(dec.next_buffer(), Err(CodecError::Checksum { .. })));
    }

    #[test]
    fn osmb_truncation_and_bad_magic() {
        let entities = sample();
        let data = osmb_bytes(&[&entities[..]]);
        let cut = data[..data.len() - 20].to_vec();
        let mut dec = osmb::create_decoder(context("osmb", cut, EntityKinds::ALL, 1)).unwrap();
        dec.read_header().unwrap();
        assert!(matches!(dec.next_buffer(), Err(CodecError::Truncated { .. })));

        let mut dec = osmb::create_decoder(context("osmb", b"PBF!\x01\x00".to_vec(), EntityKinds::ALL, 1)).unwrap();
        assert!(matches!(dec.read_header(), Err(CodecError::Malformed { .. })));
    }

    #[test]
    fn raw_buffer_with_trailing_bytes_is_rejected() {
        let entities = sample();
        let good = EntityBuffer::from_entities(&entities[..1]).unwrap();
        let mut bytes = good.as_bytes().to_vec();
        bytes.extend_from_slice(&[0, 0]);
        let buffer = EntityBuffer::from_raw(Bytes::from(bytes), 1);
        assert!(buffer.entities().is_err());
    }

    fn raw_block(count: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out.extend_from_slice(&compute_checksum(payload).to_le_bytes());
        out
    }

    fn huge_length_prefix() -> Vec<u8> {
        let mut prefix = vec![0xFD];
        prefix.extend_from_slice(&(1u64 << 60).to_le_bytes());
        prefix
    }

    #[test]
    fn osmb_header_with_huge_length_is_malformed() {
        let body = huge_length_prefix();
        let mut data = b"OSMB".to_vec();
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&(body.len() as u32).to_le_bytes());
        data.extend_from_slice(&body);

        let mut dec = osmb::create_decoder(context("osmb", data.clone(), EntityKinds::ALL, 1)).unwrap();
        assert!(matches!(dec.read_header(), Err(CodecError::Malformed { .. })));

        let descriptor = FormatDescriptor::parse("osmb").unwrap();
        let source = ByteSource::Memory(Cursor::new(data));
        let mut reader = Reader::from_source(source, descriptor, ReaderConfig::default()).unwrap();
        let err = reader.open(EntityKinds::ALL).unwrap_err();
        assert!(err.is_codec(), "{err}");
    }

    #[test]
    fn osmb_block_with_huge_inner_length_is_malformed() {
        let bare = Entity::from(Node::new(17, Location::from_degrees(1.0, 2.0)));
        let node = EntityBuffer::from_entities([&bare]).unwrap();
        // A node without tags ends in the zero tag count.
        let mut payload = node.as_bytes().to_vec();
        assert_eq!(payload.pop(), Some(0));
        payload.extend(huge_length_prefix());

        for kinds in [EntityKinds::ALL, EntityKinds::NODE] {
            let mut data = osmb_bytes(&[]);
            let close = data.split_off(data.len() - 8);
            data.extend(raw_block(1, &payload));
            data.extend(close);
            let mut dec = osmb::create_decoder(context("osmb", data, kinds, 1)).unwrap();
            dec.read_header().unwrap();
            assert!(matches!(dec.next_buffer(), Err(CodecError::Malformed { .. })));
        }
    }

    #[test]
    fn osmb_block_count_must_match_payload() {
        let entities = sample();
        let node = EntityBuffer::from_entities(&entities[..1]).unwrap();
        let mut data = osmb_bytes(&[]);
        let close = data.split_off(data.len() - 8);
        data.extend(raw_block(5, node.as_bytes()));
        data.extend(close);

        let mut dec = osmb::create_decoder(context("osmb", data, EntityKinds::ALL, 1)).unwrap();
        dec.read_header().unwrap();
        assert!(matches!(dec.next_buffer(), Err(CodecError::Malformed { .. })));
    }

    #[test]
    fn opl_rejects_overlong_line() {
        let data = vec![b'n'; MAX_OPL_LINE + 10];
        let mut dec = opl::create_decoder(context("opl", data, EntityKinds::ALL, 10)).unwrap();
        match dec.next_buffer() {
            Err(CodecError::Malformed { msg, .. }) => assert!(msg.contains("line 1"), "{msg}"),
            other => panic!("expected malformed line, got {other:?}"),
        }
    }

    // ------------------------------------------------------------
    // Descriptors
    // ------------------------------------------------------------
    #[test]
    fn descriptor_strings() {
        let d = FormatDescriptor::parse("debug,add_metadata=false,color").unwrap();
        assert_eq!(d.format(), "debug");
        assert_eq!(d.get("add_metadata"), Some("false"));
        assert_eq!(d.get("color"), Some("true"));
        assert_eq!(FormatDescriptor::parse("opl.zst").unwrap().compression(), Compression::Zstd);
        assert!(FormatDescriptor::parse("opl.rar").is_err());

        let f = FileSpec::new("planet.osmb.lz4", "").unwrap();
        assert_eq!(f.descriptor().format(), "osmb");
        assert_eq!(f.descriptor().compression(), Compression::Lz4);
        assert!(FileSpec::new("-", "").is_err());
        assert!(FileSpec::new("-", "opl").unwrap().is_stdio());
    }
}
