#[cfg(test)]
mod reader_tests {
    use std::io::Cursor;
    use std::thread;
    use std::time::Duration;

    use osmio_core::compression::{create_compressor, Compression};
    use osmio_core::config::ReaderConfig;
    use osmio_core::format::codecs::osmb;
    use osmio_core::format::{FileSpec, FormatDescriptor, OutputFormat};
    use osmio_core::osm::{Entity, EntityBuffer, EntityKinds, Header, Location, Node, Way};
    use osmio_core::stream::{ByteSource, Reader, ReaderState, SharedBufferWriter};

    // ------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------
    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn node(id: i64) -> Entity {
        Entity::from(Node::new(id, Location::from_degrees(0.5, 0.25)))
    }

    /// osmb stream with one block per entry of `blocks`.
    fn osmb_stream(header: &Header, blocks: &[Vec<Entity>]) -> Vec<u8> {
        let enc = osmb::create_encoder(&FormatDescriptor::parse("osmb").unwrap()).unwrap();
        let mut out = enc.encode_header(header).unwrap();
        for block in blocks {
            out.extend(enc.encode_block(EntityBuffer::from_entities(block).unwrap()).unwrap());
        }
        out.extend(enc.encode_close().unwrap());
        out
    }

    fn reader_over(bytes: Vec<u8>, format: &str, config: ReaderConfig) -> Reader {
        let descriptor = FormatDescriptor::parse(format).unwrap();
        Reader::from_source(ByteSource::Memory(Cursor::new(bytes)), descriptor, config).unwrap()
    }

    // ------------------------------------------------------------
    // N buffers, then the empty sentinel forever
    // ------------------------------------------------------------
    #[test]
    fn yields_each_block_then_empty_forever() {
        for n in 0..6i64 {
            let blocks: Vec<Vec<Entity>> = (0..n).map(|i| vec![node(i * 10), node(i * 10 + 1)]).collect();
            let mut reader = reader_over(osmb_stream(&Header::new(), &blocks), "osmb", ReaderConfig::default());
            reader.open(EntityKinds::ALL).unwrap();

            let mut seen = 0;
            loop {
                let buffer = reader.read().unwrap();
                if buffer.is_empty() {
                    break;
                }
                assert_eq!(buffer.len(), 2);
                seen += 1;
            }
            assert_eq!(seen, n);
            for _ in 0..3 {
                assert!(reader.read().unwrap().is_empty());
            }
            reader.close().unwrap();
            assert_eq!(reader.telemetry().entities_decoded, (n * 2) as u64);
        }
    }

    #[test]
    fn header_round_trips_through_osmb() {
        let mut header = Header::new();
        header.multiple_object_versions = true;
        header.set("generator", "osmio-test");
        let mut reader = reader_over(osmb_stream(&header, &[]), "osmb", ReaderConfig::default());
        let decoded = reader.open(EntityKinds::ALL).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(reader.header(), Some(&header));
    }

    #[test]
    fn nothing_requested_reads_header_only() {
        let blocks = vec![vec![node(1)], vec![node(2)]];
        let mut reader = reader_over(osmb_stream(&Header::new(), &blocks), "osmb", ReaderConfig::default());
        reader.open(EntityKinds::NOTHING).unwrap();
        assert!(reader.read().unwrap().is_empty());
        assert!(reader.read().unwrap().is_empty());
        reader.close().unwrap();
        assert_eq!(reader.telemetry().entities_decoded, 0);
    }

    #[test]
    fn read_types_filter_entities() {
        let way = Entity::from(Way::new(5, [1, 2]));
        let text = osmb_stream(&Header::new(), &[vec![node(1), way.clone()], vec![node(2)]]);
        let mut reader = reader_over(text, "osmb", ReaderConfig::default());
        reader.open(EntityKinds::WAY).unwrap();
        let buffer = reader.read().unwrap();
        assert_eq!(buffer.entities().unwrap(), vec![way]);
        assert!(reader.read().unwrap().is_empty());
    }

    // ------------------------------------------------------------
    // Queue bound under a slow consumer
    // ------------------------------------------------------------
    #[test]
    fn queue_never_exceeds_depth() {
        init_logging();
        let text: String = (1..=400).map(|i| format!("n{i} v1 x1 y1\n")).collect();
        let config = ReaderConfig::default()
            .with_queue_depth(3)
            .with_chunk_size(32)
            .with_entities_per_buffer(5);
        let mut reader = reader_over(text.into_bytes(), "opl", config);
        reader.open(EntityKinds::ALL).unwrap();

        let mut total = 0;
        loop {
            assert!(reader.queued_chunks() <= 3);
            let buffer = reader.read().unwrap();
            if buffer.is_empty() {
                break;
            }
            assert!(buffer.len() <= 5);
            total += buffer.len();
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(total, 400);
        reader.close().unwrap();
        let snapshot = reader.telemetry();
        assert!(snapshot.chunks_read > 3);
    }

    // ------------------------------------------------------------
    // Compressed files on disk
    // ------------------------------------------------------------
    #[test]
    fn reads_gzip_file_detected_from_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.opl.gz");

        let out = SharedBufferWriter::new();
        let mut gz = create_compressor(Compression::Gzip, Box::new(out.clone())).unwrap();
        gz.write(b"n1 v1 x1 y2\nn2 v1 x3 y4\n").unwrap();
        gz.close().unwrap();
        std::fs::write(&path, out.contents()).unwrap();

        let file = FileSpec::new(path.to_str().unwrap(), "").unwrap();
        assert_eq!(file.descriptor().compression(), Compression::Gzip);
        let mut reader = Reader::new(file, ReaderConfig::default()).unwrap();
        reader.open(EntityKinds::ALL).unwrap();
        let ids: Vec<i64> = reader.read().unwrap().iter().map(|e| e.unwrap().id()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(reader.read().unwrap().is_empty());
        reader.close().unwrap();
    }

    #[test]
    fn corrupt_gzip_surfaces_compression_error() {
        // Valid gzip member header, then a deflate block of reserved type 3.
        let mut bytes = vec![0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0xff];
        bytes.extend_from_slice(&[0x07; 32]);
        let mut reader = reader_over(bytes, "opl.gz", ReaderConfig::default());
        let opened = reader.open(EntityKinds::ALL);
        let failed = match opened {
            Err(e) => Some(e),
            Ok(_) => reader.read().err(),
        };
        assert!(failed.is_some());
        let _ = reader.close();
        assert_eq!(reader.state(), ReaderState::Closed);
    }

    #[test]
    fn missing_file_is_resource_error_at_open() {
        let file = FileSpec::new("/nonexistent/osmio/input.opl", "").unwrap();
        let mut reader = Reader::new(file, ReaderConfig::default()).unwrap();
        let err = reader.open(EntityKinds::ALL).unwrap_err();
        assert!(err.is_resource());
    }

    #[test]
    fn unknown_format_is_configuration_error() {
        let file = FileSpec::new("input.pbf", "").unwrap();
        let err = Reader::new(file, ReaderConfig::default()).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn drop_without_close_is_clean() {
        init_logging();
        let text: String = (1..=2000).map(|i| format!("n{i}\n")).collect();
        let config = ReaderConfig::default().with_queue_depth(1).with_chunk_size(16);
        let mut reader = reader_over(text.into_bytes(), "opl", config);
        reader.open(EntityKinds::ALL).unwrap();
        assert!(!reader.read().unwrap().is_empty());
        drop(reader);
    }
}
