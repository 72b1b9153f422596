#[cfg(test)]
mod telemetry_snapshot_tests {
    use std::time::Duration;

    use osmio_core::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};

    fn make_counters() -> TelemetryCounters {
        let mut c = TelemetryCounters::default();
        c.add_pumped(2, 150);
        c.add_decoded(3);
        c.add_encoded(3);
        c.add_written(120);
        c
    }

    fn make_timer() -> TelemetryTimer {
        let mut timer = TelemetryTimer::new();
        std::thread::sleep(Duration::from_millis(20));
        timer.add_stage_time(Stage::Decompress, Duration::from_millis(5));
        timer.add_stage_time(Stage::Decode, Duration::from_millis(3));
        timer.add_stage_time(Stage::Decode, Duration::from_millis(2));
        timer.finish();
        timer
    }

    #[test]
    fn counters_accumulate() {
        let mut a = make_counters();
        assert_eq!(a.chunks_read, 2);
        assert_eq!(a.bytes_read, 150);
        a.add_pumped(1, 10);
        a.add_decoded(3);
        a.add_written(120);
        assert_eq!(a.chunks_read, 3);
        assert_eq!(a.bytes_read, 160);
        assert_eq!(a.buffers_decoded, 2);
        assert_eq!(a.entities_decoded, 6);
        assert_eq!(a.bytes_written, 240);
    }

    #[test]
    fn stage_times_accumulate() {
        let timer = make_timer();
        assert_eq!(timer.stage_times.get(Stage::Decode), Duration::from_millis(5));
        assert_eq!(timer.stage_times.get(Stage::Write), Duration::ZERO);
        assert_eq!(timer.stage_times.get(Stage::Encode), Duration::ZERO);
        assert_eq!(timer.stage_times.total(), Duration::from_millis(10));
    }

    #[test]
    fn finished_timer_is_frozen() {
        let timer = make_timer();
        let first = timer.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.elapsed(), first);
        assert!(first >= Duration::from_millis(20));
    }

    #[test]
    fn snapshot_copies_counters_and_serializes() {
        let snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer());
        assert_eq!(snapshot.entities_decoded, 3);
        assert!(snapshot.throughput_bytes_per_sec > 0.0);
        assert!(snapshot.total_stage_time() <= snapshot.elapsed);

        let json = snapshot.to_json().unwrap();
        let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bytes_read, snapshot.bytes_read);
        assert_eq!(back.elapsed, snapshot.elapsed);
        assert_eq!(back.stage_times, snapshot.stage_times);
    }

    #[test]
    fn stage_display_names() {
        let mut times = StageTimes::default();
        times.add(Stage::Write, Duration::from_micros(1500));
        assert!((times.get_ms(Stage::Write) - 1.5).abs() < 1e-9);
        let names: Vec<String> = [Stage::Decompress, Stage::Decode, Stage::Encode, Stage::Write]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["decompress", "decode", "encode", "write"]);
    }
}
