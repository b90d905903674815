use apm_aggregator::aggregator::{summarize, AggregateLimits, Aggregator};
use apm_aggregator::model::{StackProfile, StackSample, TimerNode, Transaction};
use apm_aggregator::output::{read_aggregates, write_aggregates, write_svg, AggregateReport};
use apm_aggregator::flamegraph::generate_flamegraph;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

fn flushed_report() -> AggregateReport {
    let aggregator = Aggregator::new(60_000, AggregateLimits::default());
    for millis in [100u64, 200, 300] {
        aggregator.add_transaction(&Transaction {
            transaction_type: "Web".to_string(),
            transaction_name: "/search".to_string(),
            duration_nanos: millis * 1_000_000,
            main_thread_root_timer: TimerNode::new("http request", millis * 1_000_000, 1),
            main_thread_profile: Some(StackProfile {
                samples: vec![StackSample::new(&["main", "search", "db_query"], 2)],
            }),
            ..Default::default()
        });
    }
    let interval = aggregator
        .flush(Utc.timestamp_millis_opt(10_000).unwrap())
        .unwrap()
        .unwrap();
    AggregateReport::new(vec![interval])
}

#[test]
fn test_report_round_trip_keeps_histogram_usable() {
    let report = flushed_report();
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("out/aggregates.json");

    write_aggregates(&report, &path).unwrap();
    let loaded = read_aggregates(&path).unwrap();

    assert_eq!(loaded, report);
    let summary = summarize(&loaded.intervals[0].transaction_types[0].overall).unwrap();
    assert_eq!(summary.transaction_count, 3);
    assert_eq!(summary.p50_millis, 200.0);
    assert_eq!(summary.max_millis, 300.0);
}

#[test]
fn test_flamegraph_of_merged_profile() {
    let report = flushed_report();
    let profile = report.intervals[0].transaction_types[0]
        .overall
        .main_thread_profile
        .as_ref()
        .unwrap();
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("flamegraph.svg");

    assert_eq!(profile.folded_stacks(), vec!["main;search;db_query 6".to_string()]);
    let svg = generate_flamegraph(profile, None).unwrap();
    write_svg(&svg, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("db_query"));
}

#[test]
fn test_read_aggregates_rejects_garbage() {
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "not json").unwrap();

    assert!(read_aggregates(temp_file.path()).is_err());
}
