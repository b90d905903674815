use apm_aggregator::commands::{execute_replay, validate_args, ReplayArgs};
use apm_aggregator::output::read_aggregates;
use pretty_assertions::assert_eq;

const TRANSACTIONS: &str = r#"[
    {
        "completed_at": "2024-01-01T00:01:30Z",
        "transaction_type": "Web",
        "transaction_name": "/cart",
        "duration_nanos": 200000000,
        "error_message": "out of stock",
        "main_thread_root_timer": { "name": "http request", "total_nanos": 200000000, "count": 1 },
        "queries": [
            { "query_type": "SQL", "query_text": "select * from cart", "total_nanos": 5000000, "execution_count": 2 }
        ]
    },
    {
        "completed_at": "2024-01-01T00:00:10Z",
        "transaction_type": "Web",
        "transaction_name": "/cart",
        "duration_nanos": 100000000,
        "main_thread_root_timer": { "name": "http request", "total_nanos": 100000000, "count": 1 },
        "main_thread_profile": { "samples": [ { "frames": ["main", "cart"], "count": 3 } ] }
    },
    {
        "completed_at": "2024-01-01T00:00:20Z",
        "transaction_type": "Background",
        "transaction_name": "",
        "duration_nanos": 7000,
        "main_thread_root_timer": { "name": "job", "total_nanos": 7000, "count": 1 }
    }
]"#;

#[test]
fn test_replay_writes_interval_aggregates() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("transactions.json");
    let output = temp_dir.path().join("aggregates.json");
    let svg = temp_dir.path().join("flamegraph.svg");
    std::fs::write(&input, TRANSACTIONS).unwrap();

    let args = ReplayArgs {
        input,
        output_json: output.clone(),
        output_svg: Some(svg.clone()),
        ..Default::default()
    };
    validate_args(&args).unwrap();
    execute_replay(args).unwrap();

    let report = read_aggregates(&output).unwrap();
    assert_eq!(report.intervals.len(), 2);

    let first = &report.intervals[0];
    assert_eq!(first.capture_time.to_rfc3339(), "2024-01-01T00:01:00+00:00");
    let types: Vec<&str> = first
        .transaction_types
        .iter()
        .map(|t| t.transaction_type.as_str())
        .collect();
    assert_eq!(types, vec!["Background", "Web"]);
    // unnamed transactions only feed the overall aggregate
    assert!(first.transaction_types[0].transactions.is_empty());

    let second = &report.intervals[1].transaction_types[0];
    assert_eq!(second.overall.error_count, 1);
    assert_eq!(second.transactions[0].queries_by_type[0].queries[0].stats.execution_count, 2);

    assert!(svg.exists());
}
