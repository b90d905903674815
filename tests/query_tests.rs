use apm_aggregator::aggregator::QueryCollector;

#[test]
fn test_hard_limit_bounds_tracked_texts() {
    let mut collector = QueryCollector::new(5, 2);

    for i in 0..50 {
        collector.merge_query("SQL", &format!("select {}", i), 10, 1, 0);
    }

    assert_eq!(collector.tracked_texts("SQL"), 10);
    let snapshot = collector.to_snapshot(false);
    assert_eq!(snapshot[0].queries.len(), 10);
    // nothing is lost, only folded
    assert_eq!(snapshot[0].total_nanos(), 500);
    assert_eq!(snapshot[0].overflow.unwrap().execution_count, 40);
}

#[test]
fn test_finalize_emits_soft_cap_by_total_duration() {
    let mut collector = QueryCollector::new(3, 10);

    for (i, nanos) in [5, 50, 1, 40, 30, 2].into_iter().enumerate() {
        collector.merge_query("SQL", &format!("q{}", i), nanos, 1, 1);
    }

    let snapshot = collector.to_snapshot(true);
    let texts: Vec<&str> = snapshot[0].queries.iter().map(|q| q.query_text.as_str()).collect();

    assert_eq!(texts, vec!["q1", "q3", "q4"]);
    let overflow = snapshot[0].overflow.unwrap();
    assert_eq!(overflow.total_nanos, 8);
    assert_eq!(overflow.execution_count, 3);
}

#[test]
fn test_ties_are_deterministic() {
    let build = || {
        let mut collector = QueryCollector::new(2, 1);
        for text in ["c", "a", "b"] {
            collector.merge_query("SQL", text, 10, 1, 0);
        }
        collector.to_snapshot(true)
    };

    let first = build();
    let second = build();

    assert_eq!(first, second);
    let texts: Vec<&str> = first[0].queries.iter().map(|q| q.query_text.as_str()).collect();
    assert_eq!(texts, vec!["c", "a"]);
}

#[test]
fn test_existing_texts_keep_accumulating_at_limit() {
    let mut collector = QueryCollector::new(1, 1);
    collector.merge_query("SQL", "kept", 10, 1, 0);
    collector.merge_query("SQL", "dropped", 10, 1, 0);
    collector.merge_query("SQL", "kept", 10, 1, 0);

    let snapshot = collector.to_snapshot(true);

    assert_eq!(snapshot[0].queries.len(), 1);
    assert_eq!(snapshot[0].queries[0].stats.total_nanos, 20);
    assert_eq!(snapshot[0].queries[0].stats.execution_count, 2);
}

#[test]
fn test_types_ordered_by_total_duration() {
    let mut collector = QueryCollector::new(10, 2);
    collector.merge_query("SQL", "select 1", 10, 1, 0);
    collector.merge_query("CQL", "select 2", 30, 1, 0);
    collector.merge_query("HTTP", "GET /", 20, 1, 0);

    let types: Vec<String> = collector
        .to_snapshot(true)
        .into_iter()
        .map(|t| t.query_type)
        .collect();

    assert_eq!(types, vec!["CQL", "HTTP", "SQL"]);
}
