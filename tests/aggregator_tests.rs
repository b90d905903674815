use apm_aggregator::aggregator::{
    AggregateCollector, AggregateLimits, Aggregator, ApproximateHistogram, ScratchBuffer,
};
use apm_aggregator::model::{
    QueryData, StackProfile, StackSample, ThreadStats, TimerNode, Transaction,
};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

const MILLIS: u64 = 1_000_000;

fn transaction(name: &str, duration_nanos: u64) -> Transaction {
    Transaction {
        transaction_type: "Web".to_string(),
        transaction_name: name.to_string(),
        duration_nanos,
        main_thread_root_timer: TimerNode::new("http request", duration_nanos, 1),
        ..Default::default()
    }
}

#[test]
fn test_build_totals() {
    let mut collector = AggregateCollector::new(None, &AggregateLimits::default());
    let mut failed = transaction("/checkout", 200 * MILLIS);
    failed.error_message = Some("timeout".to_string());

    collector.add(&transaction("/checkout", 100 * MILLIS));
    collector.add(&failed);
    let snapshot = collector.build(&mut ScratchBuffer::new()).unwrap();

    assert_eq!(snapshot.total_duration_nanos, 300_000_000);
    assert_eq!(snapshot.transaction_count, 2);
    assert_eq!(snapshot.error_count, 1);
}

#[test]
fn test_busy_collector_percentiles_survive_encoding() {
    let mut collector = AggregateCollector::new(None, &AggregateLimits::default());
    // 100 ms to 199.95 ms in 50 us steps, well past the raw value limit
    for i in 0..2_000u64 {
        collector.add(&transaction("/search", 100 * MILLIS + i * 50_000));
    }

    let snapshot = collector.build(&mut ScratchBuffer::new()).unwrap();
    let histogram = ApproximateHistogram::decode(&snapshot.duration_histogram).unwrap();

    assert!(histogram.is_bucketed());
    assert_eq!(histogram.count(), 2_000);
    assert_eq!(histogram.min(), Some(100 * MILLIS));
    assert_eq!(histogram.max(), Some(199_950_000));

    let within_one_percent = |actual: u64, expected: f64| {
        (actual as f64 - expected).abs() / expected < 0.01
    };
    let p50 = histogram.value_at_percentile(50.0).unwrap();
    let p99 = histogram.value_at_percentile(99.0).unwrap();
    assert!(within_one_percent(p50, 149_950_000.0), "p50 {}", p50);
    assert!(within_one_percent(p99, 198_950_000.0), "p99 {}", p99);

    let mean = histogram.mean().unwrap();
    assert!((mean - 149_975_000.0).abs() / 149_975_000.0 < 0.01, "mean {}", mean);
}

#[test]
fn test_same_named_root_timers_merge() {
    let mut collector = AggregateCollector::new(None, &AggregateLimits::default());
    let db = TimerNode::new("db", 50 * MILLIS, 1);

    collector.merge_main_thread_root_timer(&db);
    collector.merge_main_thread_root_timer(&db);
    let snapshot = collector.build(&mut ScratchBuffer::new()).unwrap();

    assert_eq!(snapshot.main_thread_root_timers.len(), 1);
    let merged = &snapshot.main_thread_root_timers[0];
    assert_eq!(merged.name, "db");
    assert_eq!(merged.total_nanos, 100 * MILLIS);
    assert_eq!(merged.count, 2);
}

#[test]
fn test_async_main_thread_stats_go_to_aux() {
    let mut collector = AggregateCollector::new(None, &AggregateLimits::default());
    let mut txn = transaction("/async", 10 * MILLIS);
    txn.asynchronous = true;
    txn.main_thread_stats = Some(ThreadStats {
        total_cpu_nanos: Some(3 * MILLIS),
        total_allocated_bytes: Some(4096),
        ..Default::default()
    });

    collector.add(&txn);
    let snapshot = collector.build(&mut ScratchBuffer::new()).unwrap();

    assert!(snapshot.main_thread_stats.is_none());
    let aux = snapshot.aux_thread_stats.unwrap();
    assert_eq!(aux.total_cpu_nanos, Some(3_000_000.0));
    assert_eq!(aux.total_allocated_bytes, Some(4096.0));
    assert_eq!(aux.total_blocked_nanos, None);
}

#[test]
fn test_timer_tree_merge_keeps_one_entry_per_name() {
    let mut collector = AggregateCollector::new(None, &AggregateLimits::default());
    let first = TimerNode::new("http request", 10, 1)
        .with_child(TimerNode::new("db", 4, 1))
        .with_child(TimerNode::new("render", 3, 1));
    let second = TimerNode::new("http request", 20, 1)
        .with_child(TimerNode::new("db", 6, 2).with_child(TimerNode::new("connect", 1, 1)));
    let other = TimerNode::new("scheduled job", 7, 1);

    collector.merge_main_thread_root_timer(&first);
    collector.merge_main_thread_root_timer(&second);
    collector.merge_main_thread_root_timer(&other);
    let snapshot = collector.build(&mut ScratchBuffer::new()).unwrap();

    let roots = &snapshot.main_thread_root_timers;
    assert_eq!(roots.len(), 2);
    let http = &roots[0];
    assert_eq!(http.total_nanos, 30);
    assert_eq!(http.count, 2);
    let child_names: Vec<&str> = http.child_timers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(child_names, vec!["db", "render"]);
    assert_eq!(http.child_timers[0].total_nanos, 10);
    assert_eq!(http.child_timers[0].count, 3);
    assert_eq!(http.child_timers[0].child_timers[0].name, "connect");
}

#[test]
fn test_add_all_folds_every_category() {
    let mut collector =
        AggregateCollector::new(Some("/report".to_string()), &AggregateLimits::default());
    let txn = Transaction {
        aux_thread_root_timers: vec![TimerNode::new("worker", 5, 1)],
        async_root_timers: vec![TimerNode::new("callback", 2, 1)],
        main_thread_profile: Some(StackProfile {
            samples: vec![StackSample::new(&["main", "report"], 2)],
        }),
        aux_thread_profile: Some(StackProfile {
            samples: vec![StackSample::new(&["worker"], 1)],
        }),
        queries: vec![QueryData {
            query_type: "SQL".to_string(),
            query_text: "select 1".to_string(),
            total_nanos: 9,
            execution_count: 3,
            total_rows: 3,
        }],
        ..transaction("/report", 20)
    };

    collector.add_all(&txn);
    let snapshot = collector.build(&mut ScratchBuffer::new()).unwrap();

    assert_eq!(snapshot.transaction_name.as_deref(), Some("/report"));
    assert_eq!(snapshot.main_thread_root_timers[0].name, "http request");
    assert_eq!(snapshot.aux_thread_root_timers[0].name, "worker");
    assert_eq!(snapshot.async_root_timers[0].name, "callback");
    assert_eq!(snapshot.main_thread_profile.unwrap().sample_count, 2);
    assert_eq!(snapshot.aux_thread_profile.unwrap().sample_count, 1);
    assert_eq!(snapshot.queries_by_type[0].queries[0].stats.execution_count, 3);
}

#[test]
fn test_concurrent_add_transaction() {
    let aggregator = Arc::new(Aggregator::new(60_000, AggregateLimits::default()));

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                for i in 0..250 {
                    let name = format!("/page{}", (worker + i) % 5);
                    aggregator.add_transaction(&transaction(&name, 1_000));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let now = Utc.timestamp_millis_opt(30_000).unwrap();
    let interval = aggregator.flush(now).unwrap().unwrap();

    assert_eq!(interval.capture_time.timestamp_millis(), 60_000);
    let web = &interval.transaction_types[0];
    assert_eq!(web.overall.transaction_count, 1_000);
    assert_eq!(web.transactions.len(), 5);
    let per_name: u64 = web.transactions.iter().map(|t| t.transaction_count).sum();
    assert_eq!(per_name, 1_000);
}
