//! Summary metrics and hot timers derived from aggregate snapshots.
//!
//! Hot timers are the timer paths that account for the most time.
//! These are the first places to look when an aggregate is slow.

use super::histogram::ApproximateHistogram;
use super::snapshot::{AggregateSnapshot, TimerSnapshot};
use crate::utils::error::HistogramError;
use log::debug;
use serde::Serialize;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// A timer path with its accumulated time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotTimer {
    /// Timer names from the root, separated by ';'
    pub path: String,

    pub total_nanos: u64,

    pub count: u64,

    /// Share of the aggregate's total transaction duration
    pub percentage: f64,
}

/// Calculate the hottest main-thread timer paths
///
/// **Public** - main entry point for hot timer analysis
///
/// # Arguments
/// * `snapshot` - Aggregate to analyze
/// * `top_n` - Number of paths to return (e.g., 10)
///
/// # Returns
/// Timer paths at every depth, sorted by total time (descending)
pub fn calculate_hot_timers(snapshot: &AggregateSnapshot, top_n: usize) -> Vec<HotTimer> {
    let mut timers = Vec::new();
    let mut path = Vec::new();
    for root in &snapshot.main_thread_root_timers {
        collect_paths(root, &mut path, &mut timers);
    }
    debug!("Ranking {} timer paths for {}", timers.len(), snapshot.display_name());

    let total = snapshot.total_duration_nanos;
    let mut hot: Vec<HotTimer> = timers
        .into_iter()
        .map(|(path, timer)| HotTimer {
            path,
            total_nanos: timer.total_nanos,
            count: timer.count,
            percentage: percentage(timer.total_nanos, total),
        })
        .collect();
    hot.sort_by(|a, b| b.total_nanos.cmp(&a.total_nanos));
    hot.truncate(top_n);
    hot
}

fn collect_paths<'a>(
    timer: &'a TimerSnapshot,
    path: &mut Vec<&'a str>,
    out: &mut Vec<(String, &'a TimerSnapshot)>,
) {
    path.push(&timer.name);
    out.push((path.join(";"), timer));
    for child in &timer.child_timers {
        collect_paths(child, path, out);
    }
    path.pop();
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Headline numbers of one aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub transaction_count: u64,
    pub error_count: u64,
    pub error_rate_percentage: f64,
    pub mean_millis: f64,
    pub p50_millis: f64,
    pub p95_millis: f64,
    pub p99_millis: f64,
    pub max_millis: f64,
}

impl AggregateSummary {
    /// Human-readable one-line summary
    ///
    /// **Public** - for logging and the CLI
    pub fn summary(&self) -> String {
        format!(
            "Count: {} | Errors: {} ({:.1}%) | Mean: {:.1} ms | \
             p50: {:.1} ms | p95: {:.1} ms | p99: {:.1} ms | Max: {:.1} ms",
            self.transaction_count,
            self.error_count,
            self.error_rate_percentage,
            self.mean_millis,
            self.p50_millis,
            self.p95_millis,
            self.p99_millis,
            self.max_millis
        )
    }
}

/// Summarize an aggregate, decoding its duration histogram for percentiles
///
/// # Errors
/// * `HistogramError` - the encoded histogram is corrupt
pub fn summarize(snapshot: &AggregateSnapshot) -> Result<AggregateSummary, HistogramError> {
    if snapshot.transaction_count == 0 {
        return Ok(AggregateSummary::default());
    }
    let histogram = ApproximateHistogram::decode(&snapshot.duration_histogram)?;
    let millis_at = |p: f64| histogram.value_at_percentile(p).unwrap_or(0) as f64 / NANOS_PER_MILLI;

    Ok(AggregateSummary {
        transaction_count: snapshot.transaction_count,
        error_count: snapshot.error_count,
        error_rate_percentage: percentage(snapshot.error_count, snapshot.transaction_count),
        mean_millis: snapshot.total_duration_nanos as f64
            / snapshot.transaction_count as f64
            / NANOS_PER_MILLI,
        p50_millis: millis_at(50.0),
        p95_millis: millis_at(95.0),
        p99_millis: millis_at(99.0),
        max_millis: histogram.max().unwrap_or(0) as f64 / NANOS_PER_MILLI,
    })
}
