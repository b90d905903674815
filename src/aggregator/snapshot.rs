//! Immutable aggregate snapshots handed to the storage/reporting layer.
//!
//! Snapshots are plain serde data: the JSON writer, the central client and
//! the CLI `inspect` command all consume this exact shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one collector (overall or one transaction name) for one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// `None` for the overall aggregate of a transaction type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_name: Option<String>,

    pub total_duration_nanos: u64,

    pub transaction_count: u64,

    pub error_count: u64,

    pub main_thread_root_timers: Vec<TimerSnapshot>,

    pub aux_thread_root_timers: Vec<TimerSnapshot>,

    pub async_root_timers: Vec<TimerSnapshot>,

    /// Binary encoded [`ApproximateHistogram`](super::ApproximateHistogram)
    /// of transaction durations
    pub duration_histogram: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_thread_stats: Option<ThreadStatsSnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_thread_stats: Option<ThreadStatsSnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_thread_profile: Option<ProfileSnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_thread_profile: Option<ProfileSnapshot>,

    /// Ordered by total duration, descending
    pub queries_by_type: Vec<QueriesByType>,
}

impl AggregateSnapshot {
    /// Display name, "(overall)" for the overall aggregate
    pub fn display_name(&self) -> &str {
        self.transaction_name.as_deref().unwrap_or("(overall)")
    }
}

/// Merged timer node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub name: String,

    pub extended: bool,

    pub total_nanos: u64,

    pub count: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_timers: Vec<TimerSnapshot>,
}

/// Thread resource totals; each field is absent when no contributing
/// thread reported it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadStatsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cpu_nanos: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_blocked_nanos: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_waited_nanos: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_allocated_bytes: Option<f64>,
}

/// Merged stack-trace sample tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub sample_count: u64,

    pub roots: Vec<ProfileNodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileNodeSnapshot {
    pub frame: String,

    /// Samples whose stack passed through this frame
    pub sample_count: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProfileNodeSnapshot>,
}

impl ProfileSnapshot {
    /// Collapsed stacks ("root;child;leaf count"), one line per distinct
    /// stack that had samples ending at its leaf
    ///
    /// This is the input format of flamegraph renderers.
    pub fn folded_stacks(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut path = Vec::new();
        for root in &self.roots {
            fold_node(root, &mut path, &mut lines);
        }
        lines
    }
}

fn fold_node<'a>(node: &'a ProfileNodeSnapshot, path: &mut Vec<&'a str>, lines: &mut Vec<String>) {
    path.push(&node.frame);

    let child_samples: u64 = node.children.iter().map(|c| c.sample_count).sum();
    let self_samples = node.sample_count.saturating_sub(child_samples);
    if self_samples > 0 {
        lines.push(format!("{} {}", path.join(";"), self_samples));
    }
    for child in &node.children {
        fold_node(child, path, lines);
    }

    path.pop();
}

/// Query statistics of one query type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriesByType {
    pub query_type: String,

    /// Ordered by total duration, descending
    pub queries: Vec<QuerySnapshot>,

    /// Totals of query texts that were not kept individually
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overflow: Option<QueryStatsSnapshot>,
}

impl QueriesByType {
    pub fn total_nanos(&self) -> u64 {
        self.queries
            .iter()
            .map(|q| q.stats.total_nanos)
            .chain(self.overflow.map(|o| o.total_nanos))
            .fold(0u64, u64::saturating_add)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySnapshot {
    pub query_text: String,

    #[serde(flatten)]
    pub stats: QueryStatsSnapshot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatsSnapshot {
    pub total_nanos: u64,

    pub execution_count: u64,

    pub total_rows: u64,
}

/// All aggregates of one transaction type for one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTypeSnapshot {
    pub transaction_type: String,

    pub overall: AggregateSnapshot,

    /// Per transaction name, ordered by total duration, descending
    pub transactions: Vec<AggregateSnapshot>,
}

/// Output of one interval flush
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalSnapshot {
    /// End of the interval the aggregates cover
    pub capture_time: DateTime<Utc>,

    pub transaction_types: Vec<TransactionTypeSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(
        frame: &str,
        sample_count: u64,
        children: Vec<ProfileNodeSnapshot>,
    ) -> ProfileNodeSnapshot {
        ProfileNodeSnapshot {
            frame: frame.to_string(),
            sample_count,
            children,
        }
    }

    #[test]
    fn test_folded_stacks_uses_self_samples() {
        let profile = ProfileSnapshot {
            sample_count: 10,
            roots: vec![node(
                "main",
                10,
                vec![node("service", 7, vec![node("db_query", 4, vec![])])],
            )],
        };

        let lines = profile.folded_stacks();

        assert_eq!(
            lines,
            vec![
                "main 3".to_string(),
                "main;service 3".to_string(),
                "main;service;db_query 4".to_string(),
            ]
        );
    }

    #[test]
    fn test_queries_by_type_total_includes_overflow() {
        let queries = QueriesByType {
            query_type: "SQL".to_string(),
            queries: vec![QuerySnapshot {
                query_text: "select 1".to_string(),
                stats: QueryStatsSnapshot {
                    total_nanos: 100,
                    execution_count: 1,
                    total_rows: 1,
                },
            }],
            overflow: Some(QueryStatsSnapshot {
                total_nanos: 50,
                execution_count: 2,
                total_rows: 0,
            }),
        };

        assert_eq!(queries.total_nanos(), 150);
    }
}
