//! Completed transaction records handed to the aggregation engine.
//!
//! These are produced upstream by the transaction-processing pipeline.
//! The engine trusts them to be well formed and does not validate them.

use serde::{Deserialize, Serialize};

/// One completed unit of monitored work (e.g. one request)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction type, e.g. "Web" or "Background"
    pub transaction_type: String,

    /// Transaction name, e.g. "/checkout"
    pub transaction_name: String,

    /// Total duration in nanoseconds
    pub duration_nanos: u64,

    /// Error message, present when the transaction failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Whether the work continued on other threads after the initiating
    /// thread returned
    #[serde(default)]
    pub asynchronous: bool,

    /// Root timer of the thread that started the transaction
    pub main_thread_root_timer: TimerNode,

    #[serde(default)]
    pub aux_thread_root_timers: Vec<TimerNode>,

    #[serde(default)]
    pub async_root_timers: Vec<TimerNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_thread_stats: Option<ThreadStats>,

    #[serde(default)]
    pub aux_thread_stats: Vec<ThreadStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_thread_profile: Option<StackProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_thread_profile: Option<StackProfile>,

    #[serde(default)]
    pub queries: Vec<QueryData>,
}

impl Transaction {
    /// Whether this transaction counts towards the error count
    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }
}

/// A named, possibly nested span of elapsed time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerNode {
    pub name: String,

    /// Marks a timer that wraps/extends another timer
    #[serde(default)]
    pub extended: bool,

    pub total_nanos: u64,

    pub count: u64,

    #[serde(default)]
    pub children: Vec<TimerNode>,
}

impl TimerNode {
    /// Create a leaf timer
    pub fn new(name: impl Into<String>, total_nanos: u64, count: u64) -> Self {
        Self {
            name: name.into(),
            extended: false,
            total_nanos,
            count,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: TimerNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }
}

/// Per-thread resource counters
///
/// Each counter is independently optional: the runtime (or OS) may not support
/// measuring it, or measurement may be disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadStats {
    #[serde(default)]
    pub total_cpu_nanos: Option<u64>,

    #[serde(default)]
    pub total_blocked_millis: Option<u64>,

    #[serde(default)]
    pub total_waited_millis: Option<u64>,

    #[serde(default)]
    pub total_allocated_bytes: Option<u64>,
}

/// Accumulated statistics for one query text within one transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryData {
    /// Query type, e.g. "SQL" or "CQL"
    pub query_type: String,

    pub query_text: String,

    pub total_nanos: u64,

    pub execution_count: u64,

    #[serde(default)]
    pub total_rows: u64,
}

/// Stack-trace samples captured for one thread category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackProfile {
    pub samples: Vec<StackSample>,
}

/// A sampled stack trace, frames ordered from the root (outermost) frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackSample {
    pub frames: Vec<String>,

    /// Number of times this exact stack was sampled
    #[serde(default = "default_sample_count")]
    pub count: u64,
}

fn default_sample_count() -> u64 {
    1
}

impl StackSample {
    pub fn new(frames: &[&str], count: u64) -> Self {
        Self {
            frames: frames.iter().map(|f| f.to_string()).collect(),
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_from_minimal_json() {
        let json = r#"{
            "transaction_type": "Web",
            "transaction_name": "/home",
            "duration_nanos": 1000,
            "main_thread_root_timer": { "name": "http request", "total_nanos": 1000, "count": 1 }
        }"#;

        let transaction: Transaction = serde_json::from_str(json).unwrap();

        assert_eq!(transaction.transaction_type, "Web");
        assert!(!transaction.is_error());
        assert!(!transaction.asynchronous);
        assert!(transaction.queries.is_empty());
        assert!(transaction.main_thread_stats.is_none());
    }

    #[test]
    fn test_stack_sample_count_defaults_to_one() {
        let sample: StackSample = serde_json::from_str(r#"{ "frames": ["a", "b"] }"#).unwrap();
        assert_eq!(sample.count, 1);
    }
}
