//! Aggregation of completed transactions into interval summaries.
//!
//! This module folds transactions into:
//! - Name-merged timer trees per thread category
//! - Duration histograms
//! - Thread resource totals and merged stack profiles
//! - Bounded per-query statistics
//!
//! and builds immutable snapshots of them at the end of each interval.

pub mod collector;
pub mod histogram;
pub mod interval;
pub mod metrics;
pub mod profile;
pub mod query;
pub mod snapshot;
pub mod thread_stats;
pub mod timer;

// Re-export main types and functions
pub use collector::{AggregateCollector, AggregateLimits};
pub use histogram::{ApproximateHistogram, ScratchBuffer};
pub use interval::{interval_capture_time, AggregateInterval, Aggregator, FlushError};
pub use metrics::{calculate_hot_timers, summarize, AggregateSummary, HotTimer};
pub use profile::MutableProfile;
pub use query::QueryCollector;
pub use snapshot::{
    AggregateSnapshot, IntervalSnapshot, ProfileNodeSnapshot, ProfileSnapshot, QueriesByType,
    QuerySnapshot, QueryStatsSnapshot, ThreadStatsSnapshot, TimerSnapshot, TransactionTypeSnapshot,
};
pub use thread_stats::MutableThreadStats;
pub use timer::{merge_root_timer, MutableTimer};
