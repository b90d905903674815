//! Per-(transaction type, transaction name) accumulator.

use super::histogram::{ApproximateHistogram, ScratchBuffer};
use super::profile::MutableProfile;
use super::query::QueryCollector;
use super::snapshot::{AggregateSnapshot, TimerSnapshot};
use super::thread_stats::MutableThreadStats;
use super::timer::{merge_root_timer, MutableTimer};
use crate::model::{QueryData, StackProfile, TimerNode, Transaction};
use crate::utils::config::{
    DEFAULT_MAX_AGGREGATE_QUERIES_PER_QUERY_TYPE,
    DEFAULT_MAX_AGGREGATE_TRANSACTIONS_PER_TRANSACTION_TYPE,
    OVERALL_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER,
    TRANSACTION_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER,
};
use crate::utils::error::AggregateError;
use log::warn;

/// Cardinality caps read at collector construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateLimits {
    pub max_aggregate_queries_per_query_type: usize,
    pub max_aggregate_transactions_per_transaction_type: usize,
    pub overall_queries_hard_limit_multiplier: usize,
    pub transaction_queries_hard_limit_multiplier: usize,
}

impl Default for AggregateLimits {
    fn default() -> Self {
        Self {
            max_aggregate_queries_per_query_type: DEFAULT_MAX_AGGREGATE_QUERIES_PER_QUERY_TYPE,
            max_aggregate_transactions_per_transaction_type:
                DEFAULT_MAX_AGGREGATE_TRANSACTIONS_PER_TRANSACTION_TYPE,
            overall_queries_hard_limit_multiplier: OVERALL_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER,
            transaction_queries_hard_limit_multiplier:
                TRANSACTION_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER,
        }
    }
}

/// Accumulates all transactions of one transaction type (overall) or one
/// transaction name during one aggregation interval
///
/// The collector is not synchronized. All mutation goes through `&mut self`,
/// so sharing one between threads requires an owner that hands out exclusive
/// access, which is what [`Aggregator`](super::Aggregator) does with its
/// lock. At the end of the interval the collector is built once and dropped.
#[derive(Debug, Clone)]
pub struct AggregateCollector {
    transaction_name: Option<String>,
    total_duration_nanos: u64,
    transaction_count: u64,
    error_count: u64,
    main_thread_root_timers: Vec<MutableTimer>,
    aux_thread_root_timers: Vec<MutableTimer>,
    async_root_timers: Vec<MutableTimer>,
    main_thread_stats: MutableThreadStats,
    aux_thread_stats: MutableThreadStats,
    // nanosecond values, microsecond precision once bucketed
    duration_histogram: ApproximateHistogram,
    main_thread_profile: MutableProfile,
    aux_thread_profile: MutableProfile,
    queries: QueryCollector,
}

impl AggregateCollector {
    /// Create a collector
    ///
    /// # Arguments
    /// * `transaction_name` - `None` for the overall aggregate of a type
    /// * `limits` - query caps; the overall aggregate sees more distinct
    ///   queries and gets the larger working-set multiplier
    pub fn new(transaction_name: Option<String>, limits: &AggregateLimits) -> Self {
        let hard_limit_multiplier = if transaction_name.is_none() {
            limits.overall_queries_hard_limit_multiplier
        } else {
            limits.transaction_queries_hard_limit_multiplier
        };
        Self {
            transaction_name,
            total_duration_nanos: 0,
            transaction_count: 0,
            error_count: 0,
            main_thread_root_timers: Vec::new(),
            aux_thread_root_timers: Vec::new(),
            async_root_timers: Vec::new(),
            main_thread_stats: MutableThreadStats::new(),
            aux_thread_stats: MutableThreadStats::new(),
            duration_histogram: ApproximateHistogram::new(),
            main_thread_profile: MutableProfile::new(),
            aux_thread_profile: MutableProfile::new(),
            queries: QueryCollector::new(
                limits.max_aggregate_queries_per_query_type,
                hard_limit_multiplier,
            ),
        }
    }

    pub fn transaction_name(&self) -> Option<&str> {
        self.transaction_name.as_deref()
    }

    pub fn total_duration_nanos(&self) -> u64 {
        self.total_duration_nanos
    }

    pub fn transaction_count(&self) -> u64 {
        self.transaction_count
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Fold a transaction's totals, thread stats and duration in
    ///
    /// Timers, profiles and queries are merged separately through the
    /// `merge_*` methods.
    pub fn add(&mut self, transaction: &Transaction) {
        self.total_duration_nanos =
            self.total_duration_nanos.saturating_add(transaction.duration_nanos);
        self.transaction_count += 1;
        if transaction.is_error() {
            self.error_count += 1;
        }
        if let Some(stats) = &transaction.main_thread_stats {
            if transaction.asynchronous {
                // the initiating thread of an async transaction is just
                // another worker thread
                self.aux_thread_stats.add_thread_stats(stats);
            } else {
                self.main_thread_stats.add_thread_stats(stats);
            }
        }
        for stats in &transaction.aux_thread_stats {
            self.aux_thread_stats.add_thread_stats(stats);
        }
        if let Err(e) = self.duration_histogram.add(transaction.duration_nanos) {
            let name = self.transaction_name().unwrap_or("(overall)");
            warn!("Duration not recorded for {}: {}", name, e);
        }
    }

    pub fn merge_main_thread_root_timer(&mut self, timer: &TimerNode) {
        merge_root_timer(&mut self.main_thread_root_timers, timer);
    }

    pub fn merge_aux_thread_root_timer(&mut self, timer: &TimerNode) {
        merge_root_timer(&mut self.aux_thread_root_timers, timer);
    }

    pub fn merge_async_root_timer(&mut self, timer: &TimerNode) {
        merge_root_timer(&mut self.async_root_timers, timer);
    }

    pub fn merge_main_thread_profile(&mut self, profile: &StackProfile) {
        self.main_thread_profile.merge(profile);
    }

    pub fn merge_aux_thread_profile(&mut self, profile: &StackProfile) {
        self.aux_thread_profile.merge(profile);
    }

    pub fn merge_queries<'a>(&mut self, queries: impl IntoIterator<Item = &'a QueryData>) {
        for query in queries {
            self.queries.merge_query(
                &query.query_type,
                &query.query_text,
                query.total_nanos,
                query.execution_count,
                query.total_rows,
            );
        }
    }

    /// Fold every part of a transaction in: totals, all timer categories,
    /// both profiles and its queries
    pub fn add_all(&mut self, transaction: &Transaction) {
        self.add(transaction);
        self.merge_main_thread_root_timer(&transaction.main_thread_root_timer);
        for timer in &transaction.aux_thread_root_timers {
            self.merge_aux_thread_root_timer(timer);
        }
        for timer in &transaction.async_root_timers {
            self.merge_async_root_timer(timer);
        }
        if let Some(profile) = &transaction.main_thread_profile {
            self.merge_main_thread_profile(profile);
        }
        if let Some(profile) = &transaction.aux_thread_profile {
            self.merge_aux_thread_profile(profile);
        }
        self.merge_queries(&transaction.queries);
    }

    /// Produce the immutable snapshot of this interval
    ///
    /// Thread stats are included only when at least one field is available
    /// and profiles only when they hold samples. Query stats are truncated
    /// to the configured per-type maximum.
    ///
    /// # Errors
    /// * `AggregateError::Histogram` - duration histogram encoding failed;
    ///   the collector is left untouched
    pub fn build(&self, scratch: &mut ScratchBuffer) -> Result<AggregateSnapshot, AggregateError> {
        let duration_histogram = self.duration_histogram.encode(scratch)?;

        Ok(AggregateSnapshot {
            transaction_name: self.transaction_name.clone(),
            total_duration_nanos: self.total_duration_nanos,
            transaction_count: self.transaction_count,
            error_count: self.error_count,
            main_thread_root_timers: root_timer_snapshots(&self.main_thread_root_timers),
            aux_thread_root_timers: root_timer_snapshots(&self.aux_thread_root_timers),
            async_root_timers: root_timer_snapshots(&self.async_root_timers),
            duration_histogram,
            main_thread_stats: (!self.main_thread_stats.is_empty())
                .then(|| self.main_thread_stats.to_snapshot()),
            aux_thread_stats: (!self.aux_thread_stats.is_empty())
                .then(|| self.aux_thread_stats.to_snapshot()),
            main_thread_profile: (self.main_thread_profile.sample_count() > 0)
                .then(|| self.main_thread_profile.to_snapshot()),
            aux_thread_profile: (self.aux_thread_profile.sample_count() > 0)
                .then(|| self.aux_thread_profile.to_snapshot()),
            queries_by_type: self.queries.to_snapshot(true),
        })
    }
}

fn root_timer_snapshots(root_timers: &[MutableTimer]) -> Vec<TimerSnapshot> {
    root_timers.iter().map(MutableTimer::to_snapshot).collect()
}
