//! Collector ownership for one aggregation interval and interval rotation.
//!
//! Worker threads completing transactions call [`Aggregator::add_transaction`]
//! concurrently. The aggregator's lock is the only way to reach a collector,
//! so every mutation of a collector happens under it. At the interval
//! boundary [`Aggregator::flush`] swaps in a fresh interval and builds the
//! snapshots of the old one without holding the lock: collectors are
//! replaced rather than reset, so no collector is ever shared between two
//! intervals.

use super::collector::{AggregateCollector, AggregateLimits};
use super::histogram::ScratchBuffer;
use super::snapshot::{AggregateSnapshot, IntervalSnapshot, TransactionTypeSnapshot};
use crate::model::Transaction;
use crate::utils::config::LIMIT_EXCEEDED_BUCKET;
use crate::utils::error::AggregateError;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// A flush whose build failed
///
/// Carries the rotated interval so its data survives until the caller
/// either builds it again or drops the error.
#[derive(Error, Debug)]
#[error("Failed to build aggregates for interval ending {capture_time}: {source}")]
pub struct FlushError {
    pub capture_time: DateTime<Utc>,
    pub interval: AggregateInterval,
    pub source: AggregateError,
}

/// Collectors of one transaction type
#[derive(Debug)]
struct TransactionTypeCollectors {
    overall: AggregateCollector,
    by_name: HashMap<String, AggregateCollector>,
    limit_exceeded: Option<AggregateCollector>,
}

impl TransactionTypeCollectors {
    fn new(limits: &AggregateLimits) -> Self {
        Self {
            overall: AggregateCollector::new(None, limits),
            by_name: HashMap::new(),
            limit_exceeded: None,
        }
    }

    /// Collector for a transaction name, or the limit-exceeded bucket once
    /// the type holds the maximum number of names
    fn collector_for_name(
        &mut self,
        transaction_type: &str,
        transaction_name: &str,
        limits: &AggregateLimits,
    ) -> &mut AggregateCollector {
        let max_names = limits.max_aggregate_transactions_per_transaction_type;
        if self.by_name.contains_key(transaction_name) || self.by_name.len() < max_names {
            return self
                .by_name
                .entry(transaction_name.to_string())
                .or_insert_with(|| {
                    AggregateCollector::new(Some(transaction_name.to_string()), limits)
                });
        }
        self.limit_exceeded.get_or_insert_with(|| {
            debug!(
                "Transaction type {} reached {} transaction names, using {}",
                transaction_type, max_names, LIMIT_EXCEEDED_BUCKET
            );
            AggregateCollector::new(Some(LIMIT_EXCEEDED_BUCKET.to_string()), limits)
        })
    }

    fn build(
        &self,
        transaction_type: &str,
        scratch: &mut ScratchBuffer,
    ) -> Result<TransactionTypeSnapshot, AggregateError> {
        let overall = self.overall.build(scratch)?;

        let mut transactions = Vec::with_capacity(self.by_name.len() + 1);
        for collector in self.by_name.values().chain(self.limit_exceeded.iter()) {
            transactions.push(collector.build(scratch)?);
        }
        transactions.sort_by(|a: &AggregateSnapshot, b: &AggregateSnapshot| {
            b.total_duration_nanos
                .cmp(&a.total_duration_nanos)
                .then_with(|| a.transaction_name.cmp(&b.transaction_name))
        });

        Ok(TransactionTypeSnapshot {
            transaction_type: transaction_type.to_string(),
            overall,
            transactions,
        })
    }
}

/// All collectors of one aggregation interval
#[derive(Debug)]
pub struct AggregateInterval {
    limits: AggregateLimits,
    types: HashMap<String, TransactionTypeCollectors>,
}

impl AggregateInterval {
    pub fn new(limits: AggregateLimits) -> Self {
        Self {
            limits,
            types: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn limits(&self) -> &AggregateLimits {
        &self.limits
    }

    /// Number of named collectors (including the limit-exceeded bucket) of
    /// a transaction type
    pub fn transaction_name_count(&self, transaction_type: &str) -> usize {
        self.types
            .get(transaction_type)
            .map(|c| c.by_name.len() + usize::from(c.limit_exceeded.is_some()))
            .unwrap_or(0)
    }

    /// Fold a transaction into the overall collector of its type and, when
    /// it has a name, into the collector of that name
    pub fn add(&mut self, transaction: &Transaction) {
        let limits = self.limits;
        let collectors = self
            .types
            .entry(transaction.transaction_type.clone())
            .or_insert_with(|| TransactionTypeCollectors::new(&limits));

        collectors.overall.add_all(transaction);
        if !transaction.transaction_name.is_empty() {
            collectors
                .collector_for_name(
                    &transaction.transaction_type,
                    &transaction.transaction_name,
                    &limits,
                )
                .add_all(transaction);
        }
    }

    /// Build snapshots of every collector, transaction types in name order
    ///
    /// # Errors
    /// * `AggregateError` - a histogram failed to encode; the interval is
    ///   untouched and may be built again
    pub fn build(
        &self,
        capture_time: DateTime<Utc>,
        scratch: &mut ScratchBuffer,
    ) -> Result<IntervalSnapshot, AggregateError> {
        let mut names: Vec<&String> = self.types.keys().collect();
        names.sort();

        let mut transaction_types = Vec::with_capacity(names.len());
        for name in names {
            transaction_types.push(self.types[name].build(name, scratch)?);
        }

        Ok(IntervalSnapshot {
            capture_time,
            transaction_types,
        })
    }
}

struct AggregatorState {
    interval: AggregateInterval,
    next_limits: AggregateLimits,
}

/// Thread-safe owner of the current aggregation interval
pub struct Aggregator {
    interval_millis: u64,
    state: Mutex<AggregatorState>,
}

impl Aggregator {
    /// Create an aggregator
    ///
    /// # Arguments
    /// * `interval_millis` - length of one aggregation interval
    /// * `limits` - cardinality caps for the first interval
    pub fn new(interval_millis: u64, limits: AggregateLimits) -> Self {
        Self {
            interval_millis: interval_millis.max(1),
            state: Mutex::new(AggregatorState {
                interval: AggregateInterval::new(limits),
                next_limits: limits,
            }),
        }
    }

    pub fn interval_millis(&self) -> u64 {
        self.interval_millis
    }

    /// Fold a completed transaction into the current interval
    pub fn add_transaction(&self, transaction: &Transaction) {
        self.lock().interval.add(transaction);
    }

    /// Change the caps used from the next interval on
    ///
    /// Collectors of the running interval keep the caps they were built with.
    pub fn update_limits(&self, limits: AggregateLimits) {
        self.lock().next_limits = limits;
    }

    /// Swap in a fresh interval and hand back the finished one
    ///
    /// Callers that want to retry a failed build keep the returned interval.
    pub fn rotate(&self) -> AggregateInterval {
        let mut state = self.lock();
        let fresh = AggregateInterval::new(state.next_limits);
        std::mem::replace(&mut state.interval, fresh)
    }

    /// Rotate and build the finished interval's snapshots
    ///
    /// Returns `Ok(None)` when no transaction completed during the interval.
    /// The lock is released before any snapshot is built.
    ///
    /// # Errors
    /// * `FlushError` - building failed; the error owns the finished interval
    pub fn flush(&self, now: DateTime<Utc>) -> Result<Option<IntervalSnapshot>, FlushError> {
        let interval = self.rotate();
        if interval.is_empty() {
            debug!("Nothing to flush");
            return Ok(None);
        }
        let capture_time = interval_capture_time(now, self.interval_millis);
        let mut scratch = ScratchBuffer::new();
        let snapshot =
            build_or_hand_back(interval, capture_time, |i| i.build(capture_time, &mut scratch))?;
        info!(
            "Flushed {} transaction type(s) for interval ending {}",
            snapshot.transaction_types.len(),
            capture_time.to_rfc3339()
        );
        Ok(Some(snapshot))
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // collectors hold plain data, a panic mid-update leaves nothing to repair
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn build_or_hand_back(
    interval: AggregateInterval,
    capture_time: DateTime<Utc>,
    build: impl FnOnce(&AggregateInterval) -> Result<IntervalSnapshot, AggregateError>,
) -> Result<IntervalSnapshot, FlushError> {
    build(&interval).map_err(|source| FlushError {
        capture_time,
        interval,
        source,
    })
}

/// Round `now` up to the end of the interval containing it
///
/// **Public** - shared with replay, which derives capture times from
/// recorded timestamps
pub fn interval_capture_time(now: DateTime<Utc>, interval_millis: u64) -> DateTime<Utc> {
    let interval = interval_millis.max(1) as i64;
    let millis = now.timestamp_millis();
    let remainder = millis.rem_euclid(interval);
    let rounded = if remainder == 0 {
        millis
    } else {
        millis - remainder + interval
    };
    Utc.timestamp_millis_opt(rounded).single().unwrap_or(now)
}
