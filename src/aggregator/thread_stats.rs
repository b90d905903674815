//! Accumulation of optional per-thread resource counters.

use super::snapshot::ThreadStatsSnapshot;
use crate::model::ThreadStats;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Per-field sum of thread resource counters
///
/// A field stays `None` until some thread reports a value for it. Threads
/// that could not measure a field contribute nothing to it, so one
/// unavailable reading never erases the readings of other threads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MutableThreadStats {
    total_cpu_nanos: Option<f64>,
    total_blocked_nanos: Option<f64>,
    total_waited_nanos: Option<f64>,
    total_allocated_bytes: Option<f64>,
}

/// Add two optional counters
///
/// `Some + Some` sums, `Some + None` keeps the available side, `None + None`
/// stays unavailable.
pub fn combine(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

impl MutableThreadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one thread's counters in
    pub fn add_thread_stats(&mut self, stats: &ThreadStats) {
        self.total_cpu_nanos =
            combine(self.total_cpu_nanos, stats.total_cpu_nanos.map(|v| v as f64));
        self.total_blocked_nanos = combine(
            self.total_blocked_nanos,
            stats.total_blocked_millis.map(|v| v as f64 * NANOS_PER_MILLI),
        );
        self.total_waited_nanos = combine(
            self.total_waited_nanos,
            stats.total_waited_millis.map(|v| v as f64 * NANOS_PER_MILLI),
        );
        self.total_allocated_bytes = combine(
            self.total_allocated_bytes,
            stats.total_allocated_bytes.map(|v| v as f64),
        );
    }

    /// True when no field has an available value
    pub fn is_empty(&self) -> bool {
        self.total_cpu_nanos.is_none()
            && self.total_blocked_nanos.is_none()
            && self.total_waited_nanos.is_none()
            && self.total_allocated_bytes.is_none()
    }

    pub fn to_snapshot(&self) -> ThreadStatsSnapshot {
        ThreadStatsSnapshot {
            total_cpu_nanos: self.total_cpu_nanos,
            total_blocked_nanos: self.total_blocked_nanos,
            total_waited_nanos: self.total_waited_nanos,
            total_allocated_bytes: self.total_allocated_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_table() {
        assert_eq!(combine(Some(2.0), Some(3.0)), Some(5.0));
        assert_eq!(combine(Some(2.0), None), Some(2.0));
        assert_eq!(combine(None, Some(3.0)), Some(3.0));
        assert_eq!(combine(None, None), None);
    }

    #[test]
    fn test_new_stats_are_empty() {
        let stats = MutableThreadStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.to_snapshot(), ThreadStatsSnapshot::default());
    }

    #[test]
    fn test_fields_are_independent() {
        let mut stats = MutableThreadStats::new();
        stats.add_thread_stats(&ThreadStats {
            total_cpu_nanos: Some(1_000),
            ..Default::default()
        });
        stats.add_thread_stats(&ThreadStats {
            total_cpu_nanos: None,
            total_allocated_bytes: Some(4_096),
            ..Default::default()
        });

        let snapshot = stats.to_snapshot();
        assert!(!stats.is_empty());
        assert_eq!(snapshot.total_cpu_nanos, Some(1_000.0));
        assert_eq!(snapshot.total_allocated_bytes, Some(4_096.0));
        assert_eq!(snapshot.total_blocked_nanos, None);
        assert_eq!(snapshot.total_waited_nanos, None);
    }

    #[test]
    fn test_blocked_and_waited_are_converted_to_nanos() {
        let mut stats = MutableThreadStats::new();
        stats.add_thread_stats(&ThreadStats {
            total_blocked_millis: Some(3),
            total_waited_millis: Some(0),
            ..Default::default()
        });

        let snapshot = stats.to_snapshot();
        assert_eq!(snapshot.total_blocked_nanos, Some(3_000_000.0));
        // zero is an available reading, not "not available"
        assert_eq!(snapshot.total_waited_nanos, Some(0.0));
    }
}
