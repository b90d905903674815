//! Bounded per-query-text statistics.
//!
//! Query texts are unbounded user input (think of SQL with inlined literals),
//! so the collector caps the number of distinct texts per query type. Two
//! limits apply:
//!
//! - while the interval is still running, up to `max_per_type *
//!   hard_limit_multiplier` texts are tracked, so texts that show up late
//!   still get a chance to make the final cut;
//! - when the snapshot is built, only the `max_per_type` texts with the
//!   highest total duration are emitted.
//!
//! Texts beyond either limit are not kept individually; their totals are
//! added to a per-type overflow entry. Hitting a limit is never an error.

use super::snapshot::{QueriesByType, QuerySnapshot, QueryStatsSnapshot};
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MutableQuery {
    total_nanos: u64,
    execution_count: u64,
    total_rows: u64,
}

impl MutableQuery {
    fn add(&mut self, total_nanos: u64, execution_count: u64, total_rows: u64) {
        self.total_nanos = self.total_nanos.saturating_add(total_nanos);
        self.execution_count = self.execution_count.saturating_add(execution_count);
        self.total_rows = self.total_rows.saturating_add(total_rows);
    }

    fn add_query(&mut self, other: &MutableQuery) {
        self.add(other.total_nanos, other.execution_count, other.total_rows);
    }

    fn to_snapshot(self) -> QueryStatsSnapshot {
        QueryStatsSnapshot {
            total_nanos: self.total_nanos,
            execution_count: self.execution_count,
            total_rows: self.total_rows,
        }
    }
}

/// Queries of one type, in insertion order
#[derive(Debug, Clone, Default)]
struct QueriesForType {
    index: HashMap<String, usize>,
    entries: Vec<(String, MutableQuery)>,
    overflow: Option<MutableQuery>,
}

impl QueriesForType {
    fn total_nanos(&self) -> u64 {
        self.entries
            .iter()
            .map(|(_, q)| q.total_nanos)
            .chain(self.overflow.map(|o| o.total_nanos))
            .fold(0u64, u64::saturating_add)
    }
}

/// Query statistics keyed by (query type, query text)
#[derive(Debug, Clone)]
pub struct QueryCollector {
    max_per_type: usize,
    hard_limit_multiplier: usize,
    types: Vec<(String, QueriesForType)>,
}

impl QueryCollector {
    /// Create a collector
    ///
    /// # Arguments
    /// * `max_per_type` - distinct texts per type emitted in the snapshot
    /// * `hard_limit_multiplier` - working set multiplier while building
    pub fn new(max_per_type: usize, hard_limit_multiplier: usize) -> Self {
        Self {
            max_per_type,
            hard_limit_multiplier: hard_limit_multiplier.max(1),
            types: Vec::new(),
        }
    }

    /// Maximum number of texts tracked per type while building
    pub fn hard_limit(&self) -> usize {
        self.max_per_type.saturating_mul(self.hard_limit_multiplier)
    }

    /// Number of distinct texts currently tracked for a query type
    pub fn tracked_texts(&self, query_type: &str) -> usize {
        self.types
            .iter()
            .find(|(t, _)| t == query_type)
            .map(|(_, q)| q.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Accumulate one query record
    pub fn merge_query(
        &mut self,
        query_type: &str,
        query_text: &str,
        total_nanos: u64,
        execution_count: u64,
        total_rows: u64,
    ) {
        let hard_limit = self.hard_limit();
        let queries = self.queries_for_type(query_type);

        if let Some(&i) = queries.index.get(query_text) {
            queries.entries[i].1.add(total_nanos, execution_count, total_rows);
            return;
        }

        if queries.entries.len() < hard_limit {
            queries.index.insert(query_text.to_string(), queries.entries.len());
            let mut query = MutableQuery::default();
            query.add(total_nanos, execution_count, total_rows);
            queries.entries.push((query_text.to_string(), query));
            return;
        }

        let overflow = queries.overflow.get_or_insert_with(|| {
            debug!(
                "Query type {} reached {} distinct texts, folding new texts into overflow",
                query_type, hard_limit
            );
            MutableQuery::default()
        });
        overflow.add(total_nanos, execution_count, total_rows);
    }

    /// Build per-type snapshots
    ///
    /// Types and texts are ordered by total duration, descending. Ties keep
    /// insertion order. With `truncate`, each type emits at most
    /// `max_per_type` texts and the remainder is folded into its overflow.
    pub fn to_snapshot(&self, truncate: bool) -> Vec<QueriesByType> {
        let mut types: Vec<&(String, QueriesForType)> = self.types.iter().collect();
        // stable sort: ties keep first-seen order
        types.sort_by(|a, b| b.1.total_nanos().cmp(&a.1.total_nanos()));

        types
            .into_iter()
            .map(|(query_type, queries)| self.type_snapshot(query_type, queries, truncate))
            .collect()
    }

    fn type_snapshot(
        &self,
        query_type: &str,
        queries: &QueriesForType,
        truncate: bool,
    ) -> QueriesByType {
        let mut entries: Vec<&(String, MutableQuery)> = queries.entries.iter().collect();
        entries.sort_by(|a, b| b.1.total_nanos.cmp(&a.1.total_nanos));

        let mut overflow = queries.overflow;
        if truncate && entries.len() > self.max_per_type {
            let dropped = entries.split_off(self.max_per_type);
            let folded = overflow.get_or_insert_with(MutableQuery::default);
            for (_, query) in dropped {
                folded.add_query(query);
            }
        }

        QueriesByType {
            query_type: query_type.to_string(),
            queries: entries
                .into_iter()
                .map(|(text, query)| QuerySnapshot {
                    query_text: text.clone(),
                    stats: query.to_snapshot(),
                })
                .collect(),
            overflow: overflow.map(MutableQuery::to_snapshot),
        }
    }

    fn queries_for_type(&mut self, query_type: &str) -> &mut QueriesForType {
        let position = match self.types.iter().position(|(t, _)| t == query_type) {
            Some(position) => position,
            None => {
                self.types.push((query_type.to_string(), QueriesForType::default()));
                self.types.len() - 1
            }
        };
        &mut self.types[position].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_accumulates_same_text() {
        let mut collector = QueryCollector::new(10, 2);
        collector.merge_query("SQL", "select 1", 100, 1, 1);
        collector.merge_query("SQL", "select 1", 50, 2, 3);

        let snapshot = collector.to_snapshot(true);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].queries.len(), 1);
        assert_eq!(
            snapshot[0].queries[0].stats,
            QueryStatsSnapshot {
                total_nanos: 150,
                execution_count: 3,
                total_rows: 4,
            }
        );
        assert!(snapshot[0].overflow.is_none());
    }

    #[test]
    fn test_type_totals_saturate() {
        let mut collector = QueryCollector::new(1, 1);
        collector.merge_query("SQL", "select 1", u64::MAX - 1, 1, 0);
        collector.merge_query("SQL", "select 2", u64::MAX - 1, 1, 0);
        collector.merge_query("CQL", "select 3", 5, 1, 0);

        let snapshot = collector.to_snapshot(true);

        assert_eq!(snapshot[0].query_type, "SQL");
        assert_eq!(snapshot[0].total_nanos(), u64::MAX);
        assert_eq!(snapshot[1].total_nanos(), 5);
    }

    #[test]
    fn test_hard_limit_while_building() {
        let mut collector = QueryCollector::new(2, 3);
        for i in 0..10 {
            collector.merge_query("SQL", &format!("select {}", i), 10, 1, 0);
        }
        // existing entries keep accumulating after the cap
        collector.merge_query("SQL", "select 0", 10, 1, 0);

        assert_eq!(collector.tracked_texts("SQL"), 6);
        let snapshot = collector.to_snapshot(false);
        assert_eq!(snapshot[0].queries.len(), 6);
        assert_eq!(snapshot[0].queries[0].query_text, "select 0");
        assert_eq!(snapshot[0].queries[0].stats.total_nanos, 20);
        assert_eq!(snapshot[0].overflow.unwrap().execution_count, 4);
    }

    #[test]
    fn test_truncate_keeps_highest_total_duration() {
        let mut collector = QueryCollector::new(2, 10);
        collector.merge_query("SQL", "a", 10, 1, 0);
        collector.merge_query("SQL", "b", 30, 1, 0);
        collector.merge_query("SQL", "c", 20, 1, 0);
        collector.merge_query("SQL", "d", 5, 1, 0);

        let snapshot = collector.to_snapshot(true);
        let texts: Vec<&str> = snapshot[0].queries.iter().map(|q| q.query_text.as_str()).collect();

        assert_eq!(texts, vec!["b", "c"]);
        let overflow = snapshot[0].overflow.unwrap();
        assert_eq!(overflow.total_nanos, 15);
        assert_eq!(overflow.execution_count, 2);
        assert_eq!(snapshot[0].total_nanos(), 65);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut collector = QueryCollector::new(2, 10);
        collector.merge_query("SQL", "first", 10, 1, 0);
        collector.merge_query("SQL", "second", 10, 1, 0);
        collector.merge_query("SQL", "third", 10, 1, 0);

        let snapshot = collector.to_snapshot(true);
        let texts: Vec<&str> = snapshot[0].queries.iter().map(|q| q.query_text.as_str()).collect();

        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_types_ordered_by_total_duration() {
        let mut collector = QueryCollector::new(5, 2);
        collector.merge_query("SQL", "select", 10, 1, 0);
        collector.merge_query("HTTP", "GET /", 100, 1, 0);

        let snapshot = collector.to_snapshot(true);
        let types: Vec<&str> = snapshot.iter().map(|q| q.query_type.as_str()).collect();

        assert_eq!(types, vec!["HTTP", "SQL"]);
    }

    #[test]
    fn test_limits_are_per_type() {
        let mut collector = QueryCollector::new(1, 1);
        collector.merge_query("SQL", "a", 1, 1, 0);
        collector.merge_query("SQL", "b", 1, 1, 0);
        collector.merge_query("CQL", "a", 1, 1, 0);

        assert_eq!(collector.tracked_texts("SQL"), 1);
        assert_eq!(collector.tracked_texts("CQL"), 1);
    }
}
