//! Name-keyed merging of timer trees.
//!
//! Every transaction carries a tree of timers per thread. Aggregating them is
//! a multiway tree merge keyed by name at every level, so the output width is
//! bounded by the number of distinct timer names observed, no matter how
//! many transactions feed in.

use super::snapshot::TimerSnapshot;
use crate::model::TimerNode;

/// A timer node accumulated across transactions
#[derive(Debug, Clone, PartialEq)]
pub struct MutableTimer {
    name: String,
    extended: bool,
    total_nanos: u64,
    count: u64,
    children: Vec<MutableTimer>,
}

impl MutableTimer {
    /// Create an empty timer with the given identity
    ///
    /// **Public** - used when an incoming root has no existing match
    pub fn create_root_timer(name: impl Into<String>, extended: bool) -> Self {
        Self {
            name: name.into(),
            extended,
            total_nanos: 0,
            count: 0,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn total_nanos(&self) -> u64 {
        self.total_nanos
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn children(&self) -> &[MutableTimer] {
        &self.children
    }

    /// Fold an incoming timer (and its whole subtree) into this one
    ///
    /// The caller has already matched `timer` to this node by name.
    pub fn merge(&mut self, timer: &TimerNode) {
        self.total_nanos = self.total_nanos.saturating_add(timer.total_nanos);
        self.count = self.count.saturating_add(timer.count);
        for child in &timer.children {
            merge_into(&mut self.children, child);
        }
    }

    pub fn to_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            name: self.name.clone(),
            extended: self.extended,
            total_nanos: self.total_nanos,
            count: self.count,
            child_timers: self.children.iter().map(MutableTimer::to_snapshot).collect(),
        }
    }
}

/// Merge an incoming root timer into a list of existing roots
///
/// **Public** - shared by the main, auxiliary and async timer categories
///
/// Folds into the same-named entry if there is one, otherwise appends a new
/// entry. The list never holds two entries with the same name.
pub fn merge_root_timer(root_timers: &mut Vec<MutableTimer>, timer: &TimerNode) {
    merge_into(root_timers, timer);
}

fn merge_into(timers: &mut Vec<MutableTimer>, timer: &TimerNode) {
    // linear scan: tens of distinct names per level in practice
    if let Some(existing) = timers.iter_mut().find(|t| t.name == timer.name) {
        existing.merge(timer);
        return;
    }
    let mut created = MutableTimer::create_root_timer(timer.name.clone(), timer.extended);
    created.merge(timer);
    timers.push(created);
}
