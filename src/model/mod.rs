//! Input records consumed by the aggregation engine.

pub mod recorded;
pub mod transaction;

// Re-export main types
pub use recorded::RecordedTransaction;
pub use transaction::{QueryData, StackProfile, StackSample, ThreadStats, TimerNode, Transaction};
