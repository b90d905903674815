//! Transactions recorded to disk with their completion time, for replay.

use super::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed transaction and the instant it completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedTransaction {
    pub completed_at: DateTime<Utc>,

    #[serde(flatten)]
    pub transaction: Transaction,
}
