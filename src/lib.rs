//! APM Aggregator
//!
//! Transaction aggregation engine for an application performance
//! monitoring agent.
//!
//! Completed transactions are folded into per-interval aggregates: one
//! overall aggregate per transaction type and one per transaction name,
//! each holding name-merged timer trees, a duration histogram, thread
//! resource totals, merged stack profiles and bounded query statistics.
//!
//! ## Getting Started
//!
//! ```ignore
//! let aggregator = Aggregator::new(60_000, AggregateLimits::default());
//! aggregator.add_transaction(&transaction);
//! if let Some(interval) = aggregator.flush(Utc::now())? {
//!     client.send_aggregates("web-1", &interval)?;
//! }
//! ```
//!
//! The `apm-aggregate` CLI replays recorded transactions through the same
//! engine:
//!
//! ```bash
//! apm-aggregate replay --input transactions.json --summary
//! ```

pub mod aggregator;
pub mod central;
pub mod commands;
pub mod config;
pub mod flamegraph;
pub mod model;
pub mod output;
pub mod utils;
