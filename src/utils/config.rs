//! Constants shared across the crate.

use std::time::Duration;

/// Default timeout for requests to the central collector
pub const DEFAULT_CENTRAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Current aggregate report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Default length of one aggregation interval
pub const DEFAULT_AGGREGATE_INTERVAL_MILLIS: u64 = 60_000;

// Cardinality caps, overridable from the agent config or the central server
pub const DEFAULT_MAX_AGGREGATE_QUERIES_PER_QUERY_TYPE: usize = 500;
pub const DEFAULT_MAX_AGGREGATE_TRANSACTIONS_PER_TRANSACTION_TYPE: usize = 500;

// The overall aggregate sees every transaction of a type, so it keeps a
// larger working set of query texts before it starts dropping them.
pub const OVERALL_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER: usize = 10;
pub const TRANSACTION_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER: usize = 2;

/// Transaction name used for transactions beyond the per-type name cap
pub const LIMIT_EXCEEDED_BUCKET: &str = "LIMIT EXCEEDED BUCKET";

/// Raw values kept by a histogram before it switches to HDR buckets
pub const HISTOGRAM_RAW_VALUE_LIMIT: usize = 1024;

/// Significant decimal digits kept by HDR buckets (< 1% relative error)
pub const HISTOGRAM_SIGNIFICANT_DIGITS: u8 = 2;

/// Durations are nanoseconds, bucketed at microsecond precision
pub const HISTOGRAM_LOWEST_DISCERNIBLE_NANOS: u64 = 1_000;

/// Upper bound an HDR histogram starts with; larger durations resize it
pub const HISTOGRAM_INITIAL_HIGHEST_TRACKABLE_NANOS: u64 = 60_000_000_000;
