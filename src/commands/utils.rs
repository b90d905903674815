use crate::utils::config::SCHEMA_VERSION;

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("APM Aggregates Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string                - Schema version (e.g., '1.0.0')");
        println!("  generated_at: string           - ISO 8601 timestamp");
        println!("  intervals: array               - One entry per aggregation interval");
        println!("    capture_time: string         - End of the interval");
        println!("    transaction_types: array");
        println!("      transaction_type: string");
        println!("      overall: aggregate         - All transactions of the type");
        println!("      transactions: array        - One aggregate per transaction name");
        println!();
        println!("Aggregate:");
        println!("  transaction_name: string?      - Absent for the overall aggregate");
        println!("  total_duration_nanos: number");
        println!("  transaction_count: number");
        println!("  error_count: number");
        println!("  main_thread_root_timers: array - Name-merged timer trees");
        println!("  aux_thread_root_timers: array");
        println!("  async_root_timers: array");
        println!("  duration_histogram: bytes      - Encoded duration histogram");
        println!("  main_thread_stats: object?     - cpu/blocked/waited nanos, allocated bytes");
        println!("  aux_thread_stats: object?");
        println!("  main_thread_profile: object?   - Merged stack samples");
        println!("  aux_thread_profile: object?");
        println!("  queries_by_type: array         - Per-type query stats, slowest first");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("APM Aggregator v{}", env!("CARGO_PKG_VERSION"));
    println!("Aggregates Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Transaction aggregation engine for application performance monitoring.");
}
