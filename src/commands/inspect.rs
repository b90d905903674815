//! Inspect command implementation.

use super::models::InspectArgs;
use super::replay::print_report_summary;
use crate::output::read_aggregates;
use anyhow::{Context, Result};

/// Read an aggregates file and print its summaries
///
/// **Public** - main entry point called from main.rs
pub fn execute_inspect(args: InspectArgs) -> Result<()> {
    println!("Inspecting aggregates: {}", args.file.display());

    let report = read_aggregates(&args.file)
        .with_context(|| format!("Failed to read aggregates {}", args.file.display()))?;

    println!("✓ Valid aggregates JSON");
    println!("  Version: {}", report.version);
    println!("  Generated: {}", report.generated_at.to_rfc3339());
    println!("  Intervals: {}", report.intervals.len());

    print_report_summary(&report, args.transaction_type.as_deref(), args.top_timers)
}
