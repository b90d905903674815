//! Replay command implementation.
//!
//! The replay command:
//! 1. Loads the agent config (interval length and caps)
//! 2. Reads recorded transactions
//! 3. Feeds them through the aggregator, flushing at interval boundaries
//! 4. Writes the aggregates report
//! 5. Optionally renders a flamegraph and prints summaries

use super::models::ReplayArgs;
use crate::aggregator::{
    calculate_hot_timers, interval_capture_time, summarize, Aggregator, IntervalSnapshot,
    ProfileSnapshot, ScratchBuffer,
};
use crate::config::{load_config, AgentConfig};
use crate::flamegraph::{generate_flamegraph, generate_text_summary};
use crate::model::RecordedTransaction;
use crate::output::{write_aggregates, write_svg, AggregateReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

/// Execute the replay command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The report that was written
///
/// # Errors
/// * Config or input read failures
/// * Aggregate build failures
/// * File write errors
///
/// # Example
/// ```ignore
/// let args = ReplayArgs {
///     input: PathBuf::from("transactions.json"),
///     output_json: PathBuf::from("aggregates.json"),
///     ..Default::default()
/// };
///
/// execute_replay(args)?;
/// ```
pub fn execute_replay(args: ReplayArgs) -> Result<AggregateReport> {
    let start_time = Instant::now();

    info!("Step 1/4: Loading agent config...");
    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load agent config {}", path.display()))?,
        None => AgentConfig::default(),
    };

    info!("Step 2/4: Reading recorded transactions...");
    let mut transactions = read_transactions(&args.input)?;
    // stable, so equal timestamps keep file order
    transactions.sort_by_key(|t| t.completed_at);
    debug!("Read {} transactions", transactions.len());

    info!(
        "Step 3/4: Aggregating in {} ms intervals...",
        config.aggregation.interval_millis
    );
    let intervals = aggregate(&config, &transactions)?;

    info!("Step 4/4: Writing output files...");
    let report = AggregateReport::new(intervals);
    write_aggregates(&report, &args.output_json).context("Failed to write aggregates JSON")?;
    info!("✓ Aggregates written to: {}", args.output_json.display());

    if let Some(svg_path) = &args.output_svg {
        let profile = select_profile(&report, args.flamegraph_type.as_deref())
            .context("No merged profile available for the flamegraph")?;
        let svg = generate_flamegraph(profile, args.flamegraph_config.as_ref())
            .context("Failed to generate flamegraph")?;
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("✓ Flamegraph written to: {}", svg_path.display());
    }

    if args.print_summary {
        print_report_summary(&report, None, args.top_timers)?;
    }

    let elapsed = start_time.elapsed();
    info!("Replay completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Read a JSON array of recorded transactions
///
/// **Private** - internal helper for execute_replay
fn read_transactions(path: &Path) -> Result<Vec<RecordedTransaction>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open transactions file {}", path.display()))?;
    let transactions = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse transactions file {}", path.display()))?;
    Ok(transactions)
}

/// Feed transactions, already sorted by completion time, through an
/// aggregator and flush at every interval boundary
pub fn aggregate(
    config: &AgentConfig,
    transactions: &[RecordedTransaction],
) -> Result<Vec<IntervalSnapshot>> {
    let interval_millis = config.aggregation.interval_millis;
    let aggregator = Aggregator::new(interval_millis, config.aggregate_limits());

    let mut intervals = Vec::new();
    let mut current_end = None;
    for recorded in transactions {
        let end = interval_capture_time(recorded.completed_at, interval_millis);
        if let Some(previous) = current_end {
            if previous != end {
                intervals.extend(flush_interval(&aggregator, previous)?);
            }
        }
        current_end = Some(end);
        aggregator.add_transaction(&recorded.transaction);
    }
    if let Some(last) = current_end {
        intervals.extend(flush_interval(&aggregator, last)?);
    }

    Ok(intervals)
}

/// Flush one interval, building it once more if the first build fails
///
/// **Private** - internal helper for aggregate
fn flush_interval(
    aggregator: &Aggregator,
    end: DateTime<Utc>,
) -> Result<Option<IntervalSnapshot>> {
    match aggregator.flush(end) {
        Ok(snapshot) => Ok(snapshot),
        Err(error) => {
            warn!("{}, retrying", error);
            let snapshot = error
                .interval
                .build(error.capture_time, &mut ScratchBuffer::new())
                .context("Failed to build aggregates")?;
            Ok(Some(snapshot))
        }
    }
}

/// Pick the overall main-thread profile to render
///
/// Uses the last interval holding a profile for the requested type, or for
/// any type when none is requested.
fn select_profile<'a>(
    report: &'a AggregateReport,
    transaction_type: Option<&str>,
) -> Option<&'a ProfileSnapshot> {
    report
        .intervals
        .iter()
        .rev()
        .flat_map(|interval| interval.transaction_types.iter())
        .filter(|t| transaction_type.map_or(true, |wanted| t.transaction_type == wanted))
        .find_map(|t| t.overall.main_thread_profile.as_ref())
}

/// Print per-interval, per-type summaries and hot timers
///
/// **Public** - shared with the inspect command
pub fn print_report_summary(
    report: &AggregateReport,
    transaction_type: Option<&str>,
    top_timers: usize,
) -> Result<()> {
    println!("\n{}", "=".repeat(80));
    println!("AGGREGATE SUMMARY (schema v{})", report.version);
    println!("{}", "=".repeat(80));

    for interval in &report.intervals {
        println!("\nInterval ending {}", interval.capture_time.to_rfc3339());
        for type_snapshot in &interval.transaction_types {
            if transaction_type.map_or(false, |wanted| type_snapshot.transaction_type != wanted) {
                continue;
            }
            let summary = summarize(&type_snapshot.overall)
                .context("Failed to decode duration histogram")?;
            println!("\n[{}] {}", type_snapshot.transaction_type, summary.summary());

            for transaction in &type_snapshot.transactions {
                let summary =
                    summarize(transaction).context("Failed to decode duration histogram")?;
                println!("  {:<40} {}", transaction.display_name(), summary.summary());
            }

            let hot = calculate_hot_timers(&type_snapshot.overall, usize::MAX);
            if !hot.is_empty() {
                println!("\n{}", generate_text_summary(&hot, top_timers));
            }
        }
    }

    println!("{}", "=".repeat(80));
    Ok(())
}

/// Validate replay arguments
///
/// **Public** - can be called before execute_replay for early validation
pub fn validate_args(args: &ReplayArgs) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if args.top_timers == 0 {
        anyhow::bail!("top_timers must be greater than 0");
    }

    if args.top_timers > 1000 {
        anyhow::bail!("top_timers is too large (max 1000)");
    }

    if args.flamegraph_type.is_some() && args.output_svg.is_none() {
        anyhow::bail!("--flamegraph-type requires --flamegraph");
    }

    Ok(())
}
