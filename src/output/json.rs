//! JSON aggregate report writer.
//!
//! Writes finished intervals to JSON files with proper formatting.

use super::validate_output_path;
use crate::aggregator::IntervalSnapshot;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Top-level aggregates file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AggregateReport {
    /// Schema version (e.g., "1.0.0")
    pub version: String,

    pub generated_at: DateTime<Utc>,

    /// Intervals in capture order
    pub intervals: Vec<IntervalSnapshot>,
}

impl AggregateReport {
    pub fn new(intervals: Vec<IntervalSnapshot>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            intervals,
        }
    }
}

/// Write an aggregate report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Report to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// let report = AggregateReport::new(intervals);
/// write_aggregates(&report, "aggregates.json")?;
/// ```
pub fn write_aggregates(
    report: &AggregateReport,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing aggregates to: {}", output_path.display());

    validate_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, report).map_err(OutputError::SerializationFailed)?;

    info!(
        "Aggregates written successfully ({} interval(s), {} bytes)",
        report.intervals.len(),
        calculate_file_size(output_path)
    );
    Ok(())
}

/// Serialize a report to a string
pub fn aggregates_to_string(report: &AggregateReport) -> Result<String, OutputError> {
    serde_json::to_string_pretty(report).map_err(OutputError::SerializationFailed)
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read an aggregate report from a JSON file
///
/// **Public** - used by inspect and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_aggregates(input_path: impl AsRef<Path>) -> Result<AggregateReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading aggregates from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let report: AggregateReport =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Aggregates loaded: version {}, {} interval(s)",
        report.version,
        report.intervals.len()
    );
    Ok(report)
}
