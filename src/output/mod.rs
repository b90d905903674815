//! Output writers for aggregate reports and flamegraphs.
//!
//! This module handles writing data to disk:
//! - JSON aggregate reports
//! - SVG flamegraphs

pub mod json;
pub mod svg;

use crate::utils::error::OutputError;
use log::debug;
use std::path::Path;

// Re-export main functions
pub use json::{aggregates_to_string, read_aggregates, write_aggregates, AggregateReport};
pub use svg::write_svg;

/// Validate that an output path is writable, creating missing parents
///
/// **Public** - shared by every writer
///
/// # Errors
/// * `OutputError::InvalidPath` - empty path, a directory, or a parent that
///   cannot be created
pub fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
