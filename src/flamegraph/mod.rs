//! Flamegraph generation using the inferno library.
//!
//! This module converts merged stack profiles into interactive SVG
//! flamegraphs showing where transactions spend their time.

pub mod generator;

// Re-export main types
pub use generator::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
