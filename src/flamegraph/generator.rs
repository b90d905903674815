//! SVG flamegraph generation from merged stack profiles.
//!
//! The merged profile is flattened into folded stacks ("a;b;c 42") and
//! rendered by inferno.

use crate::aggregator::{HotTimer, ProfileSnapshot};
use crate::utils::error::FlamegraphError;
use inferno::flamegraph::{self, Options};
use log::info;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Aggregated Transaction Profile".to_string(),
            width: 1200,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Generate SVG flamegraph from a merged profile
///
/// **Public** - main entry point for flamegraph rendering
///
/// # Errors
/// * `FlamegraphError::EmptyProfile` - the profile holds no samples
/// * `FlamegraphError::Render` - inferno failed to render
pub fn generate_flamegraph(
    profile: &ProfileSnapshot,
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    let stacks = profile.folded_stacks();
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyProfile);
    }

    let config = config.cloned().unwrap_or_default();
    info!(
        "Generating flamegraph with {} stacks ({} samples)",
        stacks.len(),
        profile.sample_count
    );

    let mut options = Options::default();
    options.title = config.title;
    options.count_name = "samples".to_string();
    options.image_width = Some(config.width);

    let mut svg = Vec::new();
    flamegraph::from_lines(&mut options, stacks.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::Render(e.to_string()))?;
    let svg = String::from_utf8(svg)?;

    info!("Flamegraph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}

/// Create a text table of the hottest timer paths
pub fn generate_text_summary(hot_timers: &[HotTimer], max_lines: usize) -> String {
    let mut lines = Vec::new();

    lines.push("  HOT TIMERS".to_string());
    lines.push(format!(
        "  {:<48} {:>12} {:>10} {:>7}",
        "Timer Path (Hottest First)", "TOTAL ms", "COUNT", "%"
    ));
    lines.push(format!("  {}", "-".repeat(80)));

    for timer in hot_timers.iter().take(max_lines) {
        // Keep the leaf visible when the path is too long
        let display_path = if timer.path.chars().count() > 48 {
            let tail: String = timer
                .path
                .chars()
                .rev()
                .take(45)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("...{}", tail)
        } else {
            timer.path.clone()
        };

        lines.push(format!(
            "  {:<48} {:>12.1} {:>10} {:>6.1}%",
            display_path,
            timer.total_nanos as f64 / 1_000_000.0,
            timer.count,
            timer.percentage
        ));
    }

    if hot_timers.len() > max_lines {
        lines.push(String::new());
        lines.push(format!(
            "   (Showing top {} of {} timer paths)",
            max_lines,
            hot_timers.len()
        ));
    }

    lines.join("\n")
}
