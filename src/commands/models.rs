use crate::flamegraph::FlamegraphConfig;
use std::path::PathBuf;

/// Arguments for the replay command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ReplayArgs {
    /// JSON array of recorded transactions
    pub input: PathBuf,

    /// Output path for the aggregates JSON
    pub output_json: PathBuf,

    /// Agent config supplying interval length and caps (defaults if absent)
    pub config: Option<PathBuf>,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Transaction type whose merged profile is rendered
    pub flamegraph_type: Option<String>,

    pub flamegraph_config: Option<FlamegraphConfig>,

    /// Number of hot timers shown per transaction type
    pub top_timers: usize,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for ReplayArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("transactions.json"),
            output_json: PathBuf::from("aggregates.json"),
            config: None,
            output_svg: None,
            flamegraph_type: None,
            flamegraph_config: None,
            top_timers: 10,
            print_summary: false,
        }
    }
}

/// Arguments for the inspect command
#[derive(Debug, Clone)]
pub struct InspectArgs {
    pub file: PathBuf,

    /// Only show this transaction type
    pub transaction_type: Option<String>,

    pub top_timers: usize,
}

/// Arguments for the sync command
#[derive(Debug, Clone)]
pub struct SyncArgs {
    /// Central collector base URL
    pub central_url: String,

    pub agent_id: String,

    /// Agent config file updated in place (created if missing)
    pub config: PathBuf,

    /// Aggregates report whose intervals are pushed to central
    pub push: Option<PathBuf>,
}
