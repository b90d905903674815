//! APM Aggregator CLI
//!
//! Replays recorded transactions through the aggregation engine, inspects
//! aggregate reports and syncs agent configuration with central.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use apm_aggregator::commands::{
    display_schema, display_version, execute_inspect, execute_replay, execute_sync,
    validate_args, validate_sync_args, InspectArgs, ReplayArgs, SyncArgs,
};
use apm_aggregator::flamegraph::FlamegraphConfig;

/// APM Aggregator - transaction aggregation for performance monitoring
#[derive(Parser, Debug)]
#[command(name = "apm-aggregate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate recorded transactions into interval summaries
    Replay {
        /// JSON array of recorded transactions
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for aggregates JSON
        #[arg(short, long, default_value = "aggregates.json")]
        output: PathBuf,

        /// Agent config TOML (interval length and caps)
        #[arg(short, long, env = "APM_AGENT_CONFIG")]
        config: Option<PathBuf>,

        /// Output path for SVG flamegraph of a merged profile (optional)
        #[arg(short, long)]
        flamegraph: Option<PathBuf>,

        /// Transaction type whose profile is rendered
        #[arg(long)]
        flamegraph_type: Option<String>,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200")]
        width: usize,

        /// Number of hot timers to show per transaction type
        #[arg(long, default_value = "10")]
        top_timers: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Print summaries of an aggregates JSON file
    Inspect {
        /// Path to aggregates JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Only show this transaction type
        #[arg(short = 't', long)]
        transaction_type: Option<String>,

        /// Number of hot timers to show per transaction type
        #[arg(long, default_value = "10")]
        top_timers: usize,
    },

    /// Pull config updates from central and optionally push aggregates
    Sync {
        /// Central collector base URL
        #[arg(long, env = "APM_CENTRAL_URL", default_value = "http://localhost:8181")]
        central: String,

        /// Agent ID registered with central
        #[arg(long, env = "APM_AGENT_ID")]
        agent_id: String,

        /// Agent config TOML updated in place
        #[arg(short, long, default_value = "agent.toml")]
        config: PathBuf,

        /// Aggregates JSON whose intervals are sent to central
        #[arg(long)]
        push: Option<PathBuf>,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Replay {
            input,
            output,
            config,
            flamegraph,
            flamegraph_type,
            title,
            width,
            top_timers,
            summary,
        } => {
            // Create flamegraph config
            let fg_config = if flamegraph.is_some() {
                let mut config = FlamegraphConfig::new().with_width(width);
                if let Some(title_str) = title {
                    config = config.with_title(title_str);
                }
                Some(config)
            } else {
                None
            };

            let args = ReplayArgs {
                input,
                output_json: output,
                config,
                output_svg: flamegraph,
                flamegraph_type,
                flamegraph_config: fg_config,
                top_timers,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_replay(args)?;
        }

        Commands::Inspect {
            file,
            transaction_type,
            top_timers,
        } => {
            execute_inspect(InspectArgs {
                file,
                transaction_type,
                top_timers,
            })?;
        }

        Commands::Sync {
            central,
            agent_id,
            config,
            push,
        } => {
            let args = SyncArgs {
                central_url: central,
                agent_id,
                config,
                push,
            };
            validate_sync_args(&args)?;
            execute_sync(args)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
