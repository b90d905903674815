//! Sync command implementation.
//!
//! The sync command:
//! 1. Loads the local agent config (defaults when the file is missing)
//! 2. Pulls the pending config update from central and applies it
//! 3. Optionally pushes the intervals of an aggregates report

use super::models::SyncArgs;
use crate::central::CentralClient;
use crate::config::{load_config, AgentConfig, ConfigUpdateService};
use crate::output::read_aggregates;
use anyhow::{Context, Result};
use log::{info, warn};

/// Execute the sync command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The agent config in effect after the sync
pub fn execute_sync(args: SyncArgs) -> Result<AgentConfig> {
    let current = if args.config.exists() {
        load_config(&args.config)
            .with_context(|| format!("Failed to load agent config {}", args.config.display()))?
    } else {
        warn!(
            "Config file {} not found, starting from defaults",
            args.config.display()
        );
        AgentConfig::default()
    };
    let service = ConfigUpdateService::new(current).with_path(&args.config);

    let client = CentralClient::new(&args.central_url).context("Failed to create central client")?;

    let update = client
        .fetch_config_update(&args.agent_id)
        .with_context(|| format!("Failed to fetch config update for agent {}", args.agent_id))?;

    let config = match update {
        Some(update) => {
            let config = service
                .update_config(&update)
                .context("Central sent a config update that could not be applied")?;
            let limits = config.aggregate_limits();
            info!(
                "✓ Config updated: {} transaction names / {} queries per type",
                limits.max_aggregate_transactions_per_transaction_type,
                limits.max_aggregate_queries_per_query_type
            );
            config
        }
        None => {
            info!("Config is up to date");
            service.current()
        }
    };

    if let Some(report_path) = &args.push {
        let report = read_aggregates(report_path)
            .with_context(|| format!("Failed to read aggregates {}", report_path.display()))?;
        for interval in &report.intervals {
            client
                .send_aggregates(&args.agent_id, interval)
                .with_context(|| {
                    format!(
                        "Failed to send interval ending {}",
                        interval.capture_time.to_rfc3339()
                    )
                })?;
        }
        info!("✓ Pushed {} interval(s) to central", report.intervals.len());
    }

    Ok(config)
}

/// Validate sync arguments
pub fn validate_sync_args(args: &SyncArgs) -> Result<()> {
    if args.central_url.is_empty() {
        anyhow::bail!("Central URL cannot be empty");
    }

    if !args.central_url.starts_with("http://") && !args.central_url.starts_with("https://") {
        anyhow::bail!("Central URL must start with http:// or https://");
    }

    if args.agent_id.is_empty() {
        anyhow::bail!("Agent ID cannot be empty");
    }

    if args.agent_id.contains('/') {
        anyhow::bail!("Agent ID cannot contain '/'");
    }

    Ok(())
}
