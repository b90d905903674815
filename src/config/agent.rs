//! Agent configuration file.
//!
//! Loads and saves the agent's TOML configuration and derives the
//! aggregation caps from it.

use crate::aggregator::AggregateLimits;
use crate::utils::config::{
    DEFAULT_AGGREGATE_INTERVAL_MILLIS, DEFAULT_MAX_AGGREGATE_QUERIES_PER_QUERY_TYPE,
    DEFAULT_MAX_AGGREGATE_TRANSACTIONS_PER_TRANSACTION_TYPE,
    OVERALL_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER,
    TRANSACTION_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER,
};
use crate::utils::error::ConfigError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Complete agent configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub transaction: TransactionConfig,

    #[serde(default)]
    pub user_recording: UserRecordingConfig,

    #[serde(default)]
    pub advanced: AdvancedConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub plugins: Vec<PluginConfig>,

    #[serde(default)]
    pub gauges: Vec<GaugeConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub slow_threshold_millis: u64,
    pub profiling_interval_millis: u64,
    pub capture_thread_stats: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            slow_threshold_millis: 2_000,
            profiling_interval_millis: 1_000,
            capture_thread_stats: true,
        }
    }
}

/// Extra profiling for selected users
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UserRecordingConfig {
    pub users: Vec<String>,
    pub profiling_interval_millis: u64,
}

impl Default for UserRecordingConfig {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            profiling_interval_millis: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdvancedConfig {
    pub timer_wrapper_methods: bool,
    pub weaving_timer: bool,
    pub immediate_partial_store_threshold_seconds: u64,
    pub max_aggregate_transactions_per_transaction_type: usize,
    pub max_aggregate_queries_per_query_type: usize,
    pub max_trace_entries_per_transaction: usize,
    pub max_stack_trace_samples_per_transaction: usize,
    pub mbean_gauge_not_found_delay_seconds: u64,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            timer_wrapper_methods: false,
            weaving_timer: false,
            immediate_partial_store_threshold_seconds: 60,
            max_aggregate_transactions_per_transaction_type:
                DEFAULT_MAX_AGGREGATE_TRANSACTIONS_PER_TRANSACTION_TYPE,
            max_aggregate_queries_per_query_type: DEFAULT_MAX_AGGREGATE_QUERIES_PER_QUERY_TYPE,
            max_trace_entries_per_transaction: 2_000,
            max_stack_trace_samples_per_transaction: 10_000,
            mbean_gauge_not_found_delay_seconds: 60,
        }
    }
}

/// Interval length and query working-set multipliers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub interval_millis: u64,
    pub overall_queries_hard_limit_multiplier: usize,
    pub transaction_queries_hard_limit_multiplier: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            interval_millis: DEFAULT_AGGREGATE_INTERVAL_MILLIS,
            overall_queries_hard_limit_multiplier: OVERALL_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER,
            transaction_queries_hard_limit_multiplier:
                TRANSACTION_AGGREGATE_QUERIES_HARD_LIMIT_MULTIPLIER,
        }
    }
}

/// Settings of one instrumentation plugin
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PluginConfig {
    pub id: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

fn default_enabled() -> bool {
    true
}

/// Value of a plugin property
///
/// Numbers may be explicitly unset, which is distinct from the property
/// being absent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    NullNumber,
    String(String),
}

/// Gauge reading attributes of one management bean
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GaugeConfig {
    pub mbean_object_name: String,

    #[serde(default)]
    pub mbean_attributes: Vec<MBeanAttribute>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MBeanAttribute {
    pub name: String,

    /// Report the per-second rate of change instead of the raw value
    #[serde(default)]
    pub counter: bool,
}

impl AgentConfig {
    /// Caps handed to collectors created from now on
    pub fn aggregate_limits(&self) -> AggregateLimits {
        AggregateLimits {
            max_aggregate_queries_per_query_type: self
                .advanced
                .max_aggregate_queries_per_query_type,
            max_aggregate_transactions_per_transaction_type: self
                .advanced
                .max_aggregate_transactions_per_transaction_type,
            overall_queries_hard_limit_multiplier: self
                .aggregation
                .overall_queries_hard_limit_multiplier,
            transaction_queries_hard_limit_multiplier: self
                .aggregation
                .transaction_queries_hard_limit_multiplier,
        }
    }

    pub fn plugin(&self, id: &str) -> Option<&PluginConfig> {
        self.plugins.iter().find(|p| p.id == id)
    }

    /// Check values the aggregator cannot work with
    ///
    /// # Errors
    /// * `ConfigError::InvalidValue` - zero interval, cap or multiplier
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregation.interval_millis == 0 {
            return Err(ConfigError::InvalidValue(
                "aggregation.interval_millis must be positive".to_string(),
            ));
        }
        if self.advanced.max_aggregate_queries_per_query_type == 0 {
            return Err(ConfigError::InvalidValue(
                "advanced.max_aggregate_queries_per_query_type must be positive".to_string(),
            ));
        }
        if self.advanced.max_aggregate_transactions_per_transaction_type == 0 {
            return Err(ConfigError::InvalidValue(
                "advanced.max_aggregate_transactions_per_transaction_type must be positive"
                    .to_string(),
            ));
        }
        if self.aggregation.overall_queries_hard_limit_multiplier == 0
            || self.aggregation.transaction_queries_hard_limit_multiplier == 0
        {
            return Err(ConfigError::InvalidValue(
                "query hard limit multipliers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load the agent configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the TOML configuration file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Parse` - If TOML is invalid
/// * `ConfigError::InvalidValue` - If a limit is unusable
///
/// # Example
/// ```ignore
/// let config = load_config("agent.toml")?;
/// let aggregator = Aggregator::new(config.aggregation.interval_millis, config.aggregate_limits());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AgentConfig, ConfigError> {
    let path = path.as_ref();
    debug!("Loading agent config from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    let config: AgentConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Write the agent configuration as TOML
///
/// The file is written next to its destination first and then renamed over
/// it, so readers never observe a partial file.
///
/// # Errors
/// * `ConfigError::Serialize` - If the config cannot be represented in TOML
/// * `ConfigError::Io` - If the file cannot be written
pub fn save_config(config: &AgentConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let contents = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let staging = path.with_extension("toml.tmp");
    fs::write(&staging, contents)?;
    fs::rename(&staging, path)?;

    info!("Agent config written to: {}", path.display());
    Ok(())
}
