//! Applying configuration updates pushed by the central collector.
//!
//! An update carries only the fields central wants changed. Everything it
//! leaves out keeps its local value.

use super::agent::{save_config, AgentConfig, GaugeConfig, PluginConfig, PropertyValue};
use crate::utils::error::ConfigError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

/// Configuration update as sent by central
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub transaction: Option<TransactionConfigUpdate>,

    #[serde(default)]
    pub user_recording: Option<UserRecordingConfigUpdate>,

    #[serde(default)]
    pub advanced: Option<AdvancedConfigUpdate>,

    #[serde(default)]
    pub plugins: Vec<PluginConfigUpdate>,

    /// Replaces the whole gauge list when present
    #[serde(default)]
    pub gauges: Option<Vec<GaugeConfig>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TransactionConfigUpdate {
    pub slow_threshold_millis: Option<u64>,
    pub profiling_interval_millis: Option<u64>,
    pub capture_thread_stats: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UserRecordingConfigUpdate {
    pub users: Option<Vec<String>>,
    pub profiling_interval_millis: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AdvancedConfigUpdate {
    pub timer_wrapper_methods: Option<bool>,
    pub weaving_timer: Option<bool>,
    pub immediate_partial_store_threshold_seconds: Option<u64>,
    pub max_aggregate_transactions_per_transaction_type: Option<usize>,
    pub max_aggregate_queries_per_query_type: Option<usize>,
    pub max_trace_entries_per_transaction: Option<usize>,
    pub max_stack_trace_samples_per_transaction: Option<usize>,
    pub mbean_gauge_not_found_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PluginConfigUpdate {
    pub id: String,

    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub properties: Vec<PluginPropertyUpdate>,
}

/// A plugin property on the wire: exactly one of the value fields is set
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PluginPropertyUpdate {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bval: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dval: Option<f64>,

    /// Present (with any value) for an explicitly unset number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dval_null: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sval: Option<String>,
}

impl PluginPropertyUpdate {
    /// Resolve the single value carried by this property
    ///
    /// # Errors
    /// * `ConfigError::UnexpectedPropertyValue` - no value or several values
    pub fn value(&self, plugin_id: &str) -> Result<PropertyValue, ConfigError> {
        let mut values = Vec::with_capacity(1);
        if let Some(b) = self.bval {
            values.push(PropertyValue::Bool(b));
        }
        if let Some(d) = self.dval {
            values.push(PropertyValue::Number(d));
        }
        if self.dval_null.is_some() {
            values.push(PropertyValue::NullNumber);
        }
        if let Some(s) = &self.sval {
            values.push(PropertyValue::String(s.clone()));
        }

        if values.len() != 1 {
            return Err(ConfigError::UnexpectedPropertyValue {
                plugin: plugin_id.to_string(),
                property: self.name.clone(),
                reason: format!("expected exactly one value, found {}", values.len()),
            });
        }
        Ok(values.remove(0))
    }
}

/// Build the configuration that results from applying an update
///
/// **Public** - main entry point for remote configuration
///
/// The current configuration is never modified. Either every section of the
/// update applies and the new configuration is returned, or the update is
/// rejected as a whole.
///
/// # Errors
/// * `ConfigError::UnexpectedPropertyValue` - a plugin property carries no
///   value or more than one
/// * `ConfigError::InvalidValue` - the result has an unusable limit
pub fn apply_config_update(
    current: &AgentConfig,
    update: &ConfigUpdate,
) -> Result<AgentConfig, ConfigError> {
    let mut config = current.clone();

    if let Some(transaction) = &update.transaction {
        let target = &mut config.transaction;
        set(&mut target.slow_threshold_millis, transaction.slow_threshold_millis);
        set(&mut target.profiling_interval_millis, transaction.profiling_interval_millis);
        set(&mut target.capture_thread_stats, transaction.capture_thread_stats);
    }

    if let Some(user_recording) = &update.user_recording {
        let target = &mut config.user_recording;
        set(&mut target.users, user_recording.users.clone());
        set(&mut target.profiling_interval_millis, user_recording.profiling_interval_millis);
    }

    if let Some(advanced) = &update.advanced {
        let target = &mut config.advanced;
        set(&mut target.timer_wrapper_methods, advanced.timer_wrapper_methods);
        set(&mut target.weaving_timer, advanced.weaving_timer);
        set(
            &mut target.immediate_partial_store_threshold_seconds,
            advanced.immediate_partial_store_threshold_seconds,
        );
        set(
            &mut target.max_aggregate_transactions_per_transaction_type,
            advanced.max_aggregate_transactions_per_transaction_type,
        );
        set(
            &mut target.max_aggregate_queries_per_query_type,
            advanced.max_aggregate_queries_per_query_type,
        );
        set(
            &mut target.max_trace_entries_per_transaction,
            advanced.max_trace_entries_per_transaction,
        );
        set(
            &mut target.max_stack_trace_samples_per_transaction,
            advanced.max_stack_trace_samples_per_transaction,
        );
        set(
            &mut target.mbean_gauge_not_found_delay_seconds,
            advanced.mbean_gauge_not_found_delay_seconds,
        );
    }

    for plugin_update in &update.plugins {
        match config.plugins.iter_mut().find(|p| p.id == plugin_update.id) {
            Some(plugin) => apply_plugin_update(plugin, plugin_update)?,
            // central may know plugins this agent does not have
            None => debug!("Skipping update for unknown plugin: {}", plugin_update.id),
        }
    }

    if let Some(gauges) = &update.gauges {
        config.gauges = gauges.clone();
    }

    config.validate()?;
    Ok(config)
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn apply_plugin_update(
    plugin: &mut PluginConfig,
    update: &PluginConfigUpdate,
) -> Result<(), ConfigError> {
    set(&mut plugin.enabled, update.enabled);
    for property in &update.properties {
        let value = property.value(&plugin.id)?;
        plugin.properties.insert(property.name.clone(), value);
    }
    Ok(())
}

/// Serializes configuration updates and keeps the current configuration
///
/// Concurrent updates run one at a time. The stored configuration (and the
/// file, when one is attached) only changes when an update fully succeeds.
pub struct ConfigUpdateService {
    config: Mutex<AgentConfig>,
    path: Option<PathBuf>,
}

impl ConfigUpdateService {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config: Mutex::new(config),
            path: None,
        }
    }

    /// Persist every successful update to `path`
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn current(&self) -> AgentConfig {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply an update and store the result
    ///
    /// # Returns
    /// The new configuration
    ///
    /// # Errors
    /// * `ConfigError` - the update was rejected or could not be saved; the
    ///   stored configuration is unchanged
    pub fn update_config(&self, update: &ConfigUpdate) -> Result<AgentConfig, ConfigError> {
        let mut config = self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let updated = apply_config_update(&config, update)?;
        if let Some(path) = &self.path {
            save_config(&updated, path)?;
        }
        *config = updated.clone();

        info!("Applied config update");
        Ok(updated)
    }
}
