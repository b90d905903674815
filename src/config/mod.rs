//! Agent configuration and remote configuration updates.

pub mod agent;
pub mod update;

pub use agent::{
    load_config, save_config, AdvancedConfig, AgentConfig, AggregationConfig, GaugeConfig,
    MBeanAttribute, PluginConfig, PropertyValue, TransactionConfig, UserRecordingConfig,
};
pub use update::{
    apply_config_update, AdvancedConfigUpdate, ConfigUpdate, ConfigUpdateService,
    PluginConfigUpdate, PluginPropertyUpdate, TransactionConfigUpdate, UserRecordingConfigUpdate,
};
