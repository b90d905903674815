//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while recording, encoding or decoding histograms
#[derive(Error, Debug)]
pub enum HistogramError {
    #[error("Failed to create HDR histogram: {0}")]
    Creation(String),

    #[error("Failed to record value in HDR histogram: {0}")]
    Record(String),

    #[error("Failed to merge HDR histograms: {0}")]
    Merge(String),

    #[error("Failed to encode histogram: {0}")]
    Encode(String),

    #[error("IO error while encoding histogram: {0}")]
    Io(#[from] std::io::Error),

    #[error("Histogram encoding is truncated (expected {expected} bytes, found {found})")]
    Truncated { expected: usize, found: usize },

    #[error("Unknown histogram encoding format: {0}")]
    UnknownFormat(u8),

    #[error("Failed to decode HDR histogram: {0}")]
    Decode(String),
}

/// Errors that can occur while building an aggregate snapshot
///
/// The collector is never modified by a failed build, so the caller may
/// retry or discard the interval as it sees fit.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Histogram serialization failed: {0}")]
    Histogram(#[from] HistogramError),
}

/// Errors that can occur while loading or updating agent configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("Unexpected plugin property value for {plugin}.{property}: {reason}")]
    UnexpectedPropertyValue {
        plugin: String,
        property: String,
        reason: String,
    },
}

/// Errors that can occur during communication with the central collector
#[derive(Error, Debug)]
pub enum CentralError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid central response: {0}")]
    InvalidResponse(String),

    #[error("Agent not registered with central: {0}")]
    AgentNotFound(String),
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Profile has no samples")]
    EmptyProfile,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Flamegraph rendering failed: {0}")]
    Render(String),

    #[error("Flamegraph output is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
