//! Core error types for keepsake-core.
//!
//! Reconciliation itself never fails; these errors come from the
//! surrounding operations (loading a schedule, talking to a store,
//! reading or writing configuration). `CoreError` is what the CLI
//! commands return.

use std::path::PathBuf;
use thiserror::Error;

use crate::schedule::ItemId;

/// Core error type for keepsake-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Schedule-related errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Schedule definition errors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A schedule needs at least one item (the unconditional one)
    #[error("schedule has no items")]
    Empty,

    /// Item ids must be positive
    #[error("item id must be positive, got {0}")]
    InvalidId(ItemId),

    /// Item ids must be unique
    #[error("duplicate item id {0}")]
    DuplicateId(ItemId),

    /// Failed to read the schedule file
    #[error("Failed to read schedule from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the schedule file
    #[error("Failed to parse schedule: {0}")]
    ParseFailed(#[from] toml::de::Error),
}

/// Persistent store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No persistent store exists in this environment
    #[error("persistent store unavailable")]
    Unavailable,

    /// Reading the stored value failed
    #[error("Failed to read '{key}': {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the value failed (disk full, permissions, ...)
    #[error("Failed to write '{key}': {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Keys are used as file names and must stay inside the store
    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to locate or create the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<StoreError> for ConfigError {
    fn from(e: StoreError) -> Self {
        Self::InvalidValue {
            key: "storage.key".to_string(),
            message: e.to_string(),
        }
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
