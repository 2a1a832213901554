mod config;

pub use config::{Config, ScheduleSection, StorageSection};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/keepsake[-dev]/` based on KEEPSAKE_ENV.
///
/// Set KEEPSAKE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("KEEPSAKE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("keepsake-dev")
    } else {
        base_dir.join("keepsake")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
