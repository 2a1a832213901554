//! TOML-based application configuration.
//!
//! Stores:
//! - Where and under which key unlock progress is persisted
//! - Which schedule file to use
//!
//! Configuration is stored at `~/.config/keepsake/config.toml`.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ScheduleError};
use crate::schedule::Schedule;
use crate::store::validate_key;
use crate::unlock::DEFAULT_STORAGE_KEY;

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_SCHEDULE_FILE: &str = "schedule.toml";

/// Unlock persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_key")]
    pub key: String,
    /// Directory for unlock files; the data directory when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Schedule source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScheduleSection {
    /// Schedule TOML file. Relative paths resolve against the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

fn default_key() -> String {
    DEFAULT_STORAGE_KEY.into()
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            key: default_key(),
            dir: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: "not a leaf value".to_string(),
                        });
                    }
                    // Optional paths: an empty value clears them
                    serde_json::Value::Null | serde_json::Value::String(_) if value.is_empty() => {
                        serde_json::Value::Null
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Path of the config file inside `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    /// Load from `dir`, writing defaults if no config exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed (the file is left untouched), or if the default config
    /// cannot be written to disk.
    pub fn load_in(dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(dir);
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_in(dir)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_in(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path_in(dir);
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::create_dir_all(dir).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. Does not save; on error `self` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    /// `storage.key` names a file, so it must also pass [`validate_key`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |e: serde_json::Error| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        };
        let mut json = serde_json::to_value(&*self).map_err(invalid)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(invalid)?;
        validate_key(&updated.storage.key)?;
        *self = updated;
        Ok(())
    }

    /// Directory unlock progress is stored in.
    pub fn unlock_dir(&self, data_dir: &Path) -> PathBuf {
        match &self.storage.dir {
            Some(dir) => data_dir.join(dir),
            None => data_dir.to_path_buf(),
        }
    }

    /// Resolve the schedule: the configured file, else `schedule.toml` in
    /// the data directory, else the built-in schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if a schedule file exists but is invalid, or if a
    /// configured file cannot be read.
    pub fn schedule(&self, data_dir: &Path) -> Result<Schedule, ScheduleError> {
        if let Some(path) = &self.schedule.path {
            return Schedule::load(&data_dir.join(path));
        }

        let default_path = data_dir.join(DEFAULT_SCHEDULE_FILE);
        if default_path.exists() {
            Schedule::load(&default_path)
        } else {
            Ok(Schedule::builtin())
        }
    }
}
