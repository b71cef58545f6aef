use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Unable to resolve home directory; set TASKLY_HOME to an absolute path")]
    HomeNotFound,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TasklyConfig {
    /// Seconds between heartbeat writes of the background tracker.
    pub heartbeat_interval_secs: Option<u64>,
}

impl TasklyConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        let secs = self
            .heartbeat_interval_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_SECS);
        Duration::from_secs(secs)
    }
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

/// Data directory holding every Taskly file. `TASKLY_HOME` wins over `~/.taskly`.
pub fn resolve_taskly_home() -> Result<PathBuf, ConfigError> {
    if let Ok(value) = std::env::var("TASKLY_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir()
        .map(|home| home.join(".taskly"))
        .ok_or(ConfigError::HomeNotFound)
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}

pub fn load_config(home: &Path) -> Result<TasklyConfig, ConfigError> {
    let path = config_path(home);
    if !path.is_file() {
        return Ok(TasklyConfig::default());
    }
    let text = fs::read_to_string(&path)?;
    Ok(toml::from_str::<TasklyConfig>(&text)?)
}

/// Like [`load_config`], but a broken file degrades to defaults with a warning.
pub fn load_config_or_default(home: &Path) -> TasklyConfig {
    match load_config(home) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, path = %config_path(home).display(), "Ignoring unreadable config");
            TasklyConfig::default()
        }
    }
}
