//! User configuration.
//!
//! Stored as `config.json` in the config directory:
//!
//! ```json
//! {
//!   "ConnectionsStorageMode": "local",
//!   "SelfHostedUrl": "",
//!   "LogLevel": "info",
//!   "LogRetentionHours": 24
//! }
//! ```
//!
//! A missing file means defaults. Secrets never go in this file.

pub mod platform;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use platform::config_dir;

use crate::logging::{DEFAULT_LOG_LEVEL, DEFAULT_LOG_RETENTION_HOURS, LogConfig};
use crate::sync::{StorageMode, SyncTarget};

/// Config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Errors reading or writing the user configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error.
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Non-secret user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserConfig {
    /// Where per-entry connections are kept.
    pub connections_storage_mode: StorageMode,
    /// Sync server URL for self-hosted mode.
    pub self_hosted_url: String,
    /// Log level (trace, debug, info, warn, error, off).
    pub log_level: String,
    /// Hours to keep old log files.
    pub log_retention_hours: u32,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            connections_storage_mode: StorageMode::Local,
            self_hosted_url: String::new(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_retention_hours: DEFAULT_LOG_RETENTION_HOURS,
        }
    }
}

impl UserConfig {
    /// Returns the config file path inside `config_dir`.
    #[must_use]
    pub fn path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads the config from `config_dir`, or defaults if absent.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(config_dir);
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = fs::read_to_string(&path)?;
        let parsed: Option<Self> = serde_json::from_str(&json)?;
        Ok(parsed.unwrap_or_default())
    }

    /// Writes the config to `config_dir`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(config_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(config_dir), json)?;
        Ok(())
    }

    /// Returns the sync target for the per-entry store.
    #[must_use]
    pub fn sync_target(&self) -> SyncTarget {
        SyncTarget::new(self.connections_storage_mode, self.self_hosted_url.clone())
    }

    /// Returns the logging configuration.
    #[must_use]
    pub fn log_config(&self, config_dir: &Path) -> LogConfig {
        LogConfig {
            directory: config_dir.join("logs"),
            retention_hours: self.log_retention_hours,
            level: LogConfig::parse_level(&self.log_level),
            enabled: true,
        }
    }
}
