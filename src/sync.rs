//! Connection storage modes and the remote sync hook.
//!
//! Only local storage is implemented. Remote modes call into
//! [`SyncTarget::sync_connections`], which records the intended endpoint
//! and leaves the local files as they are.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Endpoint used for the hosted sync service.
pub const SSH_HUB_URL: &str = "https://ssh-hub.com";

/// Where per-entry connections are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StorageMode {
    /// Local files only.
    #[default]
    #[serde(rename = "local")]
    Local,
    /// Synced with the hosted service.
    #[serde(rename = "ssh-hub")]
    SshHub,
    /// Synced with a user-run server.
    #[serde(rename = "self-hosted")]
    SelfHosted,
}

impl StorageMode {
    /// Parses a storage mode, falling back to local.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ssh-hub" | "sshhub" | "hub" | "2" => Self::SshHub,
            "self-hosted" | "selfhosted" | "self" | "3" => Self::SelfHosted,
            _ => Self::Local,
        }
    }

    /// Returns the config file spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::SshHub => "ssh-hub",
            Self::SelfHosted => "self-hosted",
        }
    }

    /// Returns a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Local => "Local files only",
            Self::SshHub => "SSH-Hub (hosted sync)",
            Self::SelfHosted => "Self-hosted sync server",
        }
    }

    /// Returns true if this mode syncs with a remote.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl<'de> Deserialize<'de> for StorageMode {
    /// Unknown spellings load as [`StorageMode::Local`].
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Sync configuration handed to the per-entry store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncTarget {
    /// Storage mode.
    pub mode: StorageMode,
    /// Server URL for [`StorageMode::SelfHosted`].
    pub self_hosted_url: String,
}

impl SyncTarget {
    /// Creates a sync target.
    #[must_use]
    pub fn new(mode: StorageMode, self_hosted_url: impl Into<String>) -> Self {
        Self {
            mode,
            self_hosted_url: self_hosted_url.into(),
        }
    }

    /// Returns the remote endpoint, if the mode has one.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        match self.mode {
            StorageMode::Local => None,
            StorageMode::SshHub => Some(SSH_HUB_URL),
            StorageMode::SelfHosted if self.self_hosted_url.is_empty() => None,
            StorageMode::SelfHosted => Some(&self.self_hosted_url),
        }
    }

    /// Synchronizes the connection directory with the remote.
    ///
    /// No transfer protocol exists yet, so this only logs. It never fails
    /// the surrounding store operation.
    pub fn sync_connections(&self, dir: &Path) {
        if !self.mode.is_remote() {
            return;
        }

        match self.endpoint() {
            Some(endpoint) => info!(
                "Remote sync ({}) of {} with {} is not available, keeping local files",
                self.mode.as_str(),
                dir.display(),
                endpoint
            ),
            None => debug!("Self-hosted sync selected without a URL, skipping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_mode_parse() {
        assert_eq!(StorageMode::parse("local"), StorageMode::Local);
        assert_eq!(StorageMode::parse("SSH-Hub"), StorageMode::SshHub);
        assert_eq!(StorageMode::parse("self-hosted"), StorageMode::SelfHosted);
        assert_eq!(StorageMode::parse("3"), StorageMode::SelfHosted);
        assert_eq!(StorageMode::parse("unknown"), StorageMode::Local);
    }

    #[test]
    fn test_storage_mode_serde() {
        let json = serde_json::to_string(&StorageMode::SelfHosted).unwrap();
        assert_eq!(json, "\"self-hosted\"");
        let mode: StorageMode = serde_json::from_str("\"ssh-hub\"").unwrap();
        assert_eq!(mode, StorageMode::SshHub);
        let mode: StorageMode = serde_json::from_str("\"ftp\"").unwrap();
        assert_eq!(mode, StorageMode::Local);
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(SyncTarget::default().endpoint(), None);
        assert_eq!(
            SyncTarget::new(StorageMode::SshHub, "").endpoint(),
            Some(SSH_HUB_URL)
        );
        assert_eq!(SyncTarget::new(StorageMode::SelfHosted, "").endpoint(), None);
        assert_eq!(
            SyncTarget::new(StorageMode::SelfHosted, "https://sync.lan").endpoint(),
            Some("https://sync.lan")
        );
    }

    #[test]
    fn test_sync_leaves_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.bin");
        std::fs::write(&file, "x").unwrap();

        SyncTarget::new(StorageMode::SshHub, "").sync_connections(dir.path());
        assert!(file.exists());
    }
}
