//! Per-entry connection store.
//!
//! Each connection lives in `<dir>/<sanitized-name>.bin`, encrypted on its
//! own. Saving writes every desired connection and then deletes any `.bin`
//! file that was not just written, so the directory mirrors the saved set.
//! Writes are not transactional: a crash mid-save can leave a mix of old
//! and new files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::blob::restrict_permissions;
use super::error::StorageError;
use crate::crypto;
use crate::ssh::ConnectionRecord;
use crate::sync::SyncTarget;

/// Connections directory name inside the config directory.
pub const CONNECTIONS_DIR_NAME: &str = "connections";

/// File extension of connection entries.
pub const ENTRY_EXTENSION: &str = "bin";

/// Characters that may not appear in a file name on any supported platform.
const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces characters that are illegal in file names with `_`.
///
/// Control characters count as illegal. An empty result becomes `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Directory of individually encrypted connections.
#[derive(Debug, Clone)]
pub struct ConnectionStore {
    /// Directory holding the `.bin` entries.
    dir: PathBuf,
    /// Remote sync performed around loads and saves.
    sync: SyncTarget,
}

impl ConnectionStore {
    /// Creates a store for `<config_dir>/connections`.
    #[must_use]
    pub fn new(config_dir: &Path) -> Self {
        Self::with_dir(config_dir.join(CONNECTIONS_DIR_NAME))
    }

    /// Creates a store for an explicit directory.
    #[must_use]
    pub fn with_dir(dir: PathBuf) -> Self {
        assert!(!dir.as_os_str().is_empty(), "dir must not be empty");
        Self {
            dir,
            sync: SyncTarget::default(),
        }
    }

    /// Sets the remote sync target.
    #[must_use]
    pub fn with_sync(mut self, sync: SyncTarget) -> Self {
        self.sync = sync;
        self
    }

    /// Returns the entries directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the entry path a connection with `name` is saved to.
    #[must_use]
    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_file_name(name), ENTRY_EXTENSION))
    }

    /// Returns true if the directory holds at least one entry.
    #[must_use]
    ///
    /// A missing directory has no entries. Any other listing failure is
    /// logged and also reported as no entries.
    pub fn has_entries(&self) -> bool {
        if !self.dir.exists() {
            return false;
        }
        match self.entry_files() {
            Ok(files) => !files.is_empty(),
            Err(e) => {
                warn!("Could not list connections in {}: {}", self.dir.display(), e);
                false
            }
        }
    }

    /// Loads and decrypts every entry.
    ///
    /// Entries that decrypt to nothing are skipped. Any entry failing to
    /// decrypt fails the whole load with [`StorageError::Crypto`].
    pub fn load_all(&self, password: &str) -> Result<Vec<ConnectionRecord>, StorageError> {
        fs::create_dir_all(&self.dir)?;
        self.sync.sync_connections(&self.dir);

        let mut connections = Vec::new();
        for path in self.entry_files()? {
            let encrypted = fs::read_to_string(&path)?;
            let json = crypto::decrypt(&encrypted, password)?;
            if json.is_empty() {
                debug!("Skipping empty entry {}", path.display());
                continue;
            }

            let parsed: Option<ConnectionRecord> = serde_json::from_str(&json)?;
            if let Some(connection) = parsed {
                connections.push(connection);
            }
        }

        debug!(
            "Loaded {} connection(s) from {}",
            connections.len(),
            self.dir.display()
        );
        Ok(connections)
    }

    /// Encrypts each connection into its own entry and removes stale ones.
    ///
    /// Connections whose sanitized names coincide share one file; the last
    /// one in `connections` wins.
    pub fn save_all(&self, connections: &[ConnectionRecord], password: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        let mut stale: HashSet<PathBuf> = self.entry_files()?.into_iter().collect();

        for connection in connections {
            let json = serde_json::to_string(connection)?;
            let encrypted = crypto::encrypt(&json, password);
            let path = self.entry_path(&connection.name);

            fs::write(&path, encrypted)?;
            restrict_permissions(&path);
            stale.remove(&path);
        }

        for obsolete in &stale {
            fs::remove_file(obsolete)?;
            debug!("Removed obsolete entry {}", obsolete.display());
        }

        info!(
            "Saved {} connection(s), removed {} obsolete entr{}",
            connections.len(),
            stale.len(),
            if stale.len() == 1 { "y" } else { "ies" }
        );

        self.sync.sync_connections(&self.dir);
        Ok(())
    }

    /// Lists the `.bin` files in the directory, sorted by path.
    fn entry_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
