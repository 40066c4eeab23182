//! Record lifecycle across the vault blob and the key directory.
//!
//! The stores themselves know nothing about each other. [`Vault`] keeps
//! them consistent: a centralized key is imported before the record that
//! references it is saved, and deleted only after the vault no longer
//! references it.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::ssh::{AuthMethod, ConnectionRecord, CredentialCollection, ServerRecord};
use crate::storage::{ConnectionStore, CredentialStore, KeyStore, StorageError};
use crate::sync::SyncTarget;

/// Errors from vault record operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A server with this name already exists.
    #[error("Server '{0}' already exists")]
    Duplicate(String),

    /// No server with this name exists.
    #[error("Server '{0}' not found")]
    NotFound(String),

    /// Server names must not be empty.
    #[error("Server name must not be empty")]
    EmptyName,

    /// Key authentication needs a key file path.
    #[error("Key file path must not be empty")]
    EmptyKeyPath,

    /// Underlying storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Counts reported by [`Vault::rotate_password`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationSummary {
    /// Servers re-encrypted in the vault blob.
    pub servers: usize,
    /// Connections re-encrypted in the per-entry store.
    pub connections: usize,
}

/// All stores rooted in one config directory.
#[derive(Debug, Clone)]
pub struct Vault {
    credentials: CredentialStore,
    keys: KeyStore,
    connections: ConnectionStore,
}

impl Vault {
    /// Opens the stores inside `config_dir`.
    #[must_use]
    pub fn open(config_dir: &Path, sync: SyncTarget) -> Self {
        Self {
            credentials: CredentialStore::new(config_dir),
            keys: KeyStore::new(config_dir),
            connections: ConnectionStore::new(config_dir).with_sync(sync),
        }
    }

    /// Returns the vault blob store.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Returns the centralized key store.
    #[must_use]
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// Returns the per-entry connection store.
    #[must_use]
    pub fn connections(&self) -> &ConnectionStore {
        &self.connections
    }

    /// Returns true if anything has been saved yet.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.credentials.exists() || self.connections.has_entries()
    }

    /// Loads the server collection.
    pub fn load(&self, password: &str) -> Result<CredentialCollection, VaultError> {
        Ok(self.credentials.load(password)?)
    }

    /// Loads per-entry connections, or nothing if none were ever saved.
    pub fn load_connections(&self, password: &str) -> Result<Vec<ConnectionRecord>, VaultError> {
        if !self.connections.has_entries() {
            return Ok(Vec::new());
        }
        Ok(self.connections.load_all(password)?)
    }

    /// Adds `record` and saves the vault.
    ///
    /// With `centralize`, an external key file is first copied into the
    /// key directory and the record is pointed at the copy. If the save
    /// fails the copy is removed again and `collection` is left unchanged.
    pub fn add_server(
        &self,
        collection: &mut CredentialCollection,
        mut record: ServerRecord,
        centralize: bool,
        password: &str,
    ) -> Result<(), VaultError> {
        if record.name.trim().is_empty() {
            return Err(VaultError::EmptyName);
        }
        if collection.contains(&record.name) {
            return Err(VaultError::Duplicate(record.name));
        }
        check_key_path(&record.auth)?;

        let imported = if centralize {
            self.import_key(&mut record.auth, &record.name)?
        } else {
            None
        };

        let name = record.name.clone();
        collection.push(record);

        if let Err(e) = self.credentials.save(collection, password) {
            collection.remove(&name);
            if let Some(ref path) = imported {
                self.keys.remove_key(path);
            }
            return Err(e.into());
        }

        info!("Added server '{}'", name);
        Ok(())
    }

    /// Removes the server named `name` (ignoring case) and saves.
    ///
    /// Its centralized key is deleted after the save unless another
    /// server still references it.
    pub fn remove_server(
        &self,
        collection: &mut CredentialCollection,
        name: &str,
        password: &str,
    ) -> Result<ServerRecord, VaultError> {
        let removed = collection
            .remove(name)
            .ok_or_else(|| VaultError::NotFound(name.to_string()))?;

        if let Err(e) = self.credentials.save(collection, password) {
            collection.push(removed);
            return Err(e.into());
        }

        if let Some(path) = removed.auth.key_path() {
            self.release_key(collection, path);
        }

        info!("Removed server '{}'", removed.name);
        Ok(removed)
    }

    /// Replaces the authentication of server `name` and saves.
    ///
    /// The new key is imported first (with `centralize`); the old
    /// centralized key is deleted once the save succeeded and nothing
    /// else references it.
    pub fn replace_auth(
        &self,
        collection: &mut CredentialCollection,
        name: &str,
        mut auth: AuthMethod,
        centralize: bool,
        password: &str,
    ) -> Result<(), VaultError> {
        let record_name = collection
            .find(name)
            .map(|r| r.name.clone())
            .ok_or_else(|| VaultError::NotFound(name.to_string()))?;
        check_key_path(&auth)?;

        let imported = if centralize {
            self.import_key(&mut auth, &record_name)?
        } else {
            None
        };

        let previous = match collection.find_mut(&record_name) {
            Some(record) => std::mem::replace(&mut record.auth, auth),
            None => return Err(VaultError::NotFound(record_name)),
        };

        if let Err(e) = self.credentials.save(collection, password) {
            if let Some(record) = collection.find_mut(&record_name) {
                record.auth = previous;
            }
            if let Some(ref path) = imported {
                self.keys.remove_key(path);
            }
            return Err(e.into());
        }

        if let Some(old_path) = previous.key_path() {
            self.release_key(collection, old_path);
        }

        info!("Updated authentication for '{}'", record_name);
        Ok(())
    }

    /// Re-encrypts everything saved under `old` with `new`.
    ///
    /// Both stores are loaded before anything is written, so a wrong `old`
    /// password changes nothing.
    pub fn rotate_password(&self, old: &str, new: &str) -> Result<RotationSummary, VaultError> {
        let servers = if self.credentials.exists() {
            Some(self.credentials.load(old)?)
        } else {
            None
        };
        let connections = if self.connections.has_entries() {
            Some(self.connections.load_all(old)?)
        } else {
            None
        };

        let mut summary = RotationSummary::default();
        if let Some(servers) = servers {
            self.credentials.save(&servers, new)?;
            summary.servers = servers.len();
        }
        if let Some(connections) = connections {
            self.connections.save_all(&connections, new)?;
            summary.connections = connections.len();
        }

        info!(
            "Rotated master password ({} server(s), {} connection(s))",
            summary.servers, summary.connections
        );
        Ok(summary)
    }

    /// Copies an external key into the key directory and rewrites `auth`.
    ///
    /// Returns the new path, or `None` when there was nothing to import.
    fn import_key(&self, auth: &mut AuthMethod, server_name: &str) -> Result<Option<PathBuf>, StorageError> {
        let AuthMethod::Key { path, .. } = auth else {
            return Ok(None);
        };
        if self.keys.is_centralized(path) {
            return Ok(None);
        }

        let stored = self.keys.store_key(path, server_name)?;
        *path = stored.clone();
        Ok(Some(stored))
    }

    /// Deletes a centralized key no longer referenced by `collection`.
    fn release_key(&self, collection: &CredentialCollection, path: &Path) {
        if !self.keys.is_centralized(path) {
            return;
        }
        if collection.references_key(path) {
            debug!("Key {} is still referenced, keeping it", path.display());
            return;
        }
        self.keys.remove_key(path);
    }
}

/// Rejects key authentication without a key file.
fn check_key_path(auth: &AuthMethod) -> Result<(), VaultError> {
    match auth {
        AuthMethod::Key { path, .. } if path.as_os_str().is_empty() => Err(VaultError::EmptyKeyPath),
        _ => Ok(()),
    }
}
