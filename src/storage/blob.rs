//! Single-file vault holding the whole server collection.
//!
//! File content is `crypto::encrypt` applied to pretty-printed JSON of
//! `{ "servers": [...] }`. Every save rewrites the file in full.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::{PipelineError, StorageError};
use crate::crypto;
use crate::ssh::CredentialCollection;

/// Vault file name inside the config directory.
pub const VAULT_FILE_NAME: &str = "fast-ssh.conf";

/// Encrypted single-blob credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    /// Path to the vault file.
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store for the vault inside `config_dir`.
    #[must_use]
    pub fn new(config_dir: &Path) -> Self {
        Self::with_path(config_dir.join(VAULT_FILE_NAME))
    }

    /// Creates a store for an explicit vault file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        assert!(!path.as_os_str().is_empty(), "path must not be empty");
        Self { path }
    }

    /// Returns the vault file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the vault file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads and decrypts the collection.
    ///
    /// A missing vault yields an empty collection. A vault that cannot be
    /// read, decrypted or parsed with `password` yields
    /// [`StorageError::Load`].
    pub fn load(&self, password: &str) -> Result<CredentialCollection, StorageError> {
        if !self.exists() {
            debug!("No vault at {}, starting empty", self.path.display());
            return Ok(CredentialCollection::new());
        }

        let collection = self.read(password).map_err(StorageError::Load)?;
        debug!(
            "Loaded {} server(s) from {}",
            collection.len(),
            self.path.display()
        );
        Ok(collection)
    }

    fn read(&self, password: &str) -> Result<CredentialCollection, PipelineError> {
        let encrypted = fs::read_to_string(&self.path)?;
        let json = crypto::decrypt(&encrypted, password)?;
        if json.is_empty() {
            return Ok(CredentialCollection::new());
        }

        let parsed: Option<CredentialCollection> = serde_json::from_str(&json)?;
        Ok(parsed.unwrap_or_default())
    }

    /// Encrypts `collection` with `password` and replaces the vault file.
    ///
    /// The store has no notion of a current password: saving with a
    /// different password than the one used to load rotates it.
    pub fn save(&self, collection: &CredentialCollection, password: &str) -> Result<(), StorageError> {
        self.write(collection, password).map_err(StorageError::Save)?;
        info!(
            "Saved {} server(s) to {}",
            collection.len(),
            self.path.display()
        );
        Ok(())
    }

    fn write(&self, collection: &CredentialCollection, password: &str) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(collection)?;
        let encrypted = crypto::encrypt(&json, password);

        // Write to a sibling temp file, then rename over the vault
        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(encrypted.as_bytes())?;
            file.sync_all()?;
        }
        restrict_permissions(&temp_path);
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                tracing::warn!("Could not remove {}: {}", temp_path.display(), cleanup);
            }
            return Err(e.into());
        }

        Ok(())
    }
}

/// Sets owner-only read/write where the platform supports it.
pub(crate) fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        if let Err(e) = fs::set_permissions(path, perms) {
            tracing::warn!("Could not restrict permissions on {}: {}", path.display(), e);
        }
    }

    #[cfg(not(unix))]
    let _ = path;
}
