//! Centralized private key storage.
//!
//! Imported keys are copied byte for byte into `<config-dir>/keys/` as
//! `{server}_{base}_{YYYYMMDD_HHMMSS}{.ext}` with owner-only permissions.
//! Records point at these copies; the copies are owned by this directory.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use super::entries::sanitize_file_name;
use super::error::StorageError;

/// Key directory name inside the config directory.
pub const KEYS_DIR_NAME: &str = "keys";

/// Upper bound on collision suffixes tried for one import.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Managed directory of private key copies.
#[derive(Debug, Clone)]
pub struct KeyStore {
    keys_dir: PathBuf,
}

impl KeyStore {
    /// Creates a key store inside `config_dir`.
    #[must_use]
    pub fn new(config_dir: &Path) -> Self {
        Self {
            keys_dir: config_dir.join(KEYS_DIR_NAME),
        }
    }

    /// Returns the managed key directory.
    #[must_use]
    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    /// Copies `original` into the key directory on behalf of `server_name`.
    ///
    /// The original file is only read. Returns the path of the copy.
    pub fn store_key(&self, original: &Path, server_name: &str) -> Result<PathBuf, StorageError> {
        if !original.is_file() {
            return Err(StorageError::KeyNotFound(original.to_path_buf()));
        }

        let contents = fs::read(original).map_err(StorageError::KeyImport)?;
        fs::create_dir_all(&self.keys_dir).map_err(StorageError::KeyImport)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let file_name = centralized_file_name(original, server_name, &timestamp);

        let path = self
            .write_new(&file_name, &contents)
            .map_err(StorageError::KeyImport)?;

        info!("Stored key for '{}' at {}", server_name, path.display());
        Ok(path)
    }

    /// Writes `contents` to a file that did not exist before.
    ///
    /// On a name clash (same server, file and second) a `-N` suffix is
    /// inserted before the extension.
    fn write_new(&self, file_name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let (stem, ext) = split_extension(file_name);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                file_name.to_string()
            } else {
                format!("{}-{}{}", stem, attempt, ext)
            };
            let path = self.keys_dir.join(&candidate);

            match create_private(&path) {
                Ok(mut file) => {
                    file.write_all(contents)?;
                    file.sync_all()?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("Key name {} taken, trying next", candidate);
                }
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free key file name for {}", file_name),
        ))
    }

    /// Returns true if `path` is non-empty and lies inside the key directory.
    ///
    /// Purely lexical; the file need not exist. Anything after the key
    /// directory prefix must be plain names, so `keys/../x` is outside.
    #[must_use]
    pub fn is_centralized(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.keys_dir) {
            Ok(rest) => {
                !rest.as_os_str().is_empty()
                    && rest.components().all(|c| matches!(c, Component::Normal(_)))
            }
            Err(_) => false,
        }
    }

    /// Deletes a centralized key.
    ///
    /// Paths outside the key directory and missing files are ignored.
    /// Deletion failures are logged, never returned. Returns true if a
    /// file was removed.
    pub fn remove_key(&self, path: &Path) -> bool {
        if !self.is_centralized(path) || !path.exists() {
            return false;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed centralized key {}", path.display());
                true
            }
            Err(e) => {
                warn!(
                    "Could not delete centralized key file {}: {}",
                    path.display(),
                    e
                );
                false
            }
        }
    }
}

/// Builds `{server}_{base}_{timestamp}{.ext}` for an imported key.
fn centralized_file_name(original: &Path, server_name: &str, timestamp: &str) -> String {
    let base = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    format!(
        "{}_{}_{}{}",
        sanitize_file_name(server_name),
        base,
        timestamp,
        ext
    )
}

/// Splits `name.ext` into (`name`, `.ext`); no dot gives an empty extension.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}
