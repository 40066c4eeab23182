//! Storage error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::crypto::CryptoError;

/// Underlying cause of a failed load or save.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Decryption error (usually a wrong password).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The vault exists but could not be read with this password.
    #[error("Failed to load configuration: {0}")]
    Load(#[source] PipelineError),

    /// The vault could not be written.
    #[error("Failed to save configuration: {0}")]
    Save(#[source] PipelineError),

    /// The key file to import does not exist.
    #[error("SSH key file not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    /// The key file could not be copied into the key directory.
    #[error("Failed to copy SSH key to centralized storage: {0}")]
    KeyImport(#[source] io::Error),

    /// An entry could not be decrypted.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// An entry could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Returns true if the failure came from decryption.
    #[must_use]
    pub fn is_crypto(&self) -> bool {
        matches!(
            self,
            Self::Crypto(_) | Self::Load(PipelineError::Crypto(_))
        )
    }
}
