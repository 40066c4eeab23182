//! FastSSH
//!
//! An encrypted credential vault for SSH servers, with a small CLI that
//! connects to saved servers through the system `ssh` client.
//!
//! # Architecture
//!
//! - **Crypto Module**: PBKDF2 key derivation and the AES-256-CBC codec
//! - **Storage Module**: vault blob, centralized keys, per-entry connections
//! - **SSH Module**: record types and the ssh launcher
//! - **Vault**: record lifecycle keeping the stores consistent
//!
//! # Usage
//!
//! ```no_run
//! use fast_ssh::{ServerRecord, Vault};
//! use fast_ssh::sync::SyncTarget;
//!
//! let vault = Vault::open(&fast_ssh::config::config_dir(), SyncTarget::default());
//! let mut servers = vault.load("master password").expect("Failed to load vault");
//! vault
//!     .add_server(&mut servers, ServerRecord::new("web", "web.example.com", "deploy"), false, "master password")
//!     .expect("Failed to save vault");
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod cli;
pub mod config;
pub mod crypto;
pub mod logging;
pub mod ssh;
pub mod storage;
pub mod sync;
pub mod vault;

// Re-export main types
pub use config::UserConfig;
pub use ssh::{AuthMethod, ConnectionRecord, CredentialCollection, ServerRecord};
pub use storage::{ConnectionStore, CredentialStore, KeyStore, StorageError};
pub use vault::{Vault, VaultError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
