//! SSH connection profiles.
//!
//! Provides:
//! - Server records stored in the vault blob
//! - Connection records stored by the per-entry store
//! - Launching the system ssh client with a stored profile

pub mod connection;
pub mod launcher;
pub mod server;

pub use connection::{ConnectionAuth, ConnectionRecord};
pub use launcher::{Identity, LaunchError, SshInvocation, TempKeyFile};
pub use server::{AuthMethod, CredentialCollection, DEFAULT_PORT, ServerRecord};
