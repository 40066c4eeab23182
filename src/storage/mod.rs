//! On-disk persistence for connection profiles.
//!
//! - **blob**: the whole server collection encrypted into one vault file
//! - **entries**: one encrypted file per connection, reconciled on save
//! - **keys**: private keys copied into a managed directory
//!
//! Every store takes the master password per call and keeps no key
//! material between calls. There is no file locking: concurrent writers
//! race and the last one wins.

pub mod blob;
pub mod entries;
mod error;
pub mod keys;

pub use blob::CredentialStore;
pub use entries::ConnectionStore;
pub use error::{PipelineError, StorageError};
pub use keys::KeyStore;
