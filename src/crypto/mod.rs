//! Password-based encryption for vault payloads.
//!
//! - **kdf**: PBKDF2-HMAC-SHA256 stretching of the master password into an
//!   AES-256 key and CBC initialization vector
//! - **codec**: AES-256-CBC/PKCS#7 encryption with base64 text transport
//!
//! The salt is fixed and the IV is derived from the password, so the same
//! plaintext encrypted twice under the same password produces the same
//! ciphertext. This keeps the on-disk format readable by existing vaults.

pub mod codec;
pub mod kdf;

pub use codec::{CryptoError, decrypt, encrypt};
pub use kdf::{DerivedKey, derive};
