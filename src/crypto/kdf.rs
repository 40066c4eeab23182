//! Master password key derivation.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Salt shared by every vault. Changing it breaks existing vault files.
const SALT: &[u8] = b"FastSSH_Salt_2024";

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// AES-256 key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// CBC initialization vector length in bytes.
pub const IV_LENGTH: usize = 16;

/// Key and IV derived from a password.
///
/// Both buffers are wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LENGTH],
    iv: [u8; IV_LENGTH],
}

impl DerivedKey {
    /// Returns the 32-byte cipher key.
    #[must_use]
    pub fn key(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Returns the 16-byte initialization vector.
    #[must_use]
    pub fn iv(&self) -> &[u8; IV_LENGTH] {
        &self.iv
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derives the cipher key and IV from a password.
///
/// The first 32 bytes of the PBKDF2 output stream become the key and the
/// next 16 bytes the IV. Any password is accepted, including the empty
/// string.
#[must_use]
pub fn derive(password: &str) -> DerivedKey {
    let mut output = [0u8; KEY_LENGTH + IV_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), SALT, PBKDF2_ITERATIONS, &mut output);

    let mut derived = DerivedKey {
        key: [0u8; KEY_LENGTH],
        iv: [0u8; IV_LENGTH],
    };
    derived.key.copy_from_slice(&output[..KEY_LENGTH]);
    derived.iv.copy_from_slice(&output[KEY_LENGTH..]);
    output.zeroize();

    derived
}
