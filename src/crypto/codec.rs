//! AES-256-CBC payload codec.
//!
//! Ciphertext is transported as standard base64 with padding. The blob
//! carries no salt, IV or version header: everything needed to decrypt is
//! re-derived from the password.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use thiserror::Error;
use zeroize::Zeroizing;

use super::kdf::{self, DerivedKey};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

/// Errors raised while decrypting a payload.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Input is not valid base64.
    #[error("Ciphertext is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// Decoded input is not a whole number of cipher blocks.
    #[error("Ciphertext length {0} is not a multiple of the {BLOCK_SIZE}-byte block size")]
    InvalidLength(usize),

    /// Padding check failed: wrong password or corrupted data.
    #[error("Decryption failed: wrong password or corrupted data")]
    Decrypt,

    /// Decrypted bytes are not UTF-8 text.
    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Encrypts `plaintext` with a key derived from `password`.
///
/// Returns an empty string for empty input without touching the cipher.
#[must_use]
pub fn encrypt(plaintext: &str, password: &str) -> String {
    if plaintext.is_empty() {
        return String::new();
    }

    let derived = kdf::derive(password);
    let ciphertext = encryptor(&derived).encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    BASE64.encode(ciphertext)
}

/// Decrypts text produced by [`encrypt`].
///
/// Returns an empty string for empty input. A wrong password surfaces as
/// [`CryptoError::Decrypt`] (or, rarely, [`CryptoError::InvalidUtf8`]
/// when the garbage happens to carry valid padding).
pub fn decrypt(ciphertext: &str, password: &str) -> Result<String, CryptoError> {
    let ciphertext = ciphertext.trim();
    if ciphertext.is_empty() {
        return Ok(String::new());
    }

    let bytes = BASE64.decode(ciphertext)?;
    if bytes.is_empty() || bytes.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidLength(bytes.len()));
    }

    let derived = kdf::derive(password);
    let plaintext = Zeroizing::new(
        decryptor(&derived)
            .decrypt_padded_vec_mut::<Pkcs7>(&bytes)
            .map_err(|_| CryptoError::Decrypt)?,
    );

    String::from_utf8(plaintext.to_vec()).map_err(|_| CryptoError::InvalidUtf8)
}

fn encryptor(derived: &DerivedKey) -> Aes256CbcEnc {
    Aes256CbcEnc::new(derived.key().into(), derived.iv().into())
}

fn decryptor(derived: &DerivedKey) -> Aes256CbcDec {
    Aes256CbcDec::new(derived.key().into(), derived.iv().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let original = "This is a test message with special characters: !@#$%^&*()";
        let encrypted = encrypt(original, "test_password_123");
        assert_ne!(encrypted, original);
        assert_eq!(decrypt(&encrypted, "test_password_123").unwrap(), original);
    }

    #[test]
    fn test_round_trip_unicode() {
        let original = "Пароль к серверу: ключ 🔑";
        let encrypted = encrypt(original, "pw");
        assert_eq!(decrypt(&encrypted, "pw").unwrap(), original);
    }

    #[test]
    fn test_empty_input_short_circuits() {
        assert_eq!(encrypt("", "test_password"), "");
        assert_eq!(decrypt("", "test_password").unwrap(), "");
    }

    #[test]
    fn test_same_text_different_passwords() {
        let a = encrypt("Same message", "password1");
        let b = encrypt("Same message", "password2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_ciphertext_is_deterministic() {
        assert_eq!(encrypt("repeat", "pw"), encrypt("repeat", "pw"));
    }

    #[test]
    fn test_output_is_whole_blocks() {
        let encrypted = encrypt("sixteen bytes!!!", "pw");
        let raw = BASE64.decode(encrypted).unwrap();
        // Full block of padding is appended when input is block aligned.
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn test_wrong_password_fails() {
        let encrypted = encrypt("Test message", "correct_password");
        let result = decrypt(&encrypted, "wrong_password");
        assert!(matches!(
            result,
            Err(CryptoError::Decrypt | CryptoError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_invalid_base64() {
        let result = decrypt("not base64 at all!", "pw");
        assert!(matches!(result, Err(CryptoError::InvalidEncoding(_))));
    }

    #[test]
    fn test_truncated_ciphertext() {
        let encrypted = encrypt("a longer message spanning blocks", "pw");
        let mut raw = BASE64.decode(encrypted).unwrap();
        raw.truncate(20);
        let result = decrypt(&BASE64.encode(raw), "pw");
        assert!(matches!(result, Err(CryptoError::InvalidLength(20))));
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let encrypted = format!("{}\n", encrypt("payload", "pw"));
        assert_eq!(decrypt(&encrypted, "pw").unwrap(), "payload");
    }
}
