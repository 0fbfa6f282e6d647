//! AES-256-GCM encryption and decryption of individual string fields.
//!
//! Every call to [`FieldCipher::encrypt`] draws a fresh 96-bit nonce from the
//! OS CSPRNG, so the same plaintext encrypts to different ciphertexts. Callers
//! must never supply or persist-and-reuse their own nonces: GCM nonce reuse
//! breaks both confidentiality and authentication.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key::FieldKey;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The nonce is not exactly [`NONCE_LEN`] bytes.
    #[error("invalid nonce: expected {NONCE_LEN} bytes, got {0}")]
    InvalidNonce(usize),

    /// The ciphertext is too short to contain an authentication tag.
    #[error("ciphertext too short: expected at least {TAG_LEN} bytes, got {0}")]
    CiphertextTooShort(usize),

    /// The tag did not verify: tampered data, corrupted data, or the wrong key.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// AES-GCM encryption failed (should be unreachable with a valid key).
    #[error("aead encryption failed")]
    EncryptionFailed,

    /// A persisted hex value could not be decoded.
    #[error("invalid hex encoding in {0}")]
    InvalidEncoding(&'static str),

    /// Decryption succeeded but the plaintext is not UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

impl CipherError {
    /// `true` when the failure indicates tampering rather than a format problem.
    pub fn is_tampering(&self) -> bool {
        matches!(self, CipherError::AuthenticationFailed)
    }
}

/// Ciphertext-with-tag plus the nonce it was produced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedField {
    /// Encode to the persisted lowercase-hex representation.
    pub fn to_hex(&self) -> HexField {
        HexField {
            ciphertext: hex::encode(&self.ciphertext),
            nonce: hex::encode(self.nonce),
        }
    }
}

/// Persisted form of an [`EncryptedField`].
///
/// `nonce` is 24 lowercase hex characters; `ciphertext` is the hex encoding of
/// `aead-ciphertext || 16-byte tag` (at least 32 characters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexField {
    pub ciphertext: String,
    pub nonce: String,
}

/// AES-256-GCM cipher bound to a single [`FieldKey`].
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Build a cipher from a validated key.
    pub fn new(key: &FieldKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a UTF-8 string under a freshly generated nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::EncryptionFailed`] on an internal AEAD error.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedField, CipherError> {
        use aes_gcm::aead::rand_core::RngCore;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        Ok(EncryptedField {
            nonce: nonce_bytes,
            ciphertext,
        })
    }

    /// Decrypt `ciphertext || tag` under `nonce` back to a string.
    ///
    /// # Errors
    ///
    /// - [`CipherError::InvalidNonce`] if `nonce` is not [`NONCE_LEN`] bytes.
    /// - [`CipherError::CiphertextTooShort`] if `ciphertext` cannot hold a tag.
    /// - [`CipherError::AuthenticationFailed`] if the tag does not verify.
    /// - [`CipherError::InvalidUtf8`] if the recovered bytes are not UTF-8.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<String, CipherError> {
        if nonce.len() != NONCE_LEN {
            return Err(CipherError::InvalidNonce(nonce.len()));
        }
        if ciphertext.len() < TAG_LEN {
            return Err(CipherError::CiphertextTooShort(ciphertext.len()));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }

    /// Decode and decrypt a persisted [`HexField`].
    pub fn decrypt_hex(&self, field: &HexField) -> Result<String, CipherError> {
        let nonce = hex::decode(&field.nonce).map_err(|_| CipherError::InvalidEncoding("nonce"))?;
        let ciphertext = hex::decode(&field.ciphertext)
            .map_err(|_| CipherError::InvalidEncoding("ciphertext"))?;
        self.decrypt(&ciphertext, &nonce)
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldCipher([REDACTED])")
    }
}
