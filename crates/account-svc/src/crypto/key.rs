//! [`FieldKey`]: the process-wide AES-256 key, decoded once at startup.

use thiserror::Error;

use super::cipher::KEY_LEN;

/// Errors produced while decoding the configured key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The configured value is not valid hexadecimal.
    #[error("ENCRYPTION_KEY is not valid hex")]
    InvalidHex,

    /// The decoded key material has an unexpected length.
    #[error("ENCRYPTION_KEY must decode to {KEY_LEN} bytes (64 hex chars), got {0} bytes")]
    InvalidLength(usize),
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
pub struct FieldKey(Box<[u8; KEY_LEN]>);

impl FieldKey {
    /// Decode a 64-character hex string into a key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidHex`] on malformed hex and
    /// [`KeyError::InvalidLength`] when the decoded value is not [`KEY_LEN`] bytes.
    pub fn from_hex(value: &str) -> Result<Self, KeyError> {
        let mut bytes = hex::decode(value.trim()).map_err(|_| KeyError::InvalidHex)?;
        let key = Self::from_bytes(&bytes);
        bytes.iter_mut().for_each(|b| *b = 0);
        key
    }

    /// Copy raw key bytes into a new key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice has the wrong length.
    pub fn from_bytes(key_bytes: &[u8]) -> Result<Self, KeyError> {
        if key_bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(key_bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(key_bytes);
        Ok(Self(buf))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for FieldKey {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("FieldKey([REDACTED])")
    }
}
