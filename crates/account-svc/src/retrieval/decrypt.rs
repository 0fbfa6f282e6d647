//! Ad-hoc decryption of caller-supplied `(xxxEncrypted, xxxIV)` pairs.

use common::protocol::{DecryptRequest, DecryptedFields};
use common::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

use crate::crypto::{CipherError, FieldCipher, HexField};

/// Errors produced by [`decrypt_fields`].
#[derive(Debug, Error)]
pub enum DecryptError {
    /// Only one half of a ciphertext/nonce pair was supplied.
    #[error("{0} requires both the encrypted value and its IV")]
    IncompletePair(&'static str),

    #[error("failed to decrypt {field}: {source}")]
    Cipher {
        field: &'static str,
        #[source]
        source: CipherError,
    },
}

impl From<DecryptError> for ServiceError {
    fn from(err: DecryptError) -> Self {
        match &err {
            DecryptError::Cipher { source, .. } if source.is_tampering() => {
                ServiceError::Integrity(err.to_string())
            }
            _ => ServiceError::BadRequest(err.to_string()),
        }
    }
}

/// Decrypt every pair present in `req`. Pairs omitted entirely, or sent as
/// blank strings, stay `None`.
///
/// # Errors
///
/// Returns the first [`DecryptError`]; nothing is partially returned.
pub fn decrypt_fields(
    cipher: &FieldCipher,
    req: &DecryptRequest,
) -> Result<DecryptedFields, DecryptError> {
    let open = |field: &'static str,
                ciphertext: &Option<String>,
                nonce: &Option<String>|
     -> Result<Option<String>, DecryptError> {
        let pair = match (present(ciphertext), present(nonce)) {
            (None, None) => return Ok(None),
            (Some(c), Some(n)) => HexField {
                ciphertext: c.to_owned(),
                nonce: n.to_owned(),
            },
            _ => {
                warn!(field, "incomplete encrypted pair");
                return Err(DecryptError::IncompletePair(field));
            }
        };
        cipher.decrypt_hex(&pair).map(Some).map_err(|source| {
            if source.is_tampering() {
                error!(field, "submitted ciphertext failed authentication");
            } else {
                warn!(field, error = %source, "malformed encrypted field");
            }
            DecryptError::Cipher { field, source }
        })
    };

    Ok(DecryptedFields {
        card_number: open("cardNumber", &req.card_number_encrypted, &req.card_iv)?,
        cvv: open("cvv", &req.cvv_encrypted, &req.cvv_iv)?,
        expiry_date: open("expiry", &req.expiry_encrypted, &req.expiry_iv)?,
        phone_number: open("phone", &req.phone_encrypted, &req.phone_iv)?,
        date_of_birth: open("dob", &req.dob_encrypted, &req.dob_iv)?,
    })
}

/// A blank half counts as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
