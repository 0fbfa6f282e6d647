//! Request and response types exchanged over the public HTTP API.
//!
//! Field names are camelCase on the wire. Encrypted values travel as lowercase
//! hex strings; the service never returns raw key material.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Account creation
// ---------------------------------------------------------------------------

/// Request body for `POST /api/createBankAccount`.
///
/// Every field is optional at the wire level so that missing fields can be
/// reported together as a single validation error instead of a JSON parse
/// failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAccountRequest {
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<String>,
}

/// Plaintext virtual-card details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    /// 16 decimal digits.
    pub card_number: String,
    /// 3 decimal digits.
    pub cvv: String,
    /// `MM/YY`.
    pub expiry_date: String,
}

/// Non-sensitive projection of a stored bank account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub account_number: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

/// Successful response body for `POST /api/createBankAccount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    pub message: String,
    pub account: AccountSummary,
    pub virtual_card: CardDetails,
}

// ---------------------------------------------------------------------------
// Account listing
// ---------------------------------------------------------------------------

/// Decrypted view of one account and, when present, its virtual card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub account_number: String,
    pub phone_number: String,
    pub date_of_birth: String,
    /// `null` when the account has no card record.
    pub virtual_card: Option<CardDetails>,
    /// Stored ciphertext pairs, shaped so they can be posted to
    /// `/api/decrypt` unchanged. Card pairs are `null` without a card.
    pub encrypted: DecryptRequest,
}

/// Marker emitted in place of an account that could not be decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountFailure {
    /// Record id of the failing account.
    pub id: String,
    pub error: String,
}

/// One element of the `GET /api/accounts` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountListEntry {
    View(AccountView),
    Failed(AccountFailure),
}

// ---------------------------------------------------------------------------
// Decrypt endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /api/decrypt`.
///
/// Each sensitive field is a `(xxxEncrypted, xxxIV)` pair of hex strings. A
/// pair may be omitted entirely; supplying only one half is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptRequest {
    #[serde(rename = "cardNumberEncrypted")]
    pub card_number_encrypted: Option<String>,
    #[serde(rename = "cardIV")]
    pub card_iv: Option<String>,
    #[serde(rename = "cvvEncrypted")]
    pub cvv_encrypted: Option<String>,
    #[serde(rename = "cvvIV")]
    pub cvv_iv: Option<String>,
    #[serde(rename = "expiryEncrypted")]
    pub expiry_encrypted: Option<String>,
    #[serde(rename = "expiryIV")]
    pub expiry_iv: Option<String>,
    #[serde(rename = "phoneEncrypted")]
    pub phone_encrypted: Option<String>,
    #[serde(rename = "phoneIV")]
    pub phone_iv: Option<String>,
    #[serde(rename = "dobEncrypted")]
    pub dob_encrypted: Option<String>,
    #[serde(rename = "dobIV")]
    pub dob_iv: Option<String>,
}

/// Plaintext values recovered by `POST /api/decrypt`; absent pairs stay `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedFields {
    pub card_number: Option<String>,
    pub cvv: Option<String>,
    pub expiry_date: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<String>,
}

/// Successful response body for `POST /api/decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub success: bool,
    pub decrypted: DecryptedFields,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Number of bank accounts currently stored.
    pub accounts_stored: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_tolerates_missing_fields() {
        let req: CreateAccountRequest =
            serde_json::from_value(json!({"surname": "Lovelace", "email": "ada@x.com"})).unwrap();
        assert!(req.first_name.is_none());
        assert_eq!(req.surname.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn decrypt_request_uses_legacy_field_names() {
        let req: DecryptRequest = serde_json::from_value(json!({
            "phoneEncrypted": "ab",
            "phoneIV": "cd",
        }))
        .unwrap();
        assert_eq!(req.phone_encrypted.as_deref(), Some("ab"));
        assert_eq!(req.phone_iv.as_deref(), Some("cd"));
        assert!(req.card_iv.is_none());
    }

    #[test]
    fn list_entry_is_untagged() {
        let failed = AccountListEntry::Failed(AccountFailure {
            id: "42".into(),
            error: "failed to process account with id 42".into(),
        });
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["id"], "42");
        assert!(v.get("Failed").is_none());
    }

    #[test]
    fn missing_card_serialises_as_null() {
        let view = AccountView {
            id: "1".into(),
            full_name: "Ada Lovelace".into(),
            email: "ada@x.com".into(),
            account_number: "1234567890".into(),
            phone_number: "+15551234567".into(),
            date_of_birth: "1990-01-01".into(),
            virtual_card: None,
            encrypted: DecryptRequest {
                phone_encrypted: Some("ab".into()),
                phone_iv: Some("cd".into()),
                ..DecryptRequest::default()
            },
        };
        let v = serde_json::to_value(&view).unwrap();
        assert!(v["virtualCard"].is_null());
        assert_eq!(v["encrypted"]["phoneIV"], "cd");
        assert!(v["encrypted"]["cardIV"].is_null());
        assert_eq!(v["accountNumber"], "1234567890");
    }

    #[test]
    fn error_response_from_service_error() {
        let e = ErrorResponse::from(&crate::ServiceError::Conflict("email taken".into()));
        assert_eq!(e.code, "conflict");
        assert!(e.message.contains("email taken"));
    }
}
