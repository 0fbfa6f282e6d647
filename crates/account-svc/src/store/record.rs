//! Persisted record shapes.
//!
//! Records serialise to the flat document layout already present in stored
//! collections: each encrypted field is a `xxxEncrypted` / `xxxIV` pair of
//! lowercase hex strings rather than a nested object.

use chrono::{DateTime, Utc};
use common::protocol::AccountSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::HexField;

/// A stored bank account. Phone number and date of birth are only ever held
/// in encrypted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BankAccountDocument", into = "BankAccountDocument")]
pub struct BankAccount {
    pub id: Uuid,
    pub first_name: String,
    pub surname: String,
    /// Unique across all accounts.
    pub email: String,
    /// 10 ASCII digits, unique across all accounts.
    pub account_number: String,
    pub phone: HexField,
    pub date_of_birth: HexField,
    pub created_at: DateTime<Utc>,
}

impl BankAccount {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id.to_string(),
            first_name: self.first_name.clone(),
            surname: self.surname.clone(),
            email: self.email.clone(),
            account_number: self.account_number.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

/// A stored virtual card, linked to its account by `account_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VirtualCardDocument", into = "VirtualCardDocument")]
pub struct VirtualCard {
    pub id: Uuid,
    pub account_id: Uuid,
    pub card_number: HexField,
    pub cvv: HexField,
    pub expiry: HexField,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankAccountDocument {
    id: Uuid,
    first_name: String,
    surname: String,
    email: String,
    account_number: String,
    phone_encrypted: String,
    #[serde(rename = "phoneIV")]
    phone_iv: String,
    dob_encrypted: String,
    #[serde(rename = "dobIV")]
    dob_iv: String,
    created_at: DateTime<Utc>,
}

impl From<BankAccount> for BankAccountDocument {
    fn from(a: BankAccount) -> Self {
        Self {
            id: a.id,
            first_name: a.first_name,
            surname: a.surname,
            email: a.email,
            account_number: a.account_number,
            phone_encrypted: a.phone.ciphertext,
            phone_iv: a.phone.nonce,
            dob_encrypted: a.date_of_birth.ciphertext,
            dob_iv: a.date_of_birth.nonce,
            created_at: a.created_at,
        }
    }
}

impl From<BankAccountDocument> for BankAccount {
    fn from(d: BankAccountDocument) -> Self {
        Self {
            id: d.id,
            first_name: d.first_name,
            surname: d.surname,
            email: d.email,
            account_number: d.account_number,
            phone: HexField {
                ciphertext: d.phone_encrypted,
                nonce: d.phone_iv,
            },
            date_of_birth: HexField {
                ciphertext: d.dob_encrypted,
                nonce: d.dob_iv,
            },
            created_at: d.created_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VirtualCardDocument {
    id: Uuid,
    account_id: Uuid,
    card_number_encrypted: String,
    #[serde(rename = "cardIV")]
    card_iv: String,
    cvv_encrypted: String,
    #[serde(rename = "cvvIV")]
    cvv_iv: String,
    expiry_encrypted: String,
    #[serde(rename = "expiryIV")]
    expiry_iv: String,
    created_at: DateTime<Utc>,
}

impl From<VirtualCard> for VirtualCardDocument {
    fn from(c: VirtualCard) -> Self {
        Self {
            id: c.id,
            account_id: c.account_id,
            card_number_encrypted: c.card_number.ciphertext,
            card_iv: c.card_number.nonce,
            cvv_encrypted: c.cvv.ciphertext,
            cvv_iv: c.cvv.nonce,
            expiry_encrypted: c.expiry.ciphertext,
            expiry_iv: c.expiry.nonce,
            created_at: c.created_at,
        }
    }
}

impl From<VirtualCardDocument> for VirtualCard {
    fn from(d: VirtualCardDocument) -> Self {
        let pair = |ciphertext, nonce| HexField { ciphertext, nonce };
        Self {
            id: d.id,
            account_id: d.account_id,
            card_number: pair(d.card_number_encrypted, d.card_iv),
            cvv: pair(d.cvv_encrypted, d.cvv_iv),
            expiry: pair(d.expiry_encrypted, d.expiry_iv),
            created_at: d.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn field(tag: &str) -> HexField {
        HexField {
            ciphertext: format!("{tag}{}", "00".repeat(16)),
            nonce: "11".repeat(12),
        }
    }

    #[test]
    fn account_serialises_to_flat_pairs() {
        let account = BankAccount {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            surname: "Lovelace".into(),
            email: "ada@x.com".into(),
            account_number: "1234567890".into(),
            phone: field("aa"),
            date_of_birth: field("bb"),
            created_at: Utc::now(),
        };
        let v = serde_json::to_value(&account).unwrap();

        assert_eq!(v["phoneEncrypted"], Value::from(account.phone.ciphertext.clone()));
        assert_eq!(v["phoneIV"], Value::from(account.phone.nonce.clone()));
        assert!(v["dobEncrypted"].as_str().unwrap().starts_with("bb"));
        assert_eq!(v["accountNumber"], "1234567890");
        assert!(v.get("phone").is_none());
        assert_eq!(serde_json::from_value::<BankAccount>(v).unwrap(), account);
    }

    #[test]
    fn card_reads_flat_document() {
        let account_id = Uuid::new_v4();
        let doc = json!({
            "id": Uuid::new_v4(),
            "accountId": account_id,
            "cardNumberEncrypted": "aa",
            "cardIV": "01",
            "cvvEncrypted": "bb",
            "cvvIV": "02",
            "expiryEncrypted": "cc",
            "expiryIV": "03",
            "createdAt": "2024-05-01T12:00:00Z",
        });
        let card: VirtualCard = serde_json::from_value(doc).unwrap();

        assert_eq!(card.account_id, account_id);
        assert_eq!(card.cvv.ciphertext, "bb");
        assert_eq!(card.expiry.nonce, "03");
    }
}
