//! Decrypted read path over stored accounts and their cards.
//!
//! [`RetrievalProjection::list_decrypted`] snapshots the account table once
//! and decrypts lazily, one account per [`AccountViews::next`] call. A failure
//! on one account yields an [`AccountFailure`] marker for that account and
//! iteration carries on.

pub mod decrypt;

use std::sync::Arc;

use common::protocol::{
    AccountFailure, AccountListEntry, AccountView, CardDetails, DecryptRequest,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::crypto::{CipherError, FieldCipher, HexField};
use crate::store::{AccountStore, BankAccount, StoreError, VirtualCard};

/// Why a single account could not be projected.
#[derive(Debug, Error)]
enum ProjectionError {
    #[error("failed to decrypt {field}: {source}")]
    Decryption {
        field: &'static str,
        #[source]
        source: CipherError,
    },

    #[error("card lookup failed: {0}")]
    CardLookup(#[from] StoreError),
}

/// Produces decrypted [`AccountView`]s.
#[derive(Clone)]
pub struct RetrievalProjection {
    store: Arc<dyn AccountStore>,
    cipher: Arc<FieldCipher>,
}

impl RetrievalProjection {
    pub fn new(store: Arc<dyn AccountStore>, cipher: Arc<FieldCipher>) -> Self {
        Self { store, cipher }
    }

    /// Snapshot every stored account for decryption.
    ///
    /// # Errors
    ///
    /// Fails only if the account listing itself fails; per-account failures
    /// surface as [`AccountListEntry::Failed`] entries.
    pub async fn list_decrypted(&self) -> Result<AccountViews, StoreError> {
        let accounts = self.store.list_accounts().await?;
        info!(count = accounts.len(), "listing accounts");
        Ok(AccountViews {
            pending: accounts.into_iter(),
            store: self.store.clone(),
            cipher: self.cipher.clone(),
        })
    }
}

/// Finite, single-pass sequence of decrypted account entries.
pub struct AccountViews {
    pending: std::vec::IntoIter<BankAccount>,
    store: Arc<dyn AccountStore>,
    cipher: Arc<FieldCipher>,
}

impl AccountViews {
    /// Number of entries not yet produced.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.len() == 0
    }

    /// Decrypt and return the next account, or `None` once exhausted.
    pub async fn next(&mut self) -> Option<AccountListEntry> {
        let account = self.pending.next()?;
        let entry = match self.project(&account).await {
            Ok(view) => AccountListEntry::View(view),
            Err(e) => {
                match &e {
                    ProjectionError::Decryption { source, .. } if source.is_tampering() => {
                        error!(account_id = %account.id, error = %e, "stored account failed authentication");
                    }
                    _ => warn!(account_id = %account.id, error = %e, "failed to project account"),
                }
                AccountListEntry::Failed(AccountFailure {
                    id: account.id.to_string(),
                    error: format!("failed to process account with id {}", account.id),
                })
            }
        };
        Some(entry)
    }

    /// Drain the remaining entries.
    pub async fn collect_all(mut self) -> Vec<AccountListEntry> {
        let mut entries = Vec::with_capacity(self.len());
        while let Some(entry) = self.next().await {
            entries.push(entry);
        }
        entries
    }

    async fn project(&self, account: &BankAccount) -> Result<AccountView, ProjectionError> {
        let phone_number = self.open(&account.phone, "phone")?;
        let date_of_birth = self.open(&account.date_of_birth, "dateOfBirth")?;

        let card = self.store.find_card_by_account_id(account.id).await?;
        let virtual_card = match &card {
            Some(card) => Some(CardDetails {
                card_number: self.open(&card.card_number, "cardNumber")?,
                cvv: self.open(&card.cvv, "cvv")?,
                expiry_date: self.open(&card.expiry, "expiry")?,
            }),
            None => {
                debug!(account_id = %account.id, "account has no virtual card");
                None
            }
        };

        Ok(AccountView {
            id: account.id.to_string(),
            full_name: account.full_name(),
            email: account.email.clone(),
            account_number: account.account_number.clone(),
            phone_number,
            date_of_birth,
            virtual_card,
            encrypted: encrypted_pairs(account, card.as_ref()),
        })
    }

    fn open(&self, field: &HexField, name: &'static str) -> Result<String, ProjectionError> {
        self.cipher
            .decrypt_hex(field)
            .map_err(|source| ProjectionError::Decryption {
                field: name,
                source,
            })
    }
}

/// Stored ciphertexts in the `POST /api/decrypt` request shape. Card pairs
/// stay `None` when the account has no card.
fn encrypted_pairs(account: &BankAccount, card: Option<&VirtualCard>) -> DecryptRequest {
    let split = |field: &HexField| (Some(field.ciphertext.clone()), Some(field.nonce.clone()));
    let (phone_encrypted, phone_iv) = split(&account.phone);
    let (dob_encrypted, dob_iv) = split(&account.date_of_birth);
    let (card_number_encrypted, card_iv) = card.map(|c| split(&c.card_number)).unwrap_or_default();
    let (cvv_encrypted, cvv_iv) = card.map(|c| split(&c.cvv)).unwrap_or_default();
    let (expiry_encrypted, expiry_iv) = card.map(|c| split(&c.expiry)).unwrap_or_default();

    DecryptRequest {
        card_number_encrypted,
        card_iv,
        cvv_encrypted,
        cvv_iv,
        expiry_encrypted,
        expiry_iv,
        phone_encrypted,
        phone_iv,
        dob_encrypted,
        dob_iv,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::protocol::CreateAccountRequest;
    use uuid::Uuid;

    use super::*;
    use crate::crypto::cipher::KEY_LEN;
    use crate::crypto::FieldKey;
    use crate::provision::ProvisioningWorkflow;
    use super::decrypt::decrypt_fields;
    use crate::store::{MemoryStore, MockAccountStore};

    fn cipher() -> Arc<FieldCipher> {
        Arc::new(FieldCipher::new(
            &FieldKey::from_bytes(&[0x07u8; KEY_LEN]).unwrap(),
        ))
    }

    fn sealed_account(cipher: &FieldCipher, email: &str, account_number: &str) -> BankAccount {
        BankAccount {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            surname: "Lovelace".into(),
            email: email.into(),
            account_number: account_number.into(),
            phone: cipher.encrypt("+15551234567").unwrap().to_hex(),
            date_of_birth: cipher.encrypt("1990-01-01").unwrap().to_hex(),
            created_at: Utc::now(),
        }
    }

    fn request(email: &str) -> CreateAccountRequest {
        CreateAccountRequest {
            first_name: Some("Ada".into()),
            surname: Some("Lovelace".into()),
            email: Some(email.into()),
            phone_number: Some("+15551234567".into()),
            date_of_birth: Some("1990-01-01".into()),
        }
    }

    #[tokio::test]
    async fn empty_store_yields_nothing() {
        let projection = RetrievalProjection::new(Arc::new(MemoryStore::new()), cipher());
        let mut views = projection.list_decrypted().await.unwrap();
        assert!(views.is_empty());
        assert!(views.next().await.is_none());
    }

    #[tokio::test]
    async fn account_without_card_has_no_card_section() {
        let store = MemoryStore::new();
        let cipher = cipher();
        store
            .save_account(&sealed_account(&cipher, "ada@x.com", "1234567890"))
            .await
            .unwrap();

        let projection = RetrievalProjection::new(Arc::new(store), cipher);
        let entries = projection.list_decrypted().await.unwrap().collect_all().await;

        assert_eq!(entries.len(), 1);
        match &entries[0] {
            AccountListEntry::View(view) => {
                assert!(view.virtual_card.is_none());
                assert!(view.encrypted.card_number_encrypted.is_none());
                assert!(view.encrypted.expiry_iv.is_none());
                assert!(view.encrypted.dob_encrypted.is_some());
                assert_eq!(view.phone_number, "+15551234567");
                assert_eq!(view.date_of_birth, "1990-01-01");
                assert_eq!(view.full_name, "Ada Lovelace");
            }
            AccountListEntry::Failed(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[tokio::test]
    async fn provisioned_accounts_round_trip() {
        let store: Arc<dyn AccountStore> = Arc::new(MemoryStore::new());
        let cipher = cipher();
        let workflow = ProvisioningWorkflow::new(store.clone(), cipher.clone(), 100);
        let created = workflow.create(&request("ada@x.com")).await.unwrap();

        let projection = RetrievalProjection::new(store, cipher);
        let entries = projection.list_decrypted().await.unwrap().collect_all().await;

        let AccountListEntry::View(view) = &entries[0] else {
            panic!("expected a decrypted view");
        };
        assert_eq!(view.account_number, created.account.account_number);
        assert_eq!(view.virtual_card.as_ref(), Some(&created.card));
    }

    #[tokio::test]
    async fn listed_ciphertexts_decrypt_through_the_decrypt_path() {
        let store: Arc<dyn AccountStore> = Arc::new(MemoryStore::new());
        let cipher = cipher();
        let workflow = ProvisioningWorkflow::new(store.clone(), cipher.clone(), 100);
        let created = workflow.create(&request("ada@x.com")).await.unwrap();

        let projection = RetrievalProjection::new(store, cipher.clone());
        let entries = projection.list_decrypted().await.unwrap().collect_all().await;
        let AccountListEntry::View(view) = &entries[0] else {
            panic!("expected a decrypted view");
        };

        assert_eq!(
            view.encrypted.phone_encrypted.as_ref(),
            Some(&created.account.phone.ciphertext)
        );
        let decrypted = decrypt_fields(&cipher, &view.encrypted).unwrap();
        assert_eq!(decrypted.phone_number.as_deref(), Some("+15551234567"));
        assert_eq!(decrypted.date_of_birth.as_deref(), Some("1990-01-01"));
        assert_eq!(decrypted.card_number, Some(created.card.card_number.clone()));
        assert_eq!(decrypted.cvv, Some(created.card.cvv.clone()));
        assert_eq!(decrypted.expiry_date, Some(created.card.expiry_date.clone()));
    }

    #[tokio::test]
    async fn corrupt_record_does_not_hide_the_rest() {
        let store = MemoryStore::new();
        let cipher = cipher();

        let good = sealed_account(&cipher, "a@x.com", "1000000001");
        let mut corrupt = sealed_account(&cipher, "b@x.com", "1000000002");
        // Flip the last tag nibble.
        let last = corrupt.phone.ciphertext.pop().unwrap();
        corrupt
            .phone
            .ciphertext
            .push(if last == '0' { '1' } else { '0' });
        let also_good = sealed_account(&cipher, "c@x.com", "1000000003");

        for account in [&good, &corrupt, &also_good] {
            store.save_account(account).await.unwrap();
        }

        let projection = RetrievalProjection::new(Arc::new(store), cipher);
        let mut views = projection.list_decrypted().await.unwrap();
        assert_eq!(views.len(), 3);

        assert!(matches!(views.next().await, Some(AccountListEntry::View(_))));
        match views.next().await {
            Some(AccountListEntry::Failed(f)) => {
                assert_eq!(f.id, corrupt.id.to_string());
                assert!(f.error.contains(&corrupt.id.to_string()));
            }
            other => panic!("expected failure marker, got {other:?}"),
        }
        assert_eq!(views.len(), 1);
        assert!(matches!(views.next().await, Some(AccountListEntry::View(_))));
        assert!(views.next().await.is_none());
    }

    #[tokio::test]
    async fn corrupt_card_marks_its_account() {
        let store = MemoryStore::new();
        let cipher = cipher();
        let account = sealed_account(&cipher, "ada@x.com", "1234567890");
        store.save_account(&account).await.unwrap();
        store
            .save_card(&VirtualCard {
                id: Uuid::new_v4(),
                account_id: account.id,
                card_number: HexField {
                    ciphertext: "00".repeat(8),
                    nonce: "00".repeat(12),
                },
                cvv: cipher.encrypt("123").unwrap().to_hex(),
                expiry: cipher.encrypt("10/29").unwrap().to_hex(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let projection = RetrievalProjection::new(Arc::new(store), cipher);
        let entries = projection.list_decrypted().await.unwrap().collect_all().await;
        assert!(matches!(&entries[0], AccountListEntry::Failed(f) if f.id == account.id.to_string()));
    }

    #[tokio::test]
    async fn wrong_key_marks_every_account() {
        let store = MemoryStore::new();
        let writer = cipher();
        for (email, n) in [("a@x.com", "1000000001"), ("b@x.com", "1000000002")] {
            store
                .save_account(&sealed_account(&writer, email, n))
                .await
                .unwrap();
        }

        let reader = Arc::new(FieldCipher::new(
            &FieldKey::from_bytes(&[0x08u8; KEY_LEN]).unwrap(),
        ));
        let projection = RetrievalProjection::new(Arc::new(store), reader);
        let entries = projection.list_decrypted().await.unwrap().collect_all().await;
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| matches!(e, AccountListEntry::Failed(_))));
    }

    #[tokio::test]
    async fn card_lookup_failure_is_isolated() {
        let cipher = cipher();
        let account = sealed_account(&cipher, "ada@x.com", "1234567890");
        let listed = account.clone();

        let mut store = MockAccountStore::new();
        store
            .expect_list_accounts()
            .times(1)
            .returning(move || Ok(vec![listed.clone()]));
        store
            .expect_find_card_by_account_id()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("timeout".into())));

        let projection = RetrievalProjection::new(Arc::new(store), cipher);
        let entries = projection.list_decrypted().await.unwrap().collect_all().await;
        assert!(matches!(&entries[0], AccountListEntry::Failed(f) if f.id == account.id.to_string()));
    }

    #[tokio::test]
    async fn listing_failure_propagates() {
        let mut store = MockAccountStore::new();
        store
            .expect_list_accounts()
            .returning(|| Err(StoreError::Unavailable("down".into())));
        let projection = RetrievalProjection::new(Arc::new(store), cipher());
        assert!(projection.list_decrypted().await.is_err());
    }

    #[tokio::test]
    async fn snapshot_ignores_later_inserts() {
        let store = MemoryStore::new();
        let cipher = cipher();
        store
            .save_account(&sealed_account(&cipher, "a@x.com", "1000000001"))
            .await
            .unwrap();

        let projection = RetrievalProjection::new(Arc::new(store.clone()), cipher.clone());
        let views = projection.list_decrypted().await.unwrap();
        store
            .save_account(&sealed_account(&cipher, "b@x.com", "1000000002"))
            .await
            .unwrap();

        assert_eq!(views.collect_all().await.len(), 1);
    }
}
