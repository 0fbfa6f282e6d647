//! Account provisioning: validation, number allocation, card synthesis,
//! field encryption, and two-step persistence.
//!
//! # Lifecycle
//!
//! 1. Validate the five required applicant fields.
//! 2. Reject an email that already has an account.
//! 3. Allocate a free account number via [`AccountNumberAllocator`].
//! 4. Synthesize card number, CVV and expiry.
//! 5. Encrypt phone, date of birth, card number, CVV and expiry.
//! 6. Save the [`BankAccount`].
//! 7. Save the [`VirtualCard`] referencing it.
//!
//! Steps 6 and 7 are not atomic. When step 7 fails the account stays behind
//! without a card; the error carries its id and
//! [`ProvisioningWorkflow::orphaned_accounts`] lists every such account.

pub mod allocator;
pub mod card;

pub use allocator::{AccountNumberAllocator, AllocationError};

use std::sync::Arc;

use chrono::Utc;
use common::protocol::{CardDetails, CreateAccountRequest};
use common::ServiceError;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::crypto::{CipherError, FieldCipher, HexField};
use crate::store::{AccountStore, BankAccount, StoreError, VirtualCard};

/// Errors produced by [`ProvisioningWorkflow::create`].
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// One or more required fields were absent or blank.
    #[error("missing required fields: {}", .0.join(", "))]
    Validation(Vec<&'static str>),

    /// An account already exists for the submitted email.
    #[error("an account already exists for this email")]
    DuplicateEmail,

    /// No free account number was found within the attempt bound.
    #[error("no free account number after {0} attempts")]
    AllocationExhausted(u32),

    /// A sensitive field could not be encrypted. Nothing was written.
    #[error("failed to encrypt sensitive fields")]
    Encryption(#[source] CipherError),

    /// A storage call failed. `orphaned_account` is set when the account was
    /// written but its card was not.
    #[error("persistence failed: {source}")]
    Persistence {
        orphaned_account: Option<Uuid>,
        #[source]
        source: StoreError,
    },
}

impl ProvisionError {
    fn persistence(source: StoreError) -> Self {
        Self::Persistence {
            orphaned_account: None,
            source,
        }
    }
}

impl From<AllocationError> for ProvisionError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Exhausted(attempts) => Self::AllocationExhausted(attempts),
            AllocationError::Store(source) => Self::persistence(source),
        }
    }
}

impl From<ProvisionError> for ServiceError {
    fn from(err: ProvisionError) -> Self {
        match &err {
            ProvisionError::Validation(_) => ServiceError::BadRequest(err.to_string()),
            ProvisionError::DuplicateEmail => ServiceError::Conflict(err.to_string()),
            ProvisionError::AllocationExhausted(_) => ServiceError::Unavailable(err.to_string()),
            ProvisionError::Encryption(_) => ServiceError::EncryptionFailure(err.to_string()),
            ProvisionError::Persistence {
                source: StoreError::Conflict(_),
                ..
            } => ServiceError::Conflict(err.to_string()),
            ProvisionError::Persistence { .. } => ServiceError::Internal(err.to_string()),
        }
    }
}

/// Plaintext card details returned once, at creation time.
pub type CardMaterial = CardDetails;

/// Result of a successful [`ProvisioningWorkflow::create`].
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub account: BankAccount,
    pub card: CardMaterial,
}

/// Validated applicant input.
#[derive(Debug)]
struct Applicant {
    first_name: String,
    surname: String,
    email: String,
    phone_number: String,
    date_of_birth: String,
}

impl Applicant {
    fn validate(req: &CreateAccountRequest) -> Result<Self, ProvisionError> {
        let mut missing = Vec::new();
        let mut take = |value: &Option<String>, name: &'static str| match value {
            Some(v) if !v.trim().is_empty() => v.trim().to_owned(),
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let applicant = Self {
            first_name: take(&req.first_name, "firstName"),
            surname: take(&req.surname, "surname"),
            email: take(&req.email, "email"),
            phone_number: take(&req.phone_number, "phoneNumber"),
            date_of_birth: take(&req.date_of_birth, "dateOfBirth"),
        };

        if missing.is_empty() {
            Ok(applicant)
        } else {
            Err(ProvisionError::Validation(missing))
        }
    }
}

/// The five sensitive fields in persisted form.
struct SealedFields {
    phone: HexField,
    date_of_birth: HexField,
    card_number: HexField,
    cvv: HexField,
    expiry: HexField,
}

/// Orchestrates creation of a [`BankAccount`] and its [`VirtualCard`].
///
/// Cheap to clone; all fields are `Arc`-backed.
#[derive(Clone)]
pub struct ProvisioningWorkflow {
    store: Arc<dyn AccountStore>,
    cipher: Arc<FieldCipher>,
    allocator: AccountNumberAllocator,
}

impl ProvisioningWorkflow {
    /// Create a workflow over `store`, probing at most `max_attempts` account
    /// numbers per allocation.
    pub fn new(store: Arc<dyn AccountStore>, cipher: Arc<FieldCipher>, max_attempts: u32) -> Self {
        let allocator = AccountNumberAllocator::new(store.clone(), max_attempts);
        Self {
            store,
            cipher,
            allocator,
        }
    }

    /// Provision an account and its virtual card.
    ///
    /// # Errors
    ///
    /// See [`ProvisionError`]. Validation, duplicate-email, allocation and
    /// encryption failures happen before any write.
    pub async fn create(&self, req: &CreateAccountRequest) -> Result<Provisioned, ProvisionError> {
        let applicant = Applicant::validate(req)?;

        if self
            .store
            .find_by_email(&applicant.email)
            .await
            .map_err(ProvisionError::persistence)?
            .is_some()
        {
            info!("rejected account creation: email already registered");
            return Err(ProvisionError::DuplicateEmail);
        }

        let account_number = self.allocator.allocate().await?;

        let created_at = Utc::now();
        let card = card::synthesize(created_at);
        let sealed = self.seal(&applicant, &card).map_err(|e| {
            error!(error = %e, "field encryption failed");
            ProvisionError::Encryption(e)
        })?;

        let account = BankAccount {
            id: Uuid::new_v4(),
            first_name: applicant.first_name,
            surname: applicant.surname,
            email: applicant.email,
            account_number,
            phone: sealed.phone,
            date_of_birth: sealed.date_of_birth,
            created_at,
        };
        if let Err(source) = self.store.save_account(&account).await {
            warn!(
                error = %source,
                account_number = %account.account_number,
                "bank account save failed"
            );
            return Err(ProvisionError::persistence(source));
        }
        info!(
            account_id = %account.id,
            account_number = %account.account_number,
            "bank account saved"
        );

        let virtual_card = VirtualCard {
            id: Uuid::new_v4(),
            account_id: account.id,
            card_number: sealed.card_number,
            cvv: sealed.cvv,
            expiry: sealed.expiry,
            created_at: Utc::now(),
        };
        if let Err(source) = self.store.save_card(&virtual_card).await {
            warn!(
                error = %source,
                account_id = %account.id,
                "virtual card save failed; account left without a card"
            );
            return Err(ProvisionError::Persistence {
                orphaned_account: Some(account.id),
                source,
            });
        }
        info!(
            account_id = %account.id,
            card_id = %virtual_card.id,
            "virtual card saved"
        );

        Ok(Provisioned { account, card })
    }

    /// Accounts that have no virtual card: the residue of failed step-7 writes.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub async fn orphaned_accounts(&self) -> Result<Vec<BankAccount>, StoreError> {
        let mut orphans = Vec::new();
        for account in self.store.list_accounts().await? {
            if self
                .store
                .find_card_by_account_id(account.id)
                .await?
                .is_none()
            {
                orphans.push(account);
            }
        }
        if !orphans.is_empty() {
            warn!(count = orphans.len(), "accounts without a virtual card");
        }
        Ok(orphans)
    }

    fn seal(&self, applicant: &Applicant, card: &CardMaterial) -> Result<SealedFields, CipherError> {
        let seal = |plaintext: &str| self.cipher.encrypt(plaintext).map(|f| f.to_hex());
        Ok(SealedFields {
            phone: seal(&applicant.phone_number)?,
            date_of_birth: seal(&applicant.date_of_birth)?,
            card_number: seal(&card.card_number)?,
            cvv: seal(&card.cvv)?,
            expiry: seal(&card.expiry_date)?,
        })
    }
}
