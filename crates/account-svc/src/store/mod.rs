//! Storage contract for bank accounts and virtual cards.
//!
//! # Module invariants
//!
//! - Implementations must enforce uniqueness of `email` and `account_number`
//!   at write time and report violations as [`StoreError::Conflict`]. The
//!   provisioning workflow's prechecks are advisory; this constraint is the
//!   real guard against concurrent allocations.
//! - A card is only ever looked up by its owning account id.

pub mod memory;
pub mod record;

pub use memory::MemoryStore;
pub use record::{BankAccount, VirtualCard};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by a storage backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("unique constraint violated on {0}")]
    Conflict(&'static str),

    /// The backend could not complete the call.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations consumed by provisioning and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by its 10-digit account number.
    async fn find_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<BankAccount>, StoreError>;

    /// Look up an account by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<BankAccount>, StoreError>;

    /// Insert a new account.
    async fn save_account(&self, account: &BankAccount) -> Result<(), StoreError>;

    /// Insert a new virtual card.
    async fn save_card(&self, card: &VirtualCard) -> Result<(), StoreError>;

    /// Reverse lookup of the card owned by `account_id`.
    async fn find_card_by_account_id(
        &self,
        account_id: Uuid,
    ) -> Result<Option<VirtualCard>, StoreError>;

    /// Snapshot of every stored account, in insertion order.
    async fn list_accounts(&self) -> Result<Vec<BankAccount>, StoreError>;
}
