//! [`MemoryStore`]: thread-safe in-process implementation of [`AccountStore`].

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, BankAccount, StoreError, VirtualCard};

#[derive(Debug, Default)]
struct Tables {
    accounts: Vec<BankAccount>,
    /// Unique index: email → position in `accounts`.
    by_email: HashMap<String, usize>,
    /// Unique index: account number → position in `accounts`.
    by_account_number: HashMap<String, usize>,
    cards: Vec<VirtualCard>,
}

/// In-memory account and card tables with unique indexes on `email` and
/// `account_number`.
///
/// Wraps an `Arc<RwLock<_>>` so that every clone shares the same tables. Both
/// unique indexes are checked and updated under a single write lock, making
/// [`AccountStore::save_account`] the serialisation point for racing
/// provisioning workflows.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create a new, empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cards.
    #[cfg(test)]
    pub async fn card_count(&self) -> usize {
        self.inner.read().await.cards.len()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<BankAccount>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .by_account_number
            .get(account_number)
            .map(|&idx| tables.accounts[idx].clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<BankAccount>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .by_email
            .get(email)
            .map(|&idx| tables.accounts[idx].clone()))
    }

    async fn save_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        if tables.by_email.contains_key(&account.email) {
            return Err(StoreError::Conflict("email"));
        }
        if tables.by_account_number.contains_key(&account.account_number) {
            return Err(StoreError::Conflict("accountNumber"));
        }
        let idx = tables.accounts.len();
        tables.by_email.insert(account.email.clone(), idx);
        tables
            .by_account_number
            .insert(account.account_number.clone(), idx);
        tables.accounts.push(account.clone());
        Ok(())
    }

    async fn save_card(&self, card: &VirtualCard) -> Result<(), StoreError> {
        self.inner.write().await.cards.push(card.clone());
        Ok(())
    }

    async fn find_card_by_account_id(
        &self,
        account_id: Uuid,
    ) -> Result<Option<VirtualCard>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .cards
            .iter()
            .find(|card| card.account_id == account_id)
            .cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<BankAccount>, StoreError> {
        Ok(self.inner.read().await.accounts.clone())
    }
}
