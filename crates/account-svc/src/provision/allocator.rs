//! Random, storage-probed account number allocation.

use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{AccountStore, StoreError};

/// Default cap on the number of candidates probed per allocation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Smallest account number (10 digits, leading digit non-zero).
pub const ACCOUNT_NUMBER_MIN: u64 = 1_000_000_000;

/// Largest account number.
pub const ACCOUNT_NUMBER_MAX: u64 = 9_999_999_999;

/// Errors produced by [`AccountNumberAllocator::allocate`].
#[derive(Debug, Error)]
pub enum AllocationError {
    /// Every probed candidate was already taken.
    #[error("no free account number after {0} attempts")]
    Exhausted(u32),

    /// The existence probe failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Draws random 10-digit account numbers until one is absent from the store.
///
/// The probe and the eventual insert are not atomic. Two concurrent callers
/// can receive the same number; the store's unique index on `account_number`
/// rejects the second insert.
#[derive(Clone)]
pub struct AccountNumberAllocator {
    store: Arc<dyn AccountStore>,
    max_attempts: u32,
}

impl AccountNumberAllocator {
    /// Create an allocator probing `store`, giving up after `max_attempts`.
    pub fn new(store: Arc<dyn AccountStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    /// Return an account number that is not currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Exhausted`] once `max_attempts` candidates
    /// were all taken, or [`AllocationError::Store`] if a lookup fails.
    pub async fn allocate(&self) -> Result<String, AllocationError> {
        self.allocate_from(random_account_number).await
    }

    async fn allocate_from<F>(&self, mut draw: F) -> Result<String, AllocationError>
    where
        F: FnMut() -> String + Send,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = draw();
            if self
                .store
                .find_by_account_number(&candidate)
                .await?
                .is_none()
            {
                debug!(attempt, "account number allocated");
                return Ok(candidate);
            }
        }
        warn!(
            attempts = self.max_attempts,
            "account number allocation exhausted"
        );
        Err(AllocationError::Exhausted(self.max_attempts))
    }
}

/// Uniform draw from [`ACCOUNT_NUMBER_MIN`]..=[`ACCOUNT_NUMBER_MAX`].
pub fn random_account_number() -> String {
    rand::thread_rng()
        .gen_range(ACCOUNT_NUMBER_MIN..=ACCOUNT_NUMBER_MAX)
        .to_string()
}
