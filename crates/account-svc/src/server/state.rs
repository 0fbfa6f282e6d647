//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::crypto::FieldCipher;
use crate::provision::ProvisioningWorkflow;
use crate::retrieval::RetrievalProjection;
use crate::store::AccountStore;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    pub workflow: ProvisioningWorkflow,
    pub projection: RetrievalProjection,
    pub cipher: Arc<FieldCipher>,
    pub store: Arc<dyn AccountStore>,
}

impl AppState {
    /// Wire the workflow and projection over one store and one cipher.
    pub fn new(
        store: Arc<dyn AccountStore>,
        cipher: Arc<FieldCipher>,
        max_allocation_attempts: u32,
    ) -> Self {
        Self {
            workflow: ProvisioningWorkflow::new(
                store.clone(),
                cipher.clone(),
                max_allocation_attempts,
            ),
            projection: RetrievalProjection::new(store.clone(), cipher.clone()),
            cipher,
            store,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State over an empty [`crate::store::MemoryStore`] and a fixed test key.
    pub fn for_tests() -> Self {
        use crate::crypto::cipher::KEY_LEN;
        use crate::crypto::FieldKey;
        use crate::provision::allocator::DEFAULT_MAX_ATTEMPTS;

        let key = FieldKey::from_bytes(&[0x42u8; KEY_LEN]).expect("test key");
        Self::new(
            Arc::new(crate::store::MemoryStore::new()),
            Arc::new(FieldCipher::new(&key)),
            DEFAULT_MAX_ATTEMPTS,
        )
    }
}
