//! Store trait: the abstract interface for canonical inventory persistence.
//!
//! This trait keeps the engine storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use omnipack_core::{CanonicalInventory, EnvironmentId};

use crate::error::Result;
use crate::record::PersistedInventory;

/// The InventoryStore trait: async interface for inventory persistence.
///
/// All methods are async to support both blocking (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Load the record for an environment, if one was ever saved.
    async fn load(&self, env: &EnvironmentId) -> Result<Option<PersistedInventory>>;

    /// Save (insert or replace) the record for an environment.
    async fn save(&self, env: &EnvironmentId, record: &PersistedInventory) -> Result<()>;

    /// Delete the record for an environment. Returns whether one existed.
    async fn delete(&self, env: &EnvironmentId) -> Result<bool>;

    /// List environments with a saved record.
    async fn list_environments(&self) -> Result<Vec<EnvironmentId>>;
}

/// Extension trait for loading and saving canonical state directly.
#[async_trait]
pub trait StoreExt: InventoryStore {
    /// Load canonical state, defaulting to all-empty at version 0 when absent.
    async fn load_canonical(
        &self,
        env: &EnvironmentId,
        slot_count: usize,
    ) -> Result<CanonicalInventory> {
        match self.load(env).await? {
            Some(record) => {
                if record.slots.len() != slot_count {
                    tracing::warn!(
                        "stored inventory for {} has {} slots, adapting to {}",
                        env,
                        record.slots.len(),
                        slot_count
                    );
                }
                Ok(record.into_canonical(slot_count))
            }
            None => Ok(CanonicalInventory::new(slot_count)),
        }
    }

    /// Persist canonical state.
    async fn save_canonical(
        &self,
        env: &EnvironmentId,
        canonical: &CanonicalInventory,
    ) -> Result<()> {
        let record = PersistedInventory::from_canonical(canonical);
        self.save(env, &record).await
    }
}

impl<S: InventoryStore + ?Sized> StoreExt for S {}
