//! In-memory implementation of the InventoryStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use omnipack_core::EnvironmentId;

use crate::error::Result;
use crate::record::PersistedInventory;
use crate::traits::InventoryStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<EnvironmentId, PersistedInventory>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn load(&self, env: &EnvironmentId) -> Result<Option<PersistedInventory>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(env).cloned())
    }

    async fn save(&self, env: &EnvironmentId, record: &PersistedInventory) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(env.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, env: &EnvironmentId) -> Result<bool> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        Ok(records.remove(env).is_some())
    }

    async fn list_environments(&self) -> Result<Vec<EnvironmentId>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.keys().cloned().collect())
    }
}
