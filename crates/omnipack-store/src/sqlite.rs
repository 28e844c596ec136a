//! SQLite implementation of the InventoryStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use omnipack_core::{ContentHash, EnvironmentId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::record::PersistedInventory;
use crate::traits::InventoryStore;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Task(format!("mutex poisoned: {}", e)))
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, Vec<u8>, Vec<u8>)> {
    Ok((row.get("version")?, row.get("slots")?, row.get("content_hash")?))
}

#[async_trait]
impl InventoryStore for SqliteStore {
    async fn load(&self, env: &EnvironmentId) -> Result<Option<PersistedInventory>> {
        let key = env.as_str().to_string();

        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT version, slots, content_hash FROM inventories
                     WHERE environment_id = ?1",
                    params![key],
                    row_to_record,
                )
                .optional()?;

            let Some((version, slots, stored_hash)) = row else {
                return Ok(None);
            };

            let version = u64::try_from(version)
                .map_err(|_| StoreError::InvalidData(format!("negative version {}", version)))?;
            let record = PersistedInventory::decode(&slots, version)?;

            let stored: [u8; 32] = stored_hash.try_into().map_err(|_| {
                StoreError::InvalidData("content hash must be 32 bytes".into())
            })?;
            if record.content_hash() != ContentHash::from_bytes(stored) {
                return Err(StoreError::InvalidData(format!(
                    "content hash mismatch for environment {}",
                    key
                )));
            }

            Ok(Some(record))
        })
        .await
    }

    async fn save(&self, env: &EnvironmentId, record: &PersistedInventory) -> Result<()> {
        let key = env.as_str().to_string();
        let version = i64::try_from(record.version)
            .map_err(|_| StoreError::InvalidData(format!("version {} overflows", record.version)))?;
        let slot_count = record.slots.len() as i64;
        let slots = record.encode_slots();
        let hash = record.content_hash();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO inventories (
                    environment_id, version, slot_count, slots, content_hash, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(environment_id) DO UPDATE SET
                    version = excluded.version,
                    slot_count = excluded.slot_count,
                    slots = excluded.slots,
                    content_hash = excluded.content_hash,
                    updated_at = excluded.updated_at",
                params![
                    key,
                    version,
                    slot_count,
                    slots,
                    hash.as_bytes().as_slice(),
                    now_millis()
                ],
            )?;
            tracing::debug!("saved inventory for {} at version {}", key, version);
            Ok(())
        })
        .await
    }

    async fn delete(&self, env: &EnvironmentId) -> Result<bool> {
        let key = env.as_str().to_string();

        self.blocking(move |conn| {
            let removed = conn.execute(
                "DELETE FROM inventories WHERE environment_id = ?1",
                params![key],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_environments(&self) -> Result<Vec<EnvironmentId>> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare("SELECT environment_id FROM inventories ORDER BY environment_id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids.into_iter().map(EnvironmentId::new).collect())
        })
        .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use omnipack_core::{CanonicalInventory, ItemStack, SlotIndex, StackLimitTable};

    fn sample_canonical() -> CanonicalInventory {
        let limits = StackLimitTable::default();
        let mut canonical = CanonicalInventory::new(41);
        canonical.apply_change(SlotIndex(0), &ItemStack::new("minecraft:stone", 32), &limits);
        canonical.apply_change(
            SlotIndex(40),
            &ItemStack::new("minecraft:diamond_sword", 1).with_components(vec![1u8, 2, 3]),
            &limits,
        );
        canonical
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = SqliteStore::open_memory().unwrap();
        let env = EnvironmentId::new("overworld");
        let canonical = sample_canonical();

        store.save_canonical(&env, &canonical).await.unwrap();
        let loaded = store.load_canonical(&env, 41).await.unwrap();

        assert_eq!(loaded, canonical);
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.hash(), canonical.hash());
    }

    #[tokio::test]
    async fn test_missing_environment_is_empty() {
        let store = SqliteStore::open_memory().unwrap();
        let env = EnvironmentId::new("nether");

        assert!(store.load(&env).await.unwrap().is_none());
        let canonical = store.load_canonical(&env, 41).await.unwrap();
        assert_eq!(canonical.version(), 0);
        assert!(canonical.is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_previous() {
        let store = SqliteStore::open_memory().unwrap();
        let env = EnvironmentId::new("overworld");
        let limits = StackLimitTable::default();

        let mut canonical = sample_canonical();
        store.save_canonical(&env, &canonical).await.unwrap();

        canonical.apply_change(SlotIndex(0), &ItemStack::empty(), &limits);
        store.save_canonical(&env, &canonical).await.unwrap();

        let loaded = store.load_canonical(&env, 41).await.unwrap();
        assert_eq!(loaded.version(), 3);
        assert!(loaded.slot(SlotIndex(0)).is_some_and(ItemStack::is_empty));
        assert_eq!(store.list_environments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let store = SqliteStore::open_memory().unwrap();
        let a = EnvironmentId::new("a");
        let b = EnvironmentId::new("b");
        let canonical = CanonicalInventory::new(4);

        store.save_canonical(&b, &canonical).await.unwrap();
        store.save_canonical(&a, &canonical).await.unwrap();
        assert_eq!(store.list_environments().await.unwrap(), vec![a.clone(), b.clone()]);

        assert!(store.delete(&a).await.unwrap());
        assert!(!store.delete(&a).await.unwrap());
        assert_eq!(store.list_environments().await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn test_tampered_row_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let env = EnvironmentId::new("overworld");
        store.save_canonical(&env, &sample_canonical()).await.unwrap();

        {
            let conn = lock(&store.conn).unwrap();
            conn.execute(
                "UPDATE inventories SET content_hash = ?1",
                params![[0u8; 32].as_slice()],
            )
            .unwrap();
        }

        let err = store.load(&env).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");
        let env = EnvironmentId::new("overworld");
        let canonical = sample_canonical();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_canonical(&env, &canonical).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.load_canonical(&env, 41).await.unwrap();
        assert_eq!(loaded, canonical);
    }
}
