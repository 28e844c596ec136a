//! # Omnipack Store
//!
//! Persistence for the canonical shared inventory. Provides a trait-based
//! interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Persistence is optional: the reconciliation engine runs entirely in memory
//! and only hands the canonical state to an [`InventoryStore`] when the host
//! asks it to. A record is keyed by a stable [`EnvironmentId`] (world or save
//! identifier) and holds the ordered slot list plus the version counter.
//!
//! ## Key Types
//!
//! - [`InventoryStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`PersistedInventory`] - The on-disk record
//!
//! ## Usage
//!
//! ```rust,no_run
//! use omnipack_core::EnvironmentId;
//! use omnipack_store::{SqliteStore, StoreExt};
//!
//! async fn example() {
//!     let store = SqliteStore::open("inventory.db").unwrap();
//!     let env = EnvironmentId::new("overworld");
//!
//!     // Absent records load as an all-empty inventory at version 0.
//!     let canonical = store.load_canonical(&env, 41).await.unwrap();
//!     store.save_canonical(&env, &canonical).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Upsert saves**: saving replaces the previous record for the environment
//! - **Shape tolerant loads**: short records are padded, long ones truncated
//! - **Integrity**: the SQLite store keeps the content hash and checks it on load
//!
//! [`EnvironmentId`]: omnipack_core::EnvironmentId

pub mod error;
pub mod memory;
pub mod migration;
pub mod record;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use record::PersistedInventory;
pub use sqlite::SqliteStore;
pub use traits::{InventoryStore, StoreExt};
