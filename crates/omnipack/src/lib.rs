//! # Omnipack
//!
//! One shared inventory kept consistent across every connected participant,
//! with the server as the single source of truth.
//!
//! ## Overview
//!
//! Every participant has a local replica they can change at any time. On a
//! fixed cadence the server scans the replicas, merges what changed into the
//! canonical inventory (last write wins per slot, overfull stacks clamped) and
//! pushes canonical state back out. Discrete actions take a fast path that
//! reconciles immediately instead of waiting for the next tick.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use omnipack::{SharedInventory, SharedInventoryConfig};
//! use omnipack::core::{MemoryReplica, ParticipantId};
//! use omnipack::store::SqliteStore;
//! use omnipack::sync::MemoryNetwork;
//!
//! async fn example() {
//!     let config = SharedInventoryConfig::default();
//!     let store = SqliteStore::open("inventory.db").unwrap();
//!     let network = MemoryNetwork::new();
//!     let transport = network.create_transport(ParticipantId::random()).await;
//!
//!     let server: SharedInventory<_, _, MemoryReplica> =
//!         SharedInventory::open(config, store, transport).await.unwrap();
//!     let server = Arc::new(server);
//!
//!     let alice = ParticipantId::random();
//!     server.join(MemoryReplica::new(alice, 41)).await.unwrap();
//!
//!     let ticker = Arc::clone(&server).spawn_tick_loop();
//!     // ...
//!     ticker.abort();
//!     server.persist().await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `omnipack::core` - Item stacks, canonical inventory, replicas
//! - `omnipack::store` - Persistence (SQLite, in-memory)
//! - `omnipack::sync` - Reconciliation engine, messages, transport

pub mod config;
pub mod error;
pub mod server;

// Re-export component crates
pub use omnipack_core as core;
pub use omnipack_store as store;
pub use omnipack_sync as sync;

pub use config::SharedInventoryConfig;
pub use error::{Result, SharedInventoryError};
pub use server::SharedInventory;

// Re-export commonly used types
pub use omnipack_core::{
    CanonicalInventory, ContentHash, EnvironmentId, InventoryConfig, ItemId, ItemStack,
    MemoryReplica, ParticipantId, Replica, SlotIndex, StackLimitTable, StackLimits,
};
pub use omnipack_sync::{
    ActionAck, ActionApplier, ActionRequest, ApplyError, InteractionKind, PassReport,
    ValidatedAction,
};
