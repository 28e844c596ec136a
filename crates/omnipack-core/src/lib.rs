//! # Omnipack Core
//!
//! Pure primitives for Omnipack: item stacks, slot hashing, and the canonical
//! shared inventory.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over inventory values.
//!
//! ## Key Types
//!
//! - [`ItemStack`] - The value held by one inventory slot (empty is a valid value)
//! - [`CanonicalInventory`] - The authoritative N-slot inventory with version and hash
//! - [`Replica`] - A participant's locally-visible copy of the inventory
//! - [`ContentHash`] - Blake3 hash of the canonical slot encoding
//! - [`StackLimits`] - Maximum stack size lookup
//!
//! ## Canonicalization
//!
//! Slot contents are hashed over deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod config;
pub mod error;
pub mod hash;
pub mod inventory;
pub mod item;
pub mod replica;
pub mod types;
pub mod validation;

pub use canonical::{canonical_slots_bytes, canonical_stack_bytes, decode_slots};
pub use config::{
    InventoryConfig, StackLimitTable, StackLimits, DEFAULT_MAX_STACK, DEFAULT_SLOT_COUNT,
    MAX_SLOT_COUNT,
};
pub use error::{CoreError, ValidationError};
pub use hash::{content_hash, ContentHash};
pub use inventory::CanonicalInventory;
pub use item::{ItemId, ItemStack};
pub use replica::{MemoryReplica, Replica};
pub use types::{EnvironmentId, ParticipantId, SlotIndex};
pub use validation::{slot_differs, validate_stack};
