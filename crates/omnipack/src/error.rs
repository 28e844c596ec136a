//! Error types for the shared inventory server.

use omnipack_core::{CoreError, ParticipantId};
use omnipack_store::StoreError;
use omnipack_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during SharedInventory operations.
#[derive(Debug, Error)]
pub enum SharedInventoryError {
    /// Core error (encoding, configuration).
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Configuration could not be parsed or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Participant is already in the roster.
    #[error("participant already joined: {0}")]
    AlreadyJoined(ParticipantId),

    /// Replica exposes fewer slots than the shared inventory.
    #[error("replica of {participant} has {actual} slots, need {expected}")]
    SlotCountMismatch {
        participant: ParticipantId,
        expected: usize,
        actual: usize,
    },
}

/// Result type for SharedInventory operations.
pub type Result<T> = std::result::Result<T, SharedInventoryError>;
