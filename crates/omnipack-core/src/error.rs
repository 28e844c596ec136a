//! Error types for Omnipack Core.

use thiserror::Error;

/// Core errors that can occur while encoding or configuring inventories.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("malformed slot list: {0}")]
    MalformedSlots(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Validation errors for a single slot value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("item id is empty on a non-empty stack")]
    MissingItemId,

    #[error("item id {0:?} is not a valid identifier")]
    InvalidItemId(String),

    #[error("item components exceed {max} bytes (got {len})")]
    ComponentsTooLarge { len: usize, max: usize },

    #[error("slot index {index} out of range for {slot_count} slots")]
    SlotOutOfRange { index: i64, slot_count: usize },
}
