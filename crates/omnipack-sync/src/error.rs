//! Error types for the sync module.

use thiserror::Error;

use omnipack_core::ParticipantId;

use crate::messages::SyncErrorCode;

/// Errors that can occur at the edges of the sync module.
///
/// Nothing inside a reconciliation pass returns these; malformed values and
/// failed deliveries are logged and counted instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Protocol version mismatch with peer.
    #[error("protocol version mismatch: local={local}, peer={peer}")]
    VersionMismatch { local: u8, peer: u8 },

    /// Message validation failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Peer sent an error message.
    #[error("peer error ({code:?}): {message}")]
    PeerError { code: SyncErrorCode, message: String },

    /// Peer is not connected.
    #[error("peer not connected: {0}")]
    PeerNotConnected(ParticipantId),

    /// Engine configuration or encoding failed.
    #[error("core error: {0}")]
    Core(#[from] omnipack_core::CoreError),

    /// Slot value or index failed validation.
    #[error("validation error: {0}")]
    ValidationError(#[from] omnipack_core::ValidationError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
