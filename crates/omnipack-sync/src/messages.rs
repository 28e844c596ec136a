//! Wire messages exchanged between participants and the server.
//!
//! Every field round-trips exactly through the CBOR codec. Slot indices and
//! interaction codes travel as raw `i32` so that out-of-range values reach the
//! server intact and can be rejected or clamped there.

use serde::{Deserialize, Serialize};

use omnipack_core::{ContentHash, ItemStack, ParticipantId};

use crate::error::{Result, SyncError};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 0;

/// Message size limits.
pub mod limits {
    /// Max encoded size of a single message.
    pub const MAX_MESSAGE_BYTES: usize = 128 * 1024;
    /// Max length of an error message string.
    pub const MAX_ERROR_MESSAGE_LEN: usize = 1024;
}

/// A single discrete UI action a participant wants applied authoritatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Target slot, validated against `[0, N)` on the server.
    pub slot_index: i32,
    /// Mouse/button index as reported by the participant's input layer.
    pub button: i32,
    /// Interaction kind code, clamped server-side.
    pub interaction_kind: i32,
}

impl ActionRequest {
    pub fn new(slot_index: i32, button: i32, kind: InteractionKind) -> Self {
        Self {
            slot_index,
            button,
            interaction_kind: kind.code(),
        }
    }
}

/// Server answer to an [`ActionRequest`].
///
/// Informational only: the next canonical push is the authoritative result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionAck {
    pub accepted: bool,
    pub slot_index: i32,
}

/// Known interaction kinds, in wire-code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum InteractionKind {
    Pickup = 0,
    QuickMove = 1,
    Swap = 2,
    Clone = 3,
    Throw = 4,
    QuickCraft = 5,
    PickupAll = 6,
}

impl InteractionKind {
    const ALL: [InteractionKind; 7] = [
        InteractionKind::Pickup,
        InteractionKind::QuickMove,
        InteractionKind::Swap,
        InteractionKind::Clone,
        InteractionKind::Throw,
        InteractionKind::QuickCraft,
        InteractionKind::PickupAll,
    ];

    /// Map a wire code onto a known kind, clamping into range.
    pub fn from_code(code: i32) -> Self {
        let last = Self::ALL.len() as i32 - 1;
        Self::ALL[code.clamp(0, last) as usize]
    }

    /// Exact mapping; `None` for unknown codes.
    pub fn try_from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Sync protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Registration handshake, sent by both sides.
    Hello {
        /// Sender's identity.
        participant: ParticipantId,
        /// Protocol version for compatibility checking.
        protocol_version: u8,
    },

    /// Participant to server: apply one discrete action.
    Action(ActionRequest),

    /// Server to participant: action acknowledgement.
    Ack(ActionAck),

    /// Server to participant: one slot of canonical state.
    SlotUpdate {
        slot_index: i32,
        item: ItemStack,
    },

    /// Server to participant: a full push has completed.
    Synced {
        /// Canonical version that was pushed.
        version: u64,
        /// Content hash of the pushed slots.
        content_hash: ContentHash,
    },

    /// Error condition.
    Error {
        /// Error code for programmatic handling.
        code: SyncErrorCode,
        /// Human-readable description.
        message: String,
    },
}

impl SyncMessage {
    /// Check if this message respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        match self {
            SyncMessage::Error { message, .. } => {
                if message.len() > limits::MAX_ERROR_MESSAGE_LEN {
                    return Err("error message too long");
                }
            }
            SyncMessage::SlotUpdate { item, .. } => {
                if item.components.len() > omnipack_core::validation::MAX_COMPONENT_BYTES {
                    return Err("item components too large");
                }
            }
            SyncMessage::Hello { .. }
            | SyncMessage::Action(_)
            | SyncMessage::Ack(_)
            | SyncMessage::Synced { .. } => {}
        }
        Ok(())
    }

    /// Encode as CBOR.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
        if buf.len() > limits::MAX_MESSAGE_BYTES {
            return Err(SyncError::InvalidMessage(format!(
                "encoded message is {} bytes, limit {}",
                buf.len(),
                limits::MAX_MESSAGE_BYTES
            )));
        }
        Ok(buf)
    }

    /// Decode from CBOR and check limits.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > limits::MAX_MESSAGE_BYTES {
            return Err(SyncError::InvalidMessage("message too large".into()));
        }
        let msg: SyncMessage =
            ciborium::from_reader(bytes).map_err(|e| SyncError::Codec(e.to_string()))?;
        msg.validate_limits()
            .map_err(|e| SyncError::InvalidMessage(e.into()))?;
        Ok(msg)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::Hello { .. } => "hello",
            SyncMessage::Action(_) => "action",
            SyncMessage::Ack(_) => "ack",
            SyncMessage::SlotUpdate { .. } => "slot_update",
            SyncMessage::Synced { .. } => "synced",
            SyncMessage::Error { .. } => "error",
        }
    }
}

/// Error codes for sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum SyncErrorCode {
    /// Protocol version mismatch.
    VersionMismatch = 1,
    /// Message not valid in this direction.
    InvalidMessage = 2,
    /// Sender is not a connected participant.
    NotRegistered = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_kind_clamps() {
        assert_eq!(InteractionKind::from_code(0), InteractionKind::Pickup);
        assert_eq!(InteractionKind::from_code(2), InteractionKind::Swap);
        assert_eq!(InteractionKind::from_code(-5), InteractionKind::Pickup);
        assert_eq!(InteractionKind::from_code(99), InteractionKind::PickupAll);
        assert_eq!(InteractionKind::try_from_code(99), None);
        assert_eq!(InteractionKind::try_from_code(-1), None);
        assert_eq!(InteractionKind::try_from_code(6), Some(InteractionKind::PickupAll));
    }

    #[test]
    fn test_action_request_fields_survive_codec() {
        let msg = SyncMessage::Action(ActionRequest {
            slot_index: -1,
            button: 1,
            interaction_kind: 42,
        });
        let decoded = SyncMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_slot_update_with_components() {
        let msg = SyncMessage::SlotUpdate {
            slot_index: 40,
            item: ItemStack::new("minecraft:shield", 1).with_components(vec![0xde, 0xad]),
        };
        let decoded = SyncMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            SyncMessage::from_bytes(&[0xff, 0x00, 0x13]),
            Err(SyncError::Codec(_))
        ));
    }

    #[test]
    fn test_message_limits_exceeded() {
        let msg = SyncMessage::Error {
            code: SyncErrorCode::InvalidMessage,
            message: "x".repeat(limits::MAX_ERROR_MESSAGE_LEN + 1),
        };
        assert!(msg.validate_limits().is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_from_code_total(code in proptest::num::i32::ANY) {
            let kind = InteractionKind::from_code(code);
            match InteractionKind::try_from_code(code) {
                Some(exact) => {
                    proptest::prop_assert_eq!(kind, exact);
                }
                None if code < 0 => {
                    proptest::prop_assert_eq!(kind, InteractionKind::Pickup);
                }
                None => {
                    proptest::prop_assert_eq!(kind, InteractionKind::PickupAll);
                }
            }
        }
    }
}
