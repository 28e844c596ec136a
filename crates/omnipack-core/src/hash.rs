//! Content hashing for change detection.
//!
//! The content hash is a pure function of slot contents: Blake3 over the
//! domain-separated canonical encoding of every slot, in order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::canonical_stack_bytes;
use crate::item::ItemStack;

const DOMAIN: &[u8] = b"omnipack-inventory-v0:";

/// A 32-byte Blake3 hash of inventory contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash an ordered slot list.
///
/// Algorithm:
/// 1. H = Blake3(DOMAIN || slot_count as u64 BE)
/// 2. For each slot: H.update(canonical_stack_bytes(slot))
///
/// CBOR items are self-delimiting, so the concatenation is unambiguous.
pub fn content_hash(slots: &[ItemStack]) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN);
    hasher.update(&(slots.len() as u64).to_be_bytes());
    for stack in slots {
        hasher.update(&canonical_stack_bytes(stack));
    }
    ContentHash(*hasher.finalize().as_bytes())
}
