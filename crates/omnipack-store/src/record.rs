//! The persisted shape of a canonical inventory.

use serde::{Deserialize, Serialize};

use omnipack_core::{
    canonical_slots_bytes, content_hash, decode_slots, CanonicalInventory, ContentHash, ItemStack,
};

use crate::error::Result;

/// Canonical slots as an ordered list of optional item values plus the version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedInventory {
    /// `None` is an empty slot.
    pub slots: Vec<Option<ItemStack>>,
    /// Canonical version at the time of saving.
    pub version: u64,
}

impl PersistedInventory {
    /// Capture the current canonical state.
    pub fn from_canonical(canonical: &CanonicalInventory) -> Self {
        Self {
            slots: canonical
                .slots()
                .iter()
                .map(|s| Some(s.clone()).filter(|s| !s.is_empty()))
                .collect(),
            version: canonical.version(),
        }
    }

    /// Rebuild canonical state with exactly `slot_count` slots.
    pub fn into_canonical(self, slot_count: usize) -> CanonicalInventory {
        let slots = self
            .slots
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        CanonicalInventory::from_parts(slots, self.version, slot_count)
    }

    /// Slots with empties filled in.
    pub fn stacks(&self) -> Vec<ItemStack> {
        self.slots
            .iter()
            .map(|s| s.clone().unwrap_or_default())
            .collect()
    }

    /// Canonical CBOR encoding of the slot list.
    pub fn encode_slots(&self) -> Vec<u8> {
        canonical_slots_bytes(&self.stacks())
    }

    /// Decode a slot list produced by [`PersistedInventory::encode_slots`].
    pub fn decode(bytes: &[u8], version: u64) -> Result<Self> {
        Ok(Self {
            slots: decode_slots(bytes)?,
            version,
        })
    }

    /// Content hash of the stored slots.
    pub fn content_hash(&self) -> ContentHash {
        content_hash(&self.stacks())
    }
}
