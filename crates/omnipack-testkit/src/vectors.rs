//! Golden test vectors for the canonical slot encoding.
//!
//! The content hash is computed over these bytes, so any implementation that
//! reproduces them reproduces the hash.

use serde::Serialize;

use omnipack_core::{canonical_slots_bytes, content_hash, ItemStack};

/// A golden test vector.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Slot contents in order.
    pub slots: Vec<Slot>,
    /// Expected canonical encoding (hex).
    pub expected_bytes: &'static str,
}

impl GoldenVector {
    pub fn stacks(&self) -> Vec<ItemStack> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some((id, count, comps)) => ItemStack::new(*id, *count).with_components(comps.to_vec()),
                None => ItemStack::empty(),
            })
            .collect()
    }
}

/// `(item id, count, components)`, or `None` for an empty slot.
pub type Slot = Option<(&'static str, u32, &'static [u8])>;

fn slot(id: &'static str, count: u32) -> Slot {
    slot_with(id, count, &[])
}

fn slot_with(id: &'static str, count: u32, components: &'static [u8]) -> Slot {
    Some((id, count, components))
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "three empty slots",
            slots: vec![None, None, None],
            expected_bytes: "83f6f6f6",
        },
        GoldenVector {
            name: "single stone",
            slots: vec![slot("minecraft:stone", 1)],
            expected_bytes: "81836f6d696e6563726166743a73746f6e650140",
        },
        GoldenVector {
            name: "full stack then empty",
            slots: vec![slot("minecraft:stone", 64), None],
            expected_bytes: "82836f6d696e6563726166743a73746f6e65184040f6",
        },
        GoldenVector {
            name: "components",
            slots: vec![None, slot_with("minecraft:shield", 1, &[0xde, 0xad])],
            expected_bytes: "82f683706d696e6563726166743a736869656c640142dead",
        },
        GoldenVector {
            name: "two-byte count",
            slots: vec![slot("minecraft:cobblestone", 300)],
            expected_bytes: "8183756d696e6563726166743a636f62626c6573746f6e6519012c40",
        },
        GoldenVector {
            name: "zero count is empty",
            slots: vec![slot("minecraft:stone", 0)],
            expected_bytes: "81f6",
        },
    ]
}

/// Verify all vectors and return (name, passed, actual hex, content hash hex).
pub fn verify_all_vectors() -> Vec<(String, bool, String, String)> {
    all_vectors()
        .into_iter()
        .map(|vector| {
            let stacks = vector.stacks();
            let actual = hex::encode(canonical_slots_bytes(&stacks));
            let hash = content_hash(&stacks).to_hex();
            (
                vector.name.to_string(),
                actual == vector.expected_bytes,
                actual,
                hash,
            )
        })
        .collect()
}

/// All vectors as JSON, for cross-implementation checks.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}
