//! Canonical State Store: the single authoritative N-slot inventory.
//!
//! Length is always exactly N, and no slot is ever absent: the empty stack is
//! a regular value. `version` increases on every content change and
//! `content_hash` is recomputed in the same step, so it is never stale.

use crate::config::StackLimits;
use crate::hash::{content_hash, ContentHash};
use crate::item::ItemStack;
use crate::replica::Replica;
use crate::types::SlotIndex;
use crate::validation::validate_stack;

/// The authoritative inventory with its version counter and content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalInventory {
    slots: Vec<ItemStack>,
    version: u64,
    content_hash: ContentHash,
}

impl CanonicalInventory {
    /// All-empty inventory at version 0.
    pub fn new(slot_count: usize) -> Self {
        Self::from_parts(Vec::new(), 0, slot_count)
    }

    /// Build from stored slots, padding with empties or truncating to N.
    pub fn from_parts(slots: Vec<ItemStack>, version: u64, slot_count: usize) -> Self {
        let mut slots: Vec<ItemStack> = slots.into_iter().map(ItemStack::normalized).collect();
        slots.resize(slot_count, ItemStack::empty());
        let content_hash = content_hash(&slots);
        Self {
            slots,
            version,
            content_hash,
        }
    }

    pub fn slots(&self) -> &[ItemStack] {
        &self.slots
    }

    pub fn slot(&self, index: SlotIndex) -> Option<&ItemStack> {
        self.slots.get(index.as_usize())
    }

    /// Number of slots N.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(ItemStack::is_empty)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn hash(&self) -> ContentHash {
        self.content_hash
    }

    /// Merge a replica's full contents into canonical state.
    ///
    /// Each slot is compared with value-equality after clamping the replica's
    /// value to its maximum stack size; mismatching slots are overwritten.
    /// Malformed replica values are skipped with a warning. Returns true if
    /// anything changed, in which case the version has been incremented once.
    pub fn merge_from_replica(&mut self, contents: &[ItemStack], limits: &dyn StackLimits) -> bool {
        let mut changed = false;
        for index in 0..self.slots.len() {
            let incoming = contents.get(index).cloned().unwrap_or_default();
            changed |= self.set_if_different(index, incoming, limits);
        }
        if changed {
            self.commit();
        }
        changed
    }

    /// Apply one slot change (the single-slot merge step used when draining
    /// queued change requests). Out-of-range slots are ignored.
    pub fn apply_change(&mut self, slot: SlotIndex, stack: &ItemStack, limits: &dyn StackLimits) -> bool {
        if slot.as_usize() >= self.slots.len() {
            return false;
        }
        let changed = self.set_if_different(slot.as_usize(), stack.clone(), limits);
        if changed {
            self.commit();
        }
        changed
    }

    /// Copy all canonical slots into a replica.
    ///
    /// Only the target is mutated. Notifying the transport is the caller's job.
    pub fn write_to_replica<R: Replica + ?Sized>(&self, target: &mut R) {
        let count = self.slots.len().min(target.slot_count());
        for (index, stack) in self.slots.iter().take(count).enumerate() {
            target.write_slot(index, stack.clone());
        }
    }

    /// Whether a slot list equals canonical contents.
    pub fn matches(&self, contents: &[ItemStack]) -> bool {
        contents.len() == self.slots.len() && content_hash(contents) == self.content_hash
    }

    fn set_if_different(&mut self, index: usize, incoming: ItemStack, limits: &dyn StackLimits) -> bool {
        if let Err(e) = validate_stack(&incoming) {
            tracing::warn!("skipping malformed value for slot {}: {}", index, e);
            return false;
        }
        let incoming = limits.clamp(incoming);
        if self.slots[index] == incoming {
            return false;
        }
        self.slots[index] = incoming;
        true
    }

    fn commit(&mut self) {
        self.version += 1;
        self.content_hash = content_hash(&self.slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackLimitTable;
    use crate::replica::MemoryReplica;
    use crate::types::ParticipantId;

    fn stone(count: u32) -> ItemStack {
        ItemStack::new("minecraft:stone", count)
    }

    #[test]
    fn test_new_is_empty_at_version_zero() {
        let inv = CanonicalInventory::new(41);
        assert_eq!(inv.len(), 41);
        assert_eq!(inv.version(), 0);
        assert!(inv.is_empty());
        assert_eq!(inv.hash(), content_hash(&vec![ItemStack::empty(); 41]));
    }

    #[test]
    fn test_from_parts_pads_and_truncates() {
        let inv = CanonicalInventory::from_parts(vec![stone(1)], 7, 3);
        assert_eq!(inv.len(), 3);
        assert_eq!(inv.version(), 7);
        assert_eq!(inv.slots()[0], stone(1));

        let inv = CanonicalInventory::from_parts(vec![stone(1); 5], 0, 2);
        assert_eq!(inv.len(), 2);
    }

    #[test]
    fn test_merge_changes_bump_version_once() {
        let limits = StackLimitTable::default();
        let mut inv = CanonicalInventory::new(4);
        let before = inv.hash();

        let changed = inv.merge_from_replica(&[stone(1), stone(2), ItemStack::empty(), stone(3)], &limits);
        assert!(changed);
        assert_eq!(inv.version(), 1);
        assert_ne!(inv.hash(), before);
        assert_eq!(inv.hash(), content_hash(inv.slots()));
    }

    #[test]
    fn test_merge_without_diff_is_noop() {
        let limits = StackLimitTable::default();
        let mut inv = CanonicalInventory::from_parts(vec![stone(1)], 3, 2);
        assert!(!inv.merge_from_replica(&[stone(1), ItemStack::empty()], &limits));
        assert_eq!(inv.version(), 3);
    }

    #[test]
    fn test_merge_clamps_overfull_stacks() {
        let limits = StackLimitTable::default();
        let mut inv = CanonicalInventory::new(41);
        let mut contents = vec![ItemStack::empty(); 41];
        contents[3] = ItemStack::new("minecraft:stone", 70);
        inv.merge_from_replica(&contents, &limits);
        assert_eq!(inv.slots()[3], ItemStack::new("minecraft:stone", 64));

        // A replica still holding 70 is not a new change once clamped.
        assert!(!inv.merge_from_replica(&contents, &limits));
        assert_eq!(inv.version(), 1);
    }

    #[test]
    fn test_merge_skips_malformed_values() {
        let limits = StackLimitTable::default();
        let mut inv = CanonicalInventory::from_parts(vec![stone(5)], 0, 2);
        let changed = inv.merge_from_replica(&[ItemStack::new("NOT VALID", 1), stone(2)], &limits);
        assert!(changed);
        assert_eq!(inv.slots()[0], stone(5));
        assert_eq!(inv.slots()[1], stone(2));
    }

    #[test]
    fn test_apply_change_last_write_wins() {
        let limits = StackLimitTable::default();
        let mut inv = CanonicalInventory::new(4);
        inv.apply_change(SlotIndex(2), &stone(1), &limits);
        inv.apply_change(SlotIndex(2), &ItemStack::new("minecraft:dirt", 9), &limits);
        assert_eq!(inv.slots()[2], ItemStack::new("minecraft:dirt", 9));
        assert_eq!(inv.version(), 2);
    }

    #[test]
    fn test_apply_change_out_of_range_ignored() {
        let limits = StackLimitTable::default();
        let mut inv = CanonicalInventory::new(4);
        assert!(!inv.apply_change(SlotIndex(9), &stone(1), &limits));
        assert_eq!(inv.version(), 0);
    }

    #[test]
    fn test_write_to_replica_leaves_canonical_untouched() {
        let inv = CanonicalInventory::from_parts(vec![stone(1), ItemStack::empty(), stone(3)], 4, 3);
        let mut replica = MemoryReplica::with_slots(
            ParticipantId::from_bytes([1; 16]),
            vec![ItemStack::new("minecraft:dirt", 5); 3],
        );

        inv.write_to_replica(&mut replica);

        assert_eq!(replica.slots(), inv.slots());
        assert_eq!(inv.version(), 4);
        assert!(inv.matches(&replica.snapshot(3)));
    }
}
