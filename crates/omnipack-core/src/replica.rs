//! Replica: a participant's locally-visible inventory.
//!
//! The server never owns a participant's replica outright; it reads it for
//! change detection and writes canonical contents into it when pushing.

use crate::item::ItemStack;
use crate::types::ParticipantId;

/// Slot-level access to one participant's inventory.
pub trait Replica {
    /// The participant this replica belongs to.
    fn participant(&self) -> ParticipantId;

    /// Number of slots the replica actually exposes.
    fn slot_count(&self) -> usize;

    /// Read one slot. `None` when the index is beyond the replica's size.
    fn read_slot(&self, index: usize) -> Option<ItemStack>;

    /// Overwrite one slot. Writes beyond the replica's size are ignored.
    fn write_slot(&mut self, index: usize, stack: ItemStack);

    /// Copy of the first `slot_count` slots.
    ///
    /// Slots the replica does not expose read as empty, so the result is
    /// always exactly `slot_count` long.
    fn snapshot(&self, slot_count: usize) -> Vec<ItemStack> {
        (0..slot_count)
            .map(|i| self.read_slot(i).unwrap_or_default().normalized())
            .collect()
    }
}

impl<R: Replica + ?Sized> Replica for Box<R> {
    fn participant(&self) -> ParticipantId {
        (**self).participant()
    }

    fn slot_count(&self) -> usize {
        (**self).slot_count()
    }

    fn read_slot(&self, index: usize) -> Option<ItemStack> {
        (**self).read_slot(index)
    }

    fn write_slot(&mut self, index: usize, stack: ItemStack) {
        (**self).write_slot(index, stack)
    }
}

/// A replica backed by a plain vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryReplica {
    participant: ParticipantId,
    slots: Vec<ItemStack>,
}

impl MemoryReplica {
    /// Create an all-empty replica.
    pub fn new(participant: ParticipantId, slot_count: usize) -> Self {
        Self {
            participant,
            slots: vec![ItemStack::empty(); slot_count],
        }
    }

    /// Create a replica with given contents.
    pub fn with_slots(participant: ParticipantId, slots: Vec<ItemStack>) -> Self {
        Self { participant, slots }
    }

    pub fn slots(&self) -> &[ItemStack] {
        &self.slots
    }

    /// Direct slot edit, standing in for a participant's local UI action.
    pub fn set(&mut self, index: usize, stack: ItemStack) {
        self.write_slot(index, stack);
    }

    pub fn get(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index)
    }
}

impl Replica for MemoryReplica {
    fn participant(&self) -> ParticipantId {
        self.participant
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn read_slot(&self, index: usize) -> Option<ItemStack> {
        self.slots.get(index).cloned()
    }

    fn write_slot(&mut self, index: usize, stack: ItemStack) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_pads_short_replicas() {
        let mut replica = MemoryReplica::new(ParticipantId::from_bytes([1; 16]), 2);
        replica.set(1, ItemStack::new("minecraft:stone", 2));

        let snap = replica.snapshot(4);
        assert_eq!(snap.len(), 4);
        assert_eq!(snap[1], ItemStack::new("minecraft:stone", 2));
        assert!(snap[2].is_empty());
        assert!(snap[3].is_empty());
    }

    #[test]
    fn test_out_of_range_write_ignored() {
        let mut replica = MemoryReplica::new(ParticipantId::from_bytes([1; 16]), 2);
        replica.set(5, ItemStack::new("minecraft:stone", 2));
        assert_eq!(replica.slots().len(), 2);
        assert!(replica.slots().iter().all(ItemStack::is_empty));
    }

    #[test]
    fn test_boxed_replica_delegates() {
        let mut boxed: Box<dyn Replica> =
            Box::new(MemoryReplica::new(ParticipantId::from_bytes([2; 16]), 3));
        boxed.write_slot(0, ItemStack::new("minecraft:dirt", 1));
        assert_eq!(boxed.read_slot(0), Some(ItemStack::new("minecraft:dirt", 1)));
        assert_eq!(boxed.participant(), ParticipantId::from_bytes([2; 16]));
    }
}
