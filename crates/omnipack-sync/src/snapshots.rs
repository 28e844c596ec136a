//! Replica Snapshot Cache.
//!
//! The server's record of what each participant's replica looked like at the
//! last reconciliation point. It is a cache for change detection, never a
//! source of truth.

use std::collections::HashMap;

use omnipack_core::{content_hash, CanonicalInventory, ContentHash, ItemStack, ParticipantId};

/// Last observed contents of one replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSnapshot {
    slots: Vec<ItemStack>,
    hash: ContentHash,
}

impl ReplicaSnapshot {
    pub fn new(slots: Vec<ItemStack>) -> Self {
        let hash = content_hash(&slots);
        Self { slots, hash }
    }

    pub fn of(canonical: &CanonicalInventory) -> Self {
        Self {
            slots: canonical.slots().to_vec(),
            hash: canonical.hash(),
        }
    }

    pub fn slots(&self) -> &[ItemStack] {
        &self.slots
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }
}

#[derive(Debug, Default)]
struct Entry {
    /// `None` until the first observation after join.
    baseline: Option<ReplicaSnapshot>,
    /// Set after a failed delivery; cleared by the next push.
    stale: bool,
}

/// Per-participant snapshots keyed by participant id.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: HashMap<ParticipantId, Entry>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a participant with no baseline.
    ///
    /// Re-registering an existing participant drops its baseline so the next
    /// observation is treated as the first one again.
    pub fn register(&mut self, participant: ParticipantId) {
        self.entries.insert(participant, Entry::default());
    }

    /// Stop tracking a participant. Returns whether it was tracked.
    pub fn remove(&mut self, participant: &ParticipantId) -> bool {
        self.entries.remove(participant).is_some()
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.entries.contains_key(participant)
    }

    pub fn baseline(&self, participant: &ParticipantId) -> Option<&ReplicaSnapshot> {
        self.entries.get(participant)?.baseline.as_ref()
    }

    /// Replace the baseline with a fresh scan, returning the previous one.
    ///
    /// Unknown participants are registered on the fly.
    pub fn observe(
        &mut self,
        participant: ParticipantId,
        fresh: Vec<ItemStack>,
    ) -> Option<ReplicaSnapshot> {
        let entry = self.entries.entry(participant).or_default();
        entry.baseline.replace(ReplicaSnapshot::new(fresh))
    }

    /// Record that canonical state was just pushed to this participant.
    pub fn reset_to(&mut self, participant: ParticipantId, canonical: &CanonicalInventory) {
        let entry = self.entries.entry(participant).or_default();
        entry.baseline = Some(ReplicaSnapshot::of(canonical));
        entry.stale = false;
    }

    /// Force a resync of this participant on the next pass.
    pub fn mark_stale(&mut self, participant: &ParticipantId) -> bool {
        match self.entries.get_mut(participant) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// Whether this participant is behind canonical state.
    ///
    /// True when marked stale, never observed, or last seen holding something
    /// other than canonical contents.
    pub fn is_lagging(&self, participant: &ParticipantId, canonical: &CanonicalInventory) -> bool {
        match self.entries.get(participant) {
            Some(entry) => {
                entry.stale
                    || entry
                        .baseline
                        .as_ref()
                        .map_or(true, |b| b.hash != canonical.hash())
            }
            None => false,
        }
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(b: u8) -> ParticipantId {
        ParticipantId::from_bytes([b; 16])
    }

    #[test]
    fn test_first_observation_has_no_previous() {
        let mut cache = SnapshotCache::new();
        cache.register(pid(1));
        assert!(cache.baseline(&pid(1)).is_none());

        let prev = cache.observe(pid(1), vec![ItemStack::new("minecraft:stone", 5)]);
        assert!(prev.is_none());

        let prev = cache.observe(pid(1), vec![ItemStack::empty()]);
        assert_eq!(prev.unwrap().slots()[0], ItemStack::new("minecraft:stone", 5));
    }

    #[test]
    fn test_lagging_and_stale() {
        let canonical = CanonicalInventory::new(2);
        let mut cache = SnapshotCache::new();

        cache.register(pid(1));
        assert!(cache.is_lagging(&pid(1), &canonical));

        cache.reset_to(pid(1), &canonical);
        assert!(!cache.is_lagging(&pid(1), &canonical));

        assert!(cache.mark_stale(&pid(1)));
        assert!(cache.is_lagging(&pid(1), &canonical));

        cache.reset_to(pid(1), &canonical);
        assert!(!cache.is_lagging(&pid(1), &canonical));

        cache.observe(pid(1), vec![ItemStack::new("minecraft:stone", 1), ItemStack::empty()]);
        assert!(cache.is_lagging(&pid(1), &canonical));
    }

    #[test]
    fn test_remove_forgets_participant() {
        let mut cache = SnapshotCache::new();
        cache.register(pid(1));
        assert!(cache.remove(&pid(1)));
        assert!(!cache.remove(&pid(1)));
        assert!(!cache.mark_stale(&pid(1)));
        assert!(!cache.is_lagging(&pid(1), &CanonicalInventory::new(1)));
        assert!(cache.is_empty());
    }
}
