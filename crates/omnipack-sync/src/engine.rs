//! Reconciliation Engine.
//!
//! One [`Reconciler`] owns the canonical inventory, the replica snapshot cache
//! and the consumer end of the change queue, all behind a single mutex. Every
//! pass (periodic tick, post-action, post-join, explicit resync) takes that
//! mutex for its whole duration, so passes are serialized and only one drain
//! ever runs at a time.
//!
//! A pass never performs I/O. Pushes are written into replicas directly and
//! the matching transport messages are returned in [`PassReport::outbox`] for
//! the caller to deliver once the guard is released.
//!
//! ## Pass Structure
//!
//! ```text
//! ScanReplicas -> DetectDiffs -> ApplyDiffs -> BroadcastIfChanged
//! ```
//!
//! If nothing changed, participants whose last observed contents differ from
//! canonical state (or whose last push failed) are resynchronized alone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use omnipack_core::{
    slot_differs, CanonicalInventory, ContentHash, InventoryConfig, ParticipantId, Replica,
    SlotIndex, StackLimits,
};

use crate::error::Result;
use crate::push::{push_to_replica, PushBatch};
use crate::queue::{change_queue, ChangeReceiver, ChangeSender, SlotChangeRequest};
use crate::snapshots::SnapshotCache;

/// What triggered a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Tick,
    Action,
    Join,
    Resync,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub kind: PassKind,
    /// Replicas scanned.
    pub observed: usize,
    /// Replicas seen for the first time (baseline recorded, no diffing).
    pub baselined: usize,
    /// Slot Change Requests emitted by diff detection.
    pub emitted: usize,
    /// Slot comparisons skipped because a value was malformed.
    pub malformed: usize,
    /// Requests drained and applied (including externally submitted ones).
    pub applied: usize,
    /// Whether canonical state changed.
    pub changed: bool,
    /// Canonical version at the end of the pass.
    pub version: u64,
    /// Participants whose replica was overwritten with canonical state.
    pub pushed: Vec<ParticipantId>,
    /// Messages to deliver, one batch per pushed participant.
    pub outbox: Vec<PushBatch>,
}

impl PassReport {
    fn new(kind: PassKind) -> Self {
        Self {
            kind,
            observed: 0,
            baselined: 0,
            emitted: 0,
            malformed: 0,
            applied: 0,
            changed: false,
            version: 0,
            pushed: Vec::new(),
            outbox: Vec::new(),
        }
    }
}

struct EngineState {
    canonical: CanonicalInventory,
    snapshots: SnapshotCache,
    pending: ChangeReceiver,
}

/// The server-side reconciliation engine for one shared inventory.
pub struct Reconciler {
    slot_count: usize,
    limits: Arc<dyn StackLimits>,
    sender: ChangeSender,
    state: Mutex<EngineState>,
}

impl Reconciler {
    /// Engine over an all-empty inventory at version 0.
    pub fn new(config: &InventoryConfig) -> Result<Self> {
        Self::with_canonical(config, CanonicalInventory::new(config.slot_count))
    }

    /// Engine over previously loaded canonical state.
    ///
    /// The state is padded or truncated to the configured slot count.
    pub fn with_canonical(config: &InventoryConfig, canonical: CanonicalInventory) -> Result<Self> {
        config.validate()?;

        let canonical = if canonical.len() == config.slot_count {
            canonical
        } else {
            let version = canonical.version();
            CanonicalInventory::from_parts(canonical.slots().to_vec(), version, config.slot_count)
        };

        let (sender, pending) = change_queue();
        Ok(Self {
            slot_count: config.slot_count,
            limits: Arc::new(config.stack_limits.clone()),
            sender,
            state: Mutex::new(EngineState {
                canonical,
                snapshots: SnapshotCache::new(),
                pending,
            }),
        })
    }

    /// Replace the maximum-stack lookup.
    pub fn with_limits(mut self, limits: Arc<dyn StackLimits>) -> Self {
        self.limits = limits;
        self
    }

    /// Number of slots N.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn limits(&self) -> &dyn StackLimits {
        self.limits.as_ref()
    }

    /// Producer handle for submitting Slot Change Requests from any thread.
    ///
    /// Submissions are applied, in order, by the next pass's drain.
    pub fn change_sender(&self) -> ChangeSender {
        self.sender.clone()
    }

    /// Copy of the current canonical state.
    pub fn canonical(&self) -> CanonicalInventory {
        self.lock().canonical.clone()
    }

    pub fn version(&self) -> u64 {
        self.lock().canonical.version()
    }

    pub fn hash(&self) -> ContentHash {
        self.lock().canonical.hash()
    }

    /// Participants with a snapshot entry.
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.lock().snapshots.participants().copied().collect()
    }

    /// Start tracking a participant; its next observation is a baseline.
    pub fn register(&self, participant: ParticipantId) {
        self.lock().snapshots.register(participant);
    }

    /// Drop a participant's snapshot. Queued requests from it still apply.
    pub fn forget(&self, participant: &ParticipantId) -> bool {
        self.lock().snapshots.remove(participant)
    }

    /// Force a resync of this participant on the next pass.
    pub fn mark_stale(&self, participant: &ParticipantId) -> bool {
        self.lock().snapshots.mark_stale(participant)
    }

    /// Periodic pass over every connected replica.
    pub fn tick<R: Replica>(&self, replicas: &mut [R]) -> PassReport {
        let mut state = self.lock();
        let mut report = PassReport::new(PassKind::Tick);

        for replica in replicas.iter() {
            self.observe(&mut state, replica, &mut report);
        }

        self.drain(&mut state, &mut report);

        if report.changed {
            for replica in replicas.iter_mut() {
                self.push(&mut state, replica, &mut report);
            }
        } else {
            for replica in replicas.iter_mut() {
                if state.snapshots.is_lagging(&replica.participant(), &state.canonical) {
                    self.push(&mut state, replica, &mut report);
                }
            }
        }

        self.finish(&state, report)
    }

    /// Register a newly joined participant and run its first scoped pass.
    ///
    /// The first observation only records a baseline, so nothing the replica
    /// held on arrival is applied; the replica is then overwritten with
    /// canonical state unless it already matches.
    pub fn join<R: Replica>(&self, participant: ParticipantId, replicas: &mut [R]) -> PassReport {
        let mut state = self.lock();
        state.snapshots.register(participant);
        self.scoped(&mut state, participant, replicas, PassKind::Join)
    }

    /// Immediate pass after an action was applied to `actor`'s replica.
    ///
    /// Only the actor is observed. If canonical state changed every replica is
    /// pushed; otherwise the actor alone is resynchronized when it lags.
    pub fn after_action<R: Replica>(&self, actor: ParticipantId, replicas: &mut [R]) -> PassReport {
        let mut state = self.lock();
        self.scoped(&mut state, actor, replicas, PassKind::Action)
    }

    /// Push canonical state to one participant unconditionally.
    pub fn resync<R: Replica>(&self, participant: ParticipantId, replicas: &mut [R]) -> PassReport {
        let mut state = self.lock();
        let mut report = PassReport::new(PassKind::Resync);
        if let Some(replica) = replicas.iter_mut().find(|r| r.participant() == participant) {
            self.push(&mut state, replica, &mut report);
        } else {
            tracing::debug!("resync requested for absent participant {}", participant);
        }
        self.finish(&state, report)
    }

    fn scoped<R: Replica>(
        &self,
        state: &mut EngineState,
        actor: ParticipantId,
        replicas: &mut [R],
        kind: PassKind,
    ) -> PassReport {
        let mut report = PassReport::new(kind);
        let position = replicas.iter().position(|r| r.participant() == actor);

        match position {
            Some(index) => self.observe(state, &replicas[index], &mut report),
            None => tracing::debug!("{:?} pass for absent participant {}", kind, actor),
        }

        self.drain(state, &mut report);

        if report.changed {
            for replica in replicas.iter_mut() {
                self.push(state, replica, &mut report);
            }
        } else if let Some(index) = position {
            if state.snapshots.is_lagging(&actor, &state.canonical) {
                self.push(state, &mut replicas[index], &mut report);
            }
        }

        self.finish(state, report)
    }

    /// DetectDiffs for one replica.
    fn observe<R: Replica + ?Sized>(
        &self,
        state: &mut EngineState,
        replica: &R,
        report: &mut PassReport,
    ) {
        let participant = replica.participant();
        let visible = replica.slot_count().min(self.slot_count);
        let mut fresh = replica.snapshot(self.slot_count);
        // Slots a short replica does not have track canonical state.
        for (slot, current) in fresh.iter_mut().zip(state.canonical.slots()).skip(visible) {
            *slot = current.clone();
        }
        report.observed += 1;

        let Some(previous) = state.snapshots.observe(participant, fresh.clone()) else {
            report.baselined += 1;
            tracing::debug!("baseline recorded for {}", participant);
            return;
        };

        let compared = previous.slots().iter().zip(&fresh).take(visible);
        for (index, (before, after)) in compared.enumerate() {
            match slot_differs(before, after) {
                Ok(false) => {}
                Ok(true) => {
                    let request =
                        SlotChangeRequest::new(participant, SlotIndex(index as u16), after.clone());
                    if !self.sender.submit(request) {
                        tracing::warn!("change queue closed, dropping diff for slot {}", index);
                        continue;
                    }
                    report.emitted += 1;
                }
                Err(e) => {
                    report.malformed += 1;
                    tracing::warn!(
                        "ignoring malformed value in slot {} of {}: {}",
                        index,
                        participant,
                        e
                    );
                }
            }
        }
    }

    /// ApplyDiffs: apply every queued request, one slot at a time, in order.
    fn drain(&self, state: &mut EngineState, report: &mut PassReport) {
        for request in state.pending.drain() {
            report.applied += 1;
            if state
                .canonical
                .apply_change(request.slot, &request.stack, self.limits.as_ref())
            {
                report.changed = true;
                tracing::trace!(
                    "slot {} set by {} to {:?}",
                    request.slot,
                    request.participant,
                    request.stack
                );
            }
        }
    }

    fn push<R: Replica + ?Sized>(
        &self,
        state: &mut EngineState,
        replica: &mut R,
        report: &mut PassReport,
    ) {
        let batch = push_to_replica(&state.canonical, replica);
        state.snapshots.reset_to(batch.target, &state.canonical);
        report.pushed.push(batch.target);
        report.outbox.push(batch);
    }

    fn finish(&self, state: &EngineState, mut report: PassReport) -> PassReport {
        report.version = state.canonical.version();
        tracing::debug!(
            "{:?} pass: observed={} emitted={} applied={} changed={} pushed={} version={}",
            report.kind,
            report.observed,
            report.emitted,
            report.applied,
            report.changed,
            report.pushed.len(),
            report.version
        );
        report
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnipack_core::{ItemId, ItemStack, MemoryReplica, StackLimitTable};

    const N: usize = 41;

    fn pid(b: u8) -> ParticipantId {
        ParticipantId::from_bytes([b; 16])
    }

    fn stone(count: u32) -> ItemStack {
        ItemStack::new("minecraft:stone", count)
    }

    fn engine() -> Reconciler {
        Reconciler::new(&InventoryConfig::default()).unwrap()
    }

    /// Two joined, synced, empty participants.
    fn pair(engine: &Reconciler) -> Vec<MemoryReplica> {
        let mut roster = vec![MemoryReplica::new(pid(1), N), MemoryReplica::new(pid(2), N)];
        engine.join(pid(1), &mut roster);
        engine.join(pid(2), &mut roster);
        roster
    }

    #[test]
    fn test_join_baselines_and_overwrites() {
        let engine = engine();
        let mut replica = MemoryReplica::new(pid(1), N);
        replica.set(0, stone(5));
        let mut roster = vec![replica];

        let report = engine.join(pid(1), &mut roster);

        assert_eq!(report.baselined, 1);
        assert_eq!(report.emitted, 0);
        assert!(!report.changed);
        assert_eq!(report.pushed, vec![pid(1)]);
        assert!(engine.canonical().is_empty());
        assert!(roster[0].slots().iter().all(ItemStack::is_empty));
    }

    #[test]
    fn test_join_matching_replica_is_not_pushed() {
        let engine = engine();
        let mut roster = vec![MemoryReplica::new(pid(1), N)];
        let report = engine.join(pid(1), &mut roster);
        assert!(report.pushed.is_empty());
        assert!(report.outbox.is_empty());
    }

    #[test]
    fn test_tick_merges_and_broadcasts() {
        let engine = engine();
        let mut roster = pair(&engine);

        roster[0].set(3, stone(10));
        let report = engine.tick(&mut roster);

        assert_eq!(report.emitted, 1);
        assert!(report.changed);
        assert_eq!(report.version, 1);
        assert_eq!(report.pushed, vec![pid(1), pid(2)]);
        assert_eq!(roster[1].get(3), Some(&stone(10)));
        assert_eq!(report.outbox.len(), 2);
        assert_eq!(report.outbox[1].messages.len(), N + 1);
    }

    #[test]
    fn test_tick_clamps_overfull_stack() {
        let engine = engine();
        let mut roster = pair(&engine);

        roster[0].set(3, stone(70));
        engine.tick(&mut roster);

        assert_eq!(engine.canonical().slots()[3], stone(64));
        assert_eq!(roster[0].get(3), Some(&stone(64)));
    }

    #[test]
    fn test_short_replica_keeps_out_of_reach_slots() {
        let engine = engine();
        let mut roster = vec![MemoryReplica::new(pid(1), N), MemoryReplica::new(pid(2), 36)];
        engine.join(pid(1), &mut roster);
        engine.join(pid(2), &mut roster);

        let shield = ItemStack::new("minecraft:shield", 1);
        roster[0].set(40, shield.clone());
        engine.tick(&mut roster);
        assert_eq!(engine.canonical().slots()[40], shield);

        let report = engine.tick(&mut roster);
        assert!(!report.changed);
        assert_eq!(report.emitted, 0);
        assert!(report.pushed.is_empty());
        assert_eq!(engine.canonical().slots()[40], shield);
        assert_eq!(engine.version(), 1);

        roster[1].set(35, stone(2));
        engine.tick(&mut roster);
        assert_eq!(engine.canonical().slots()[35], stone(2));
        assert_eq!(engine.canonical().slots()[40], shield);
    }

    #[test]
    fn test_quiet_ticks_do_nothing() {
        let engine = engine();
        let mut roster = pair(&engine);
        roster[0].set(3, stone(10));
        engine.tick(&mut roster);

        for _ in 0..3 {
            let report = engine.tick(&mut roster);
            assert!(!report.changed);
            assert_eq!(report.emitted, 0);
            assert!(report.pushed.is_empty());
            assert_eq!(report.version, 1);
        }
    }

    #[test]
    fn test_same_slot_conflict_last_processed_wins() {
        let engine = engine();
        let mut roster = pair(&engine);

        roster[0].set(5, stone(1));
        roster[1].set(5, ItemStack::new("minecraft:dirt", 2));
        let report = engine.tick(&mut roster);

        assert_eq!(report.emitted, 2);
        assert_eq!(engine.canonical().slots()[5], ItemStack::new("minecraft:dirt", 2));
        assert_eq!(roster[0].get(5), Some(&ItemStack::new("minecraft:dirt", 2)));
    }

    #[test]
    fn test_malformed_value_is_not_applied_and_gets_overwritten() {
        let engine = engine();
        let mut roster = pair(&engine);

        roster[0].set(1, ItemStack::new("Bad Id!", 1));
        let report = engine.tick(&mut roster);

        assert_eq!(report.malformed, 1);
        assert!(!report.changed);
        assert_eq!(report.pushed, vec![pid(1)]);
        assert!(roster[0].get(1).is_some_and(ItemStack::is_empty));
    }

    #[test]
    fn test_stale_participant_resynced_next_tick() {
        let engine = engine();
        let mut roster = pair(&engine);

        assert!(engine.mark_stale(&pid(2)));
        let report = engine.tick(&mut roster);
        assert_eq!(report.pushed, vec![pid(2)]);

        let report = engine.tick(&mut roster);
        assert!(report.pushed.is_empty());
    }

    #[test]
    fn test_after_action_observes_only_actor() {
        let engine = engine();
        let mut roster = pair(&engine);

        roster[0].set(0, stone(1));
        roster[1].set(1, stone(2));
        let report = engine.after_action(pid(1), &mut roster);

        assert_eq!(report.observed, 1);
        assert!(report.changed);
        assert_eq!(engine.canonical().slots()[0], stone(1));
        assert!(engine.canonical().slots()[1].is_empty());
        // The broadcast overwrote participant 2's unobserved edit.
        assert!(roster[1].get(1).is_some_and(ItemStack::is_empty));
    }

    #[test]
    fn test_leave_then_requests_still_apply() {
        let engine = engine();
        let mut roster = pair(&engine);
        let sender = engine.change_sender();

        sender.submit(SlotChangeRequest::new(pid(2), SlotIndex(7), stone(3)));
        assert!(engine.forget(&pid(2)));
        roster.retain(|r| r.participant() != pid(2));

        let report = engine.tick(&mut roster);
        assert_eq!(report.applied, 1);
        assert_eq!(report.pushed, vec![pid(1)]);
        assert_eq!(engine.canonical().slots()[7], stone(3));
    }

    #[test]
    fn test_external_submissions_drain_in_order() {
        let engine = engine();
        let mut roster = pair(&engine);
        let sender = engine.change_sender();

        sender.submit(SlotChangeRequest::new(pid(9), SlotIndex(0), stone(1)));
        sender.submit(SlotChangeRequest::new(pid(9), SlotIndex(0), stone(2)));
        sender.submit(SlotChangeRequest::new(pid(9), SlotIndex(999), stone(3)));

        let report = engine.tick(&mut roster);
        assert_eq!(report.applied, 3);
        assert_eq!(engine.canonical().slots()[0], stone(2));
        assert_eq!(report.version, 2);
    }

    #[test]
    fn test_custom_limit_lookup() {
        let limits = |item: &ItemId| if item.as_str() == "minecraft:ender_pearl" { 16 } else { 64 };
        let engine = engine().with_limits(Arc::new(limits));
        let mut roster = pair(&engine);

        roster[0].set(0, ItemStack::new("minecraft:ender_pearl", 20));
        engine.tick(&mut roster);
        assert_eq!(engine.canonical().slots()[0].count, 16);
    }

    #[test]
    fn test_with_canonical_adapts_length() {
        let mut config = InventoryConfig {
            slot_count: 4,
            stack_limits: StackLimitTable::new(16),
        };
        let canonical = CanonicalInventory::from_parts(vec![stone(1); 9], 5, 9);
        let engine = Reconciler::with_canonical(&config, canonical).unwrap();
        assert_eq!(engine.canonical().len(), 4);
        assert_eq!(engine.version(), 5);

        config.slot_count = 0;
        assert!(Reconciler::new(&config).is_err());
    }

    #[test]
    fn test_concurrent_passes_are_serialized() {
        let engine = Arc::new(engine());

        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let mut roster = vec![MemoryReplica::new(pid(100 + t), N)];
                    engine.join(pid(100 + t), &mut roster);
                    for i in 0..10u16 {
                        engine
                            .change_sender()
                            .submit(SlotChangeRequest::new(pid(t), SlotIndex(i), stone(u32::from(t) + 1)));
                        engine.tick(&mut roster);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let canonical = engine.canonical();
        assert!(canonical.slots()[..10].iter().all(|s| !s.is_empty()));
        assert_eq!(canonical.hash(), omnipack_core::content_hash(canonical.slots()));
    }
}
