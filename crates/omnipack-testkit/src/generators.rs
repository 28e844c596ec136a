//! Proptest generators for property-based testing.

use proptest::prelude::*;

use omnipack_core::{ItemId, ItemStack, MemoryReplica, ParticipantId};

use crate::fixtures::EngineFixture;

/// Item ids drawn from a small pool so that collisions are common.
pub fn item_id() -> impl Strategy<Value = ItemId> {
    prop_oneof![
        Just(ItemId::new("minecraft:stone")),
        Just(ItemId::new("minecraft:dirt")),
        Just(ItemId::new("minecraft:ender_pearl")),
        Just(ItemId::new("minecraft:diamond_sword")),
        "[a-z]{1,8}:[a-z_]{1,12}".prop_map(ItemId::new),
    ]
}

/// Component bytes, usually empty.
pub fn components() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        3 => Just(Vec::new()),
        1 => prop::collection::vec(any::<u8>(), 1..16),
    ]
}

/// A non-empty stack whose count may exceed its maximum.
pub fn item_stack(max_count: u32) -> impl Strategy<Value = ItemStack> {
    (item_id(), 1..=max_count, components())
        .prop_map(|(id, count, comps)| ItemStack::new(id, count).with_components(comps))
}

/// A slot value: empty or a stack.
pub fn slot_value() -> impl Strategy<Value = ItemStack> {
    prop_oneof![
        1 => Just(ItemStack::empty()),
        3 => item_stack(100),
    ]
}

/// Full replica contents.
pub fn slot_contents(slot_count: usize) -> impl Strategy<Value = Vec<ItemStack>> {
    prop::collection::vec(slot_value(), slot_count)
}

/// A replica with arbitrary contents.
pub fn replica(id: ParticipantId, slot_count: usize) -> impl Strategy<Value = MemoryReplica> {
    slot_contents(slot_count).prop_map(move |slots| MemoryReplica::with_slots(id, slots))
}

/// One thing that can happen between observations.
#[derive(Debug, Clone)]
pub enum Step {
    /// A participant edits its own replica locally.
    Edit {
        participant: usize,
        slot: usize,
        stack: ItemStack,
    },
    /// A participant sends an Action Request (possibly out of range).
    Action {
        participant: usize,
        slot_index: i32,
        count: i32,
    },
    /// Periodic pass.
    Tick,
}

/// Generate a step for `participants` participants over `slot_count` slots.
pub fn step(participants: usize, slot_count: usize) -> impl Strategy<Value = Step> {
    let slot_range = -1..=(slot_count as i32);
    prop_oneof![
        4 => (0..participants, 0..slot_count, slot_value()).prop_map(|(participant, slot, stack)| {
            Step::Edit { participant, slot, stack }
        }),
        2 => (0..participants, slot_range, 0..80i32).prop_map(|(participant, slot_index, count)| {
            Step::Action { participant, slot_index, count }
        }),
        1 => Just(Step::Tick),
    ]
}

/// Apply a step to a fixture.
pub fn apply_step(fixture: &mut EngineFixture, step: &Step) {
    match step {
        Step::Edit {
            participant,
            slot,
            stack,
        } => fixture.edit(*participant, *slot, stack.clone()),
        Step::Action {
            participant,
            slot_index,
            count,
        } => {
            fixture.act(
                *participant,
                omnipack_sync::ActionRequest {
                    slot_index: *slot_index,
                    button: *count,
                    interaction_kind: 0,
                },
            );
        }
        Step::Tick => {
            fixture.tick();
        }
    }
}
