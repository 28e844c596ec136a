//! Action Request Channel, server side.
//!
//! A participant asks for one discrete action. The server checks the request
//! structurally, lets an external [`ActionApplier`] perform the action on the
//! actor's replica, runs the immediate reconciliation pass, and answers with
//! exactly one [`ActionAck`]. The acknowledgement only says whether the
//! request was well formed; the pushes that follow are the real result.

use thiserror::Error;

use omnipack_core::{ParticipantId, Replica, SlotIndex, ValidationError};

use crate::engine::{PassReport, Reconciler};
use crate::messages::{ActionAck, ActionRequest, InteractionKind};

/// An action that passed structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedAction {
    pub slot: SlotIndex,
    pub button: i32,
    pub kind: InteractionKind,
}

/// Check the slot index against `[0, slot_count)` and clamp the kind code.
pub fn validate_action(
    request: &ActionRequest,
    slot_count: usize,
) -> Result<ValidatedAction, ValidationError> {
    let slot = SlotIndex::from_wire(request.slot_index, slot_count)?;
    let kind = InteractionKind::from_code(request.interaction_kind);
    if kind.code() != request.interaction_kind {
        tracing::debug!(
            "interaction code {} clamped to {:?}",
            request.interaction_kind,
            kind
        );
    }
    Ok(ValidatedAction {
        slot,
        button: request.button,
        kind,
    })
}

/// Failure reported by an [`ActionApplier`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("action could not be applied: {0}")]
pub struct ApplyError(pub String);

/// Performs an action's semantic effect (move, split, swap...) on a replica.
pub trait ActionApplier<R: ?Sized> {
    fn apply(&mut self, replica: &mut R, action: &ValidatedAction) -> Result<(), ApplyError>;
}

impl<R: ?Sized, F> ActionApplier<R> for F
where
    F: FnMut(&mut R, &ValidatedAction) -> Result<(), ApplyError>,
{
    fn apply(&mut self, replica: &mut R, action: &ValidatedAction) -> Result<(), ApplyError> {
        self(replica, action)
    }
}

/// Result of handling one Action Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub ack: ActionAck,
    /// The immediate pass, when one ran.
    pub report: Option<PassReport>,
}

impl ActionOutcome {
    fn rejected(slot_index: i32) -> Self {
        Self {
            ack: ActionAck {
                accepted: false,
                slot_index,
            },
            report: None,
        }
    }
}

impl Reconciler {
    /// Handle one Action Request from `actor`.
    ///
    /// Invalid requests and unknown actors are rejected without touching any
    /// state. A failing applier is logged and the request is still accepted:
    /// the immediate pass then simply finds nothing to merge.
    pub fn handle_action<R, A>(
        &self,
        actor: ParticipantId,
        request: ActionRequest,
        replicas: &mut [R],
        applier: &mut A,
    ) -> ActionOutcome
    where
        R: Replica,
        A: ActionApplier<R> + ?Sized,
    {
        let action = match validate_action(&request, self.slot_count()) {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!("rejecting action from {}: {}", actor, e);
                return ActionOutcome::rejected(request.slot_index);
            }
        };

        let Some(replica) = replicas.iter_mut().find(|r| r.participant() == actor) else {
            tracing::warn!("rejecting action from unregistered participant {}", actor);
            return ActionOutcome::rejected(request.slot_index);
        };

        if let Err(e) = applier.apply(replica, &action) {
            tracing::warn!("applying {:?} for {}: {}", action.kind, actor, e);
        }

        let report = self.after_action(actor, replicas);
        ActionOutcome {
            ack: ActionAck {
                accepted: true,
                slot_index: request.slot_index,
            },
            report: Some(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnipack_core::{InventoryConfig, ItemStack, MemoryReplica};

    const N: usize = 41;

    fn pid(b: u8) -> ParticipantId {
        ParticipantId::from_bytes([b; 16])
    }

    fn setup() -> (Reconciler, Vec<MemoryReplica>) {
        let engine = Reconciler::new(&InventoryConfig::default()).unwrap();
        let mut roster = vec![MemoryReplica::new(pid(1), N), MemoryReplica::new(pid(2), N)];
        engine.join(pid(1), &mut roster);
        engine.join(pid(2), &mut roster);
        (engine, roster)
    }

    fn put_stone(replica: &mut MemoryReplica, action: &ValidatedAction) -> Result<(), ApplyError> {
        replica.set(action.slot.as_usize(), ItemStack::new("minecraft:stone", 8));
        Ok(())
    }

    #[test]
    fn test_validate_action() {
        let ok = validate_action(&ActionRequest::new(40, 0, InteractionKind::Swap), N).unwrap();
        assert_eq!(ok.slot, SlotIndex(40));
        assert_eq!(ok.kind, InteractionKind::Swap);

        assert!(validate_action(&ActionRequest::new(-1, 0, InteractionKind::Pickup), N).is_err());
        assert!(validate_action(&ActionRequest::new(41, 0, InteractionKind::Pickup), N).is_err());

        let clamped = validate_action(
            &ActionRequest {
                slot_index: 0,
                button: 0,
                interaction_kind: 77,
            },
            N,
        )
        .unwrap();
        assert_eq!(clamped.kind, InteractionKind::PickupAll);
    }

    #[test]
    fn test_negative_slot_rejected_without_mutation() {
        let (engine, mut roster) = setup();
        let before = engine.canonical();
        let mut calls = 0;
        let mut applier = |_: &mut MemoryReplica, _: &ValidatedAction| -> Result<(), ApplyError> {
            calls += 1;
            Ok(())
        };

        let outcome = engine.handle_action(
            pid(1),
            ActionRequest::new(-1, 0, InteractionKind::Pickup),
            &mut roster,
            &mut applier,
        );

        assert_eq!(
            outcome.ack,
            ActionAck {
                accepted: false,
                slot_index: -1
            }
        );
        assert!(outcome.report.is_none());
        assert_eq!(calls, 0);
        assert_eq!(engine.canonical(), before);
    }

    #[test]
    fn test_action_applies_and_broadcasts() {
        let (engine, mut roster) = setup();

        let outcome = engine.handle_action(
            pid(1),
            ActionRequest::new(12, 0, InteractionKind::Pickup),
            &mut roster,
            &mut put_stone,
        );

        assert!(outcome.ack.accepted);
        assert_eq!(outcome.ack.slot_index, 12);
        let report = outcome.report.unwrap();
        assert!(report.changed);
        assert_eq!(report.pushed, vec![pid(1), pid(2)]);
        assert_eq!(roster[1].get(12), Some(&ItemStack::new("minecraft:stone", 8)));
    }

    #[test]
    fn test_failing_applier_still_accepted() {
        let (engine, mut roster) = setup();
        let mut applier = |_: &mut MemoryReplica, _: &ValidatedAction| -> Result<(), ApplyError> {
            Err(ApplyError("no cursor".into()))
        };

        let outcome = engine.handle_action(
            pid(2),
            ActionRequest::new(0, 1, InteractionKind::QuickMove),
            &mut roster,
            &mut applier,
        );

        assert!(outcome.ack.accepted);
        assert!(!outcome.report.unwrap().changed);
        assert_eq!(engine.version(), 0);
    }

    #[test]
    fn test_unknown_actor_rejected() {
        let (engine, mut roster) = setup();
        let outcome = engine.handle_action(
            pid(9),
            ActionRequest::new(0, 0, InteractionKind::Pickup),
            &mut roster,
            &mut put_stone,
        );
        assert!(!outcome.ack.accepted);
        assert_eq!(engine.version(), 0);
    }
}
