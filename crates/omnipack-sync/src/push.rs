//! Broadcast/Sync Pusher.
//!
//! Pushing is split in two: the engine writes canonical state into a replica
//! and queues the matching messages while it holds its guard, and the caller
//! delivers them over the transport afterwards. Delivery never happens under
//! the guard.

use omnipack_core::{CanonicalInventory, ParticipantId, Replica};

use crate::messages::SyncMessage;
use crate::transport::Transport;

/// Messages queued for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushBatch {
    pub target: ParticipantId,
    pub messages: Vec<SyncMessage>,
}

/// Full-state push: one `SlotUpdate` per slot, then a `Synced` marker.
pub fn push_frames(canonical: &CanonicalInventory) -> Vec<SyncMessage> {
    let mut frames: Vec<SyncMessage> = canonical
        .slots()
        .iter()
        .enumerate()
        .map(|(index, stack)| SyncMessage::SlotUpdate {
            slot_index: index as i32,
            item: stack.clone(),
        })
        .collect();
    frames.push(SyncMessage::Synced {
        version: canonical.version(),
        content_hash: canonical.hash(),
    });
    frames
}

/// Write canonical state into a replica and build its push batch.
pub fn push_to_replica<R: Replica + ?Sized>(
    canonical: &CanonicalInventory,
    replica: &mut R,
) -> PushBatch {
    canonical.write_to_replica(replica);
    PushBatch {
        target: replica.participant(),
        messages: push_frames(canonical),
    }
}

/// Outcome of delivering push batches.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Participants that received their whole batch.
    pub delivered: Vec<ParticipantId>,
    /// Participants whose batch was cut short.
    pub failed: Vec<ParticipantId>,
}

impl DeliveryReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Send each batch over the transport.
///
/// A failure stops that participant's batch, is logged, and is reported; it
/// never affects other participants and is never retried here.
pub async fn deliver<T: Transport + ?Sized>(transport: &T, batches: Vec<PushBatch>) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for batch in batches {
        let target = batch.target;
        let mut ok = true;
        for message in batch.messages {
            if let Err(e) = transport.send(&target, message).await {
                tracing::warn!("push to {} failed: {}", target, e);
                ok = false;
                break;
            }
        }
        if ok {
            report.delivered.push(target);
        } else {
            report.failed.push(target);
        }
    }

    report
}
