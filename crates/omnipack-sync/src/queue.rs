//! Slot Change Request queue.
//!
//! Diff detection hands requests to the drain through this multiple-producer,
//! single-consumer queue instead of touching canonical state directly. The
//! receiver lives inside the engine's guarded state, so only one drain can
//! run at a time; senders are cheap to clone and usable from any thread.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use omnipack_core::{ItemStack, ParticipantId, SlotIndex};

/// "This participant's replica now holds `stack` in `slot`."
///
/// Consumed exactly once by a drain, then discarded. Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChangeRequest {
    pub participant: ParticipantId,
    pub slot: SlotIndex,
    pub stack: ItemStack,
    /// Milliseconds since the Unix epoch at emission.
    pub timestamp_ms: u64,
}

impl SlotChangeRequest {
    pub fn new(participant: ParticipantId, slot: SlotIndex, stack: ItemStack) -> Self {
        Self {
            participant,
            slot,
            stack,
            timestamp_ms: now_millis(),
        }
    }
}

/// Producer half. Clone freely.
#[derive(Debug, Clone)]
pub struct ChangeSender {
    tx: mpsc::UnboundedSender<SlotChangeRequest>,
}

impl ChangeSender {
    /// Enqueue a request. Returns false if the engine is gone.
    pub fn submit(&self, request: SlotChangeRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

/// Consumer half, owned by the engine.
#[derive(Debug)]
pub struct ChangeReceiver {
    rx: mpsc::UnboundedReceiver<SlotChangeRequest>,
}

impl ChangeReceiver {
    /// Take everything currently queued, in emission order.
    pub fn drain(&mut self) -> Vec<SlotChangeRequest> {
        let mut drained = Vec::new();
        while let Ok(request) = self.rx.try_recv() {
            drained.push(request);
        }
        drained
    }
}

/// Create a connected sender/receiver pair.
pub fn change_queue() -> (ChangeSender, ChangeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChangeSender { tx }, ChangeReceiver { rx })
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
