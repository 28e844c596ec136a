//! # Omnipack Sync
//!
//! Server-authoritative reconciliation of one shared inventory across many
//! participant replicas.
//!
//! ## Overview
//!
//! Each participant can change their own replica at any time. The
//! [`Reconciler`] notices those changes by comparing each replica with the
//! snapshot it took last time, turns every differing slot into a
//! [`SlotChangeRequest`], applies the queued requests to canonical state in
//! FIFO order (last write wins per slot), and writes canonical state back
//! into the replicas.
//!
//! ## Key Properties
//!
//! - **Authoritative**: canonical state only changes by draining requests
//! - **Serialized**: passes never overlap; a second caller waits for the guard
//! - **Tolerant**: malformed values are logged and skipped, never abort a pass
//! - **No I/O under the guard**: pushes are returned as an outbox to deliver
//!
//! ## Usage
//!
//! ```rust,no_run
//! use omnipack_core::{InventoryConfig, MemoryReplica, ParticipantId};
//! use omnipack_sync::{deliver, Reconciler, Transport};
//!
//! async fn example<T: Transport>(transport: &T) {
//!     let engine = Reconciler::new(&InventoryConfig::default()).unwrap();
//!     let alice = ParticipantId::random();
//!     let mut roster = vec![MemoryReplica::new(alice, 41)];
//!
//!     engine.join(alice, &mut roster);
//!
//!     // On every tick:
//!     let report = engine.tick(&mut roster);
//!     let delivery = deliver(transport, report.outbox).await;
//!     for failed in delivery.failed {
//!         engine.mark_stale(&failed);
//!     }
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Participant                         Server
//!   |-------- Hello ------------------>|
//!   |<------- Hello -------------------|
//!   |-------- Action ----------------->|  apply, immediate pass
//!   |<------- SlotUpdate x N ----------|  (to every participant if changed)
//!   |<------- Synced ------------------|
//!   |<------- Ack ---------------------|
//! ```

pub mod action;
pub mod client;
pub mod config;
pub mod convergence;
pub mod engine;
pub mod error;
pub mod messages;
pub mod push;
pub mod queue;
pub mod snapshots;
pub mod transport;

pub use action::{validate_action, ActionApplier, ActionOutcome, ApplyError, ValidatedAction};
pub use client::ActionClient;
pub use config::SyncConfig;
pub use convergence::{all_converged, verify_all, verify_replica, verify_slots, ConvergenceResult};
pub use engine::{PassKind, PassReport, Reconciler};
pub use error::{Result, SyncError};
pub use messages::{
    limits, ActionAck, ActionRequest, InteractionKind, SyncErrorCode, SyncMessage,
    PROTOCOL_VERSION,
};
pub use push::{deliver, push_frames, push_to_replica, DeliveryReport, PushBatch};
pub use queue::{change_queue, ChangeReceiver, ChangeSender, SlotChangeRequest};
pub use snapshots::{ReplicaSnapshot, SnapshotCache};
pub use transport::{memory::MemoryNetwork, memory::MemoryTransport, Transport};
