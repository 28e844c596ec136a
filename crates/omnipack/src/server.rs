//! SharedInventory: the server-side facade.
//!
//! Ties the reconciliation engine to a participant roster, a transport and an
//! optional store. Hosts call in from their own event sources (player join,
//! player leave, scheduler tick, inbound packet); nothing here subscribes to
//! anything.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use omnipack_core::{CanonicalInventory, ContentHash, ParticipantId, Replica, StackLimits};
use omnipack_store::{InventoryStore, StoreExt};
use omnipack_sync::{
    deliver, ActionAck, ActionApplier, ActionRequest, PassReport, PushBatch, Reconciler,
    SyncErrorCode, SyncMessage, Transport, PROTOCOL_VERSION,
};

use crate::config::SharedInventoryConfig;
use crate::error::{Result, SharedInventoryError};

/// One shared inventory served to many participants.
pub struct SharedInventory<S: InventoryStore, T: Transport, R: Replica> {
    config: SharedInventoryConfig,
    store: Arc<S>,
    transport: T,
    engine: Reconciler,
    /// Connected participants' replicas, in join order.
    roster: Mutex<Vec<R>>,
    /// Held from the end of a pass until its outbox is delivered, so pushes
    /// leave in pass order.
    delivery: Mutex<()>,
    /// Canonical version at the last successful save.
    persisted_version: AtomicU64,
}

impl<S, T, R> SharedInventory<S, T, R>
where
    S: InventoryStore,
    T: Transport,
    R: Replica + Send,
{
    /// Load canonical state for the configured environment and start serving.
    ///
    /// A missing record starts from an all-empty inventory at version 0.
    pub async fn open(config: SharedInventoryConfig, store: S, transport: T) -> Result<Self> {
        config.validate()?;

        let canonical = store
            .load_canonical(&config.environment_id, config.inventory.slot_count)
            .await?;
        tracing::info!(
            "opened shared inventory {} at version {} ({} slots)",
            config.environment_id,
            canonical.version(),
            canonical.len()
        );

        let persisted_version = AtomicU64::new(canonical.version());
        let engine = Reconciler::with_canonical(&config.inventory, canonical)?;

        Ok(Self {
            config,
            store: Arc::new(store),
            transport,
            engine,
            roster: Mutex::new(Vec::new()),
            delivery: Mutex::new(()),
            persisted_version,
        })
    }

    /// Replace the maximum-stack lookup (e.g. with the game's item registry).
    pub fn with_limits(mut self, limits: Arc<dyn StackLimits>) -> Self {
        self.engine = self.engine.with_limits(limits);
        self
    }

    pub fn config(&self) -> &SharedInventoryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn engine(&self) -> &Reconciler {
        &self.engine
    }

    /// Copy of the current canonical state.
    pub fn canonical(&self) -> CanonicalInventory {
        self.engine.canonical()
    }

    pub fn version(&self) -> u64 {
        self.engine.version()
    }

    pub fn hash(&self) -> ContentHash {
        self.engine.hash()
    }

    /// Connected participants in join order.
    pub async fn participants(&self) -> Vec<ParticipantId> {
        self.roster
            .lock()
            .await
            .iter()
            .map(Replica::participant)
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a participant's replica and run the post-join sync.
    ///
    /// Whatever the replica held on arrival is not merged; it is overwritten
    /// with canonical state.
    pub async fn join(&self, replica: R) -> Result<PassReport> {
        let participant = replica.participant();
        let expected = self.engine.slot_count();
        if replica.slot_count() < expected {
            return Err(SharedInventoryError::SlotCountMismatch {
                participant,
                expected,
                actual: replica.slot_count(),
            });
        }

        let (report, _delivery) = {
            let mut roster = self.roster.lock().await;
            if roster.iter().any(|r| r.participant() == participant) {
                return Err(SharedInventoryError::AlreadyJoined(participant));
            }
            roster.push(replica);
            let report = self.engine.join(participant, roster.as_mut_slice());
            (report, self.delivery.lock().await)
        };

        tracing::info!("{} joined shared inventory {}", participant, self.config.environment_id);
        self.deliver(&report.outbox).await;
        Ok(report)
    }

    /// Remove a participant. Returns its replica if it was connected.
    pub async fn leave(&self, participant: &ParticipantId) -> Option<R> {
        let removed = {
            let mut roster = self.roster.lock().await;
            let index = roster.iter().position(|r| r.participant() == *participant);
            index.map(|i| roster.remove(i))
        };
        self.engine.forget(participant);

        if removed.is_some() {
            tracing::info!("{} left shared inventory {}", participant, self.config.environment_id);
        }
        removed
    }

    async fn is_joined(&self, participant: &ParticipantId) -> bool {
        self.roster
            .lock()
            .await
            .iter()
            .any(|r| r.participant() == *participant)
    }

    /// Push canonical state to one participant (respawn, dimension change...).
    pub async fn resync(&self, participant: ParticipantId) -> PassReport {
        let (report, _delivery) = {
            let mut roster = self.roster.lock().await;
            let report = self.engine.resync(participant, roster.as_mut_slice());
            (report, self.delivery.lock().await)
        };
        self.deliver(&report.outbox).await;
        report
    }

    /// Force a resync of this participant on the next tick.
    pub fn mark_stale(&self, participant: &ParticipantId) -> bool {
        self.engine.mark_stale(participant)
    }

    /// Run a closure against one connected replica.
    pub async fn with_replica<F, U>(&self, participant: &ParticipantId, f: F) -> Option<U>
    where
        F: FnOnce(&mut R) -> U,
    {
        let mut roster = self.roster.lock().await;
        roster
            .iter_mut()
            .find(|r| r.participant() == *participant)
            .map(f)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    /// One periodic reconciliation pass.
    pub async fn tick(&self) -> PassReport {
        let (report, _delivery) = {
            let mut roster = self.roster.lock().await;
            let report = self.engine.tick(roster.as_mut_slice());
            (report, self.delivery.lock().await)
        };
        self.deliver(&report.outbox).await;
        report
    }

    /// Handle an Action Request from `actor` and answer with one acknowledgement.
    ///
    /// Pushes caused by the action go out before the acknowledgement.
    pub async fn handle_action<A>(
        &self,
        actor: ParticipantId,
        request: ActionRequest,
        applier: &mut A,
    ) -> ActionAck
    where
        A: ActionApplier<R> + ?Sized,
    {
        let (outcome, _delivery) = {
            let mut roster = self.roster.lock().await;
            let outcome = self
                .engine
                .handle_action(actor, request, roster.as_mut_slice(), applier);
            (outcome, self.delivery.lock().await)
        };

        if let Some(report) = &outcome.report {
            self.deliver(&report.outbox).await;
        }
        if let Err(e) = self.transport.send(&actor, SyncMessage::Ack(outcome.ack)).await {
            tracing::warn!("ack to {} failed: {}", actor, e);
        }
        outcome.ack
    }

    /// Receive and handle one inbound message.
    ///
    /// Returns false if nothing arrived within the configured timeout.
    pub async fn serve_one<A>(&self, applier: &mut A) -> Result<bool>
    where
        A: ActionApplier<R> + ?Sized,
    {
        let timeout = self.config.sync.message_timeout;
        let Some((from, message)) = self.transport.recv_timeout(timeout).await? else {
            return Ok(false);
        };

        let reply = match message {
            SyncMessage::Hello {
                protocol_version, ..
            } => {
                if protocol_version == PROTOCOL_VERSION {
                    SyncMessage::Hello {
                        participant: self.transport.local_id(),
                        protocol_version: PROTOCOL_VERSION,
                    }
                } else {
                    tracing::warn!(
                        "{} speaks protocol {}, expected {}",
                        from,
                        protocol_version,
                        PROTOCOL_VERSION
                    );
                    SyncMessage::Error {
                        code: SyncErrorCode::VersionMismatch,
                        message: format!("expected protocol version {}", PROTOCOL_VERSION),
                    }
                }
            }
            SyncMessage::Action(request) => {
                if self.is_joined(&from).await {
                    self.handle_action(from, request, applier).await;
                    return Ok(true);
                }
                tracing::warn!("action from {} who has not joined", from);
                SyncMessage::Error {
                    code: SyncErrorCode::NotRegistered,
                    message: "join before sending actions".into(),
                }
            }
            SyncMessage::Error { code, message } => {
                tracing::warn!("{} reported {:?}: {}", from, code, message);
                return Ok(true);
            }
            other => {
                tracing::debug!("unexpected {} from {}", other.kind(), from);
                SyncMessage::Error {
                    code: SyncErrorCode::InvalidMessage,
                    message: format!("{} is server-to-participant only", other.kind()),
                }
            }
        };

        if let Err(e) = self.transport.send(&from, reply).await {
            tracing::warn!("reply to {} failed: {}", from, e);
        }
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Save canonical state if it changed since the last save.
    ///
    /// Returns whether anything was written.
    pub async fn persist(&self) -> Result<bool> {
        let canonical = self.engine.canonical();
        if canonical.version() == self.persisted_version.load(Ordering::Acquire) {
            return Ok(false);
        }

        self.store
            .save_canonical(&self.config.environment_id, &canonical)
            .await?;
        self.persisted_version
            .store(canonical.version(), Ordering::Release);
        tracing::info!(
            "persisted {} at version {}",
            self.config.environment_id,
            canonical.version()
        );
        Ok(true)
    }

    /// Deliver push batches; failed targets are resynced on the next tick.
    async fn deliver(&self, outbox: &[PushBatch]) {
        if outbox.is_empty() {
            return;
        }
        let report = deliver(&self.transport, outbox.to_vec()).await;
        for failed in &report.failed {
            self.engine.mark_stale(failed);
        }
    }
}

impl<S, T, R> SharedInventory<S, T, R>
where
    S: InventoryStore + 'static,
    T: Transport + 'static,
    R: Replica + Send + 'static,
{
    /// Run periodic passes on a tokio interval until the handle is aborted.
    ///
    /// Missed ticks are skipped rather than bursted, so passes never pile up.
    pub fn spawn_tick_loop(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = Duration::from_millis(self.config.tick_interval_ms);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let persist_every = self.config.persist_every_ticks;
            let mut ticks: u64 = 0;

            loop {
                interval.tick().await;
                self.tick().await;
                ticks += 1;

                if persist_every > 0 && ticks % persist_every == 0 {
                    if let Err(e) = self.persist().await {
                        tracing::warn!("periodic persist failed: {}", e);
                    }
                }
            }
        })
    }
}
