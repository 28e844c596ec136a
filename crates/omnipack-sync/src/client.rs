//! Action Request Channel, participant side.
//!
//! Requests made before the registration handshake completes are buffered and
//! flushed in FIFO order as soon as the server's Hello arrives. They are never
//! dropped. The client also keeps a mirror of the slots the server pushed.

use std::collections::VecDeque;

use omnipack_core::{content_hash, ContentHash, ItemStack, ParticipantId};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::messages::{ActionAck, ActionRequest, SyncMessage, PROTOCOL_VERSION};
use crate::transport::Transport;

/// A participant's connection to the server's Action Request Channel.
pub struct ActionClient<T: Transport> {
    transport: T,
    server: ParticipantId,
    config: SyncConfig,
    registered: bool,
    pending: VecDeque<ActionRequest>,
    mirror: Vec<ItemStack>,
    last_synced: Option<(u64, ContentHash)>,
    last_ack: Option<ActionAck>,
}

impl<T: Transport> ActionClient<T> {
    pub fn new(transport: T, server: ParticipantId, slot_count: usize, config: SyncConfig) -> Self {
        Self {
            transport,
            server,
            config,
            registered: false,
            pending: VecDeque::new(),
            mirror: vec![ItemStack::empty(); slot_count],
            last_synced: None,
            last_ack: None,
        }
    }

    /// Start the registration handshake.
    pub async fn hello(&self) -> Result<()> {
        self.transport
            .send(
                &self.server,
                SyncMessage::Hello {
                    participant: self.transport.local_id(),
                    protocol_version: PROTOCOL_VERSION,
                },
            )
            .await
    }

    /// Send a request now, or queue it until it can be sent.
    ///
    /// Returns true if it went out immediately. Anything already queued goes
    /// first, so ordering is preserved.
    pub async fn send_or_queue(&mut self, request: ActionRequest) -> bool {
        if self.registered && !self.pending.is_empty() {
            if let Err(e) = self.flush().await {
                tracing::debug!("{} queued requests still unsent: {}", self.pending.len(), e);
            }
        }

        if self.registered && self.pending.is_empty() {
            match self.send_action(request).await {
                Ok(()) => return true,
                Err(e) => tracing::warn!("action send failed, queueing: {}", e),
            }
        }

        self.pending.push_back(request);
        if self.pending.len() > self.config.pending_warn_threshold {
            tracing::warn!("{} action requests waiting for the server", self.pending.len());
        }
        false
    }

    /// Send queued requests in FIFO order.
    ///
    /// Stops at the first failure, leaving it and everything after it queued.
    pub async fn flush(&mut self) -> Result<usize> {
        let mut sent = 0;
        while let Some(request) = self.pending.front().copied() {
            self.send_action(request).await?;
            self.pending.pop_front();
            sent += 1;
        }
        if sent > 0 {
            tracing::debug!("flushed {} queued action requests", sent);
        }
        Ok(sent)
    }

    /// Process one message from the server.
    pub async fn handle(&mut self, from: ParticipantId, message: SyncMessage) -> Result<()> {
        if from != self.server {
            tracing::debug!("ignoring {} from non-server peer {}", message.kind(), from);
            return Ok(());
        }

        match message {
            SyncMessage::Hello {
                protocol_version, ..
            } => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(SyncError::VersionMismatch {
                        local: PROTOCOL_VERSION,
                        peer: protocol_version,
                    });
                }
                self.registered = true;
                self.flush().await?;
            }
            SyncMessage::SlotUpdate { slot_index, item } => {
                let slot = usize::try_from(slot_index)
                    .ok()
                    .and_then(|i| self.mirror.get_mut(i));
                match slot {
                    Some(slot) => *slot = item,
                    None => tracing::warn!("slot update for out-of-range slot {}", slot_index),
                }
            }
            SyncMessage::Synced {
                version,
                content_hash: expected,
            } => {
                if content_hash(&self.mirror) != expected {
                    tracing::warn!("mirror does not match pushed state at version {}", version);
                }
                self.last_synced = Some((version, expected));
            }
            SyncMessage::Ack(ack) => {
                tracing::debug!("action on slot {} accepted={}", ack.slot_index, ack.accepted);
                self.last_ack = Some(ack);
            }
            SyncMessage::Error { code, message } => {
                return Err(SyncError::PeerError { code, message });
            }
            SyncMessage::Action(_) => {
                tracing::warn!("server sent an action request; ignoring");
            }
        }
        Ok(())
    }

    /// Wait for and process one message. Returns false on timeout.
    pub async fn poll(&mut self) -> Result<bool> {
        match self
            .transport
            .recv_timeout(self.config.message_timeout)
            .await?
        {
            Some((from, message)) => {
                self.handle(from, message).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The connection dropped; queue requests until the next handshake.
    pub fn on_disconnect(&mut self) {
        self.registered = false;
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Slots as last pushed by the server.
    pub fn mirror(&self) -> &[ItemStack] {
        &self.mirror
    }

    /// Whether the mirror matches the last completed push.
    pub fn is_in_sync(&self) -> bool {
        self.last_synced
            .is_some_and(|(_, hash)| content_hash(&self.mirror) == hash)
    }

    pub fn last_synced(&self) -> Option<(u64, ContentHash)> {
        self.last_synced
    }

    pub fn last_ack(&self) -> Option<ActionAck> {
        self.last_ack
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send_action(&self, request: ActionRequest) -> Result<()> {
        self.transport
            .send(&self.server, SyncMessage::Action(request))
            .await
    }
}
