//! Transport abstraction for participant/server messaging.
//!
//! The transport delivers opaque messages between a participant and the
//! server. Implementations may use the game's packet layer, WebSockets, or
//! anything else; the engine only needs addressed send and receive.

use async_trait::async_trait;

use omnipack_core::ParticipantId;

use crate::error::{Result, SyncError};
use crate::messages::SyncMessage;

/// Transport trait for sending and receiving sync messages.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to a specific peer.
    async fn send(&self, peer: &ParticipantId, message: SyncMessage) -> Result<()>;

    /// Receive the next message from any peer.
    ///
    /// Returns the sender's id and the message.
    async fn recv(&self) -> Result<(ParticipantId, SyncMessage)>;

    /// Receive with timeout.
    ///
    /// Returns None if timeout expires before a message arrives.
    async fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Option<(ParticipantId, SyncMessage)>>;

    /// Get the local endpoint's identity.
    fn local_id(&self) -> ParticipantId;
}

/// A simple in-memory transport for testing.
///
/// Uses channels to simulate message passing between endpoints.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex, RwLock};

    /// Message envelope for internal routing.
    #[derive(Debug, Clone)]
    struct Envelope {
        from: ParticipantId,
        message: SyncMessage,
    }

    /// Shared state for the memory transport network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        senders: RwLock<HashMap<ParticipantId, mpsc::Sender<Envelope>>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport connected to this network.
        pub async fn create_transport(self: &Arc<Self>, id: ParticipantId) -> MemoryTransport {
            let (tx, rx) = mpsc::channel(4096);

            self.senders.write().await.insert(id, tx);

            MemoryTransport {
                id,
                network: Arc::clone(self),
                receiver: Mutex::new(rx),
            }
        }

        /// Drop an endpoint from the network. Later sends to it fail.
        pub async fn disconnect(&self, id: &ParticipantId) -> bool {
            self.senders.write().await.remove(id).is_some()
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        id: ParticipantId,
        network: Arc<MemoryNetwork>,
        receiver: Mutex<mpsc::Receiver<Envelope>>,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, peer: &ParticipantId, message: SyncMessage) -> Result<()> {
            let sender = {
                let senders = self.network.senders.read().await;
                senders
                    .get(peer)
                    .cloned()
                    .ok_or(SyncError::PeerNotConnected(*peer))?
            };
            let envelope = Envelope {
                from: self.id,
                message,
            };
            sender
                .send(envelope)
                .await
                .map_err(|_| SyncError::TransportError("peer disconnected".into()))
        }

        async fn recv(&self) -> Result<(ParticipantId, SyncMessage)> {
            let mut rx = self.receiver.lock().await;
            match rx.recv().await {
                Some(envelope) => Ok((envelope.from, envelope.message)),
                None => Err(SyncError::TransportError("channel closed".into())),
            }
        }

        async fn recv_timeout(
            &self,
            timeout: std::time::Duration,
        ) -> Result<Option<(ParticipantId, SyncMessage)>> {
            let mut rx = self.receiver.lock().await;
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(envelope)) => Ok(Some((envelope.from, envelope.message))),
                Ok(None) => Err(SyncError::TransportError("channel closed".into())),
                Err(_) => Ok(None),
            }
        }

        fn local_id(&self) -> ParticipantId {
            self.id
        }
    }
}
