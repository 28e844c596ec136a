//! Test fixtures and helpers.
//!
//! Common setup code for engine-level and server-level tests.

use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use omnipack::{SharedInventory, SharedInventoryConfig};
use omnipack_core::{
    CanonicalInventory, InventoryConfig, ItemId, ItemStack, MemoryReplica, ParticipantId, Replica,
    StackLimitTable,
};
use omnipack_store::MemoryStore;
use omnipack_sync::{
    all_converged, ActionApplier, ActionOutcome, ActionRequest, ApplyError, MemoryNetwork,
    MemoryTransport, PassReport, Reconciler, SyncMessage, Transport, ValidatedAction,
};

/// Default shared inventory size.
pub const SLOT_COUNT: usize = 41;

/// The id used for the server endpoint in server fixtures.
pub const SERVER_ID: ParticipantId = ParticipantId::from_bytes([0xFF; 16]);

/// Item ids used by randomized fixtures.
pub const ITEMS: [&str; 4] = [
    "minecraft:stone",
    "minecraft:dirt",
    "minecraft:ender_pearl",
    "minecraft:diamond",
];

/// Deterministic participant id.
pub fn participant(n: u8) -> ParticipantId {
    let mut bytes = [0u8; 16];
    bytes[0] = n;
    ParticipantId::from_bytes(bytes)
}

/// Create multiple deterministic participant ids.
pub fn participants(count: usize) -> Vec<ParticipantId> {
    (0..count).map(|i| participant(i as u8 + 1)).collect()
}

pub fn stack(item: &str, count: u32) -> ItemStack {
    ItemStack::new(item, count)
}

pub fn stone(count: u32) -> ItemStack {
    stack("minecraft:stone", count)
}

/// Limits used across tests: 64 by default, ender pearls stack to 16.
pub fn test_limits() -> StackLimitTable {
    StackLimitTable::default().with_limit("minecraft:ender_pearl", 16)
}

pub fn test_config(slot_count: usize) -> InventoryConfig {
    InventoryConfig {
        slot_count,
        stack_limits: test_limits(),
    }
}

/// Stands in for the game's click handling: puts `button` items of one kind
/// into the clicked slot. Negative buttons fail.
#[derive(Debug, Clone)]
pub struct PlaceApplier {
    pub item: ItemId,
}

impl PlaceApplier {
    pub fn new(item: &str) -> Self {
        Self {
            item: ItemId::new(item),
        }
    }
}

impl Default for PlaceApplier {
    fn default() -> Self {
        Self::new("minecraft:stone")
    }
}

impl<R: Replica + ?Sized> ActionApplier<R> for PlaceApplier {
    fn apply(&mut self, replica: &mut R, action: &ValidatedAction) -> Result<(), ApplyError> {
        let count = u32::try_from(action.button)
            .map_err(|_| ApplyError(format!("negative button {}", action.button)))?;
        replica.write_slot(
            action.slot.as_usize(),
            ItemStack::new(self.item.clone(), count),
        );
        Ok(())
    }
}

/// An engine with a roster of in-memory replicas, all joined and synced.
pub struct EngineFixture {
    pub engine: Reconciler,
    pub roster: Vec<MemoryReplica>,
}

impl EngineFixture {
    /// `count` empty participants over an empty inventory.
    pub fn new(slot_count: usize, count: usize) -> Self {
        let mut fixture = Self::empty(slot_count);
        for id in participants(count) {
            fixture.join(MemoryReplica::new(id, slot_count));
        }
        fixture
    }

    /// No participants yet.
    pub fn empty(slot_count: usize) -> Self {
        let engine = match Reconciler::new(&test_config(slot_count)) {
            Ok(engine) => engine,
            Err(e) => panic!("invalid test config: {}", e),
        };
        Self {
            engine,
            roster: Vec::new(),
        }
    }

    pub fn join(&mut self, replica: MemoryReplica) -> PassReport {
        let id = replica.participant();
        self.roster.push(replica);
        self.engine.join(id, &mut self.roster)
    }

    pub fn leave(&mut self, index: usize) -> MemoryReplica {
        let replica = self.roster.remove(index);
        self.engine.forget(&replica.participant());
        replica
    }

    /// Local edit by the participant at `index`, invisible to the server
    /// until the next pass.
    pub fn edit(&mut self, index: usize, slot: usize, stack: ItemStack) {
        self.roster[index].set(slot, stack);
    }

    pub fn tick(&mut self) -> PassReport {
        self.engine.tick(&mut self.roster)
    }

    pub fn act(&mut self, index: usize, request: ActionRequest) -> ActionOutcome {
        let actor = self.roster[index].participant();
        self.engine
            .handle_action(actor, request, &mut self.roster, &mut PlaceApplier::default())
    }

    pub fn canonical(&self) -> CanonicalInventory {
        self.engine.canonical()
    }

    /// Seeded burst of local edits across random participants and slots.
    ///
    /// Counts range up to twice the default max stack so clamping gets hit.
    pub fn scramble(&mut self, seed: u64, edits: usize) {
        if self.roster.is_empty() {
            return;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let slot_count = self.engine.slot_count();
        for _ in 0..edits {
            let index = rng.gen_range(0..self.roster.len());
            let slot = rng.gen_range(0..slot_count);
            let value = if rng.gen_bool(0.2) {
                ItemStack::empty()
            } else {
                let item = ITEMS[rng.gen_range(0..ITEMS.len())];
                stack(item, rng.gen_range(1..=128))
            };
            self.edit(index, slot, value);
        }
    }

    pub fn converged(&self) -> bool {
        all_converged(&self.engine.canonical(), &self.roster)
    }
}

pub type TestServer = SharedInventory<MemoryStore, MemoryTransport, MemoryReplica>;

/// A server over a memory network with one transport per participant.
pub struct ServerFixture {
    pub server: TestServer,
    pub network: std::sync::Arc<MemoryNetwork>,
    pub clients: HashMap<ParticipantId, MemoryTransport>,
}

impl ServerFixture {
    pub async fn new(config: SharedInventoryConfig) -> Self {
        let network = MemoryNetwork::new();
        let transport = network.create_transport(SERVER_ID).await;
        let server = match SharedInventory::open(config, MemoryStore::new(), transport).await {
            Ok(server) => server,
            Err(e) => panic!("failed to open test server: {}", e),
        };
        Self {
            server,
            network,
            clients: HashMap::new(),
        }
    }

    /// Connect a participant's transport and join its replica.
    pub async fn join(&mut self, replica: MemoryReplica) -> PassReport {
        let id = replica.participant();
        let transport = self.network.create_transport(id).await;
        self.clients.insert(id, transport);
        match self.server.join(replica).await {
            Ok(report) => report,
            Err(e) => panic!("join failed: {}", e),
        }
    }

    /// Everything currently waiting in a participant's inbox.
    pub async fn inbox(&self, id: &ParticipantId) -> Vec<SyncMessage> {
        let mut messages = Vec::new();
        if let Some(transport) = self.clients.get(id) {
            while let Ok(Some((_, message))) =
                transport.recv_timeout(Duration::from_millis(20)).await
            {
                messages.push(message);
            }
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnipack_core::StackLimits;
    use omnipack_sync::InteractionKind;

    #[test]
    fn test_participants_are_distinct() {
        let ids = participants(3);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn test_engine_fixture_starts_converged() {
        let fixture = EngineFixture::new(SLOT_COUNT, 3);
        assert_eq!(fixture.roster.len(), 3);
        assert!(fixture.converged());
        assert_eq!(fixture.engine.version(), 0);
    }

    #[test]
    fn test_scramble_then_tick_converges() {
        let mut fixture = EngineFixture::new(SLOT_COUNT, 4);
        fixture.scramble(7, 60);
        fixture.tick();
        assert!(fixture.converged());

        let canonical = fixture.canonical();
        let limits = test_limits();
        for slot in canonical.slots().iter().filter(|s| !s.is_empty()) {
            assert!(slot.count <= limits.max_stack_size(&slot.item));
        }
    }

    #[test]
    fn test_place_applier() {
        let mut fixture = EngineFixture::new(SLOT_COUNT, 2);
        let outcome = fixture.act(0, ActionRequest::new(4, 12, InteractionKind::Pickup));
        assert!(outcome.ack.accepted);
        assert_eq!(fixture.canonical().slots()[4], stone(12));
        assert!(fixture.converged());
    }

    #[tokio::test]
    async fn test_server_fixture_join_pushes() {
        let mut fixture = ServerFixture::new(SharedInventoryConfig::default()).await;
        let alice = participant(1);
        let mut replica = MemoryReplica::new(alice, SLOT_COUNT);
        replica.set(0, stone(5));

        fixture.join(replica).await;
        let inbox = fixture.inbox(&alice).await;
        assert_eq!(inbox.len(), SLOT_COUNT + 1);
    }
}
