//! Server configuration.

use serde::{Deserialize, Serialize};

use omnipack_core::{EnvironmentId, InventoryConfig};
use omnipack_sync::SyncConfig;

use crate::error::{Result, SharedInventoryError};

/// Configuration for a [`SharedInventory`](crate::SharedInventory).
///
/// ```toml
/// environment_id = "overworld"
/// tick_interval_ms = 50
/// persist_every_ticks = 200
///
/// [inventory]
/// slot_count = 41
///
/// [inventory.stack_limits]
/// default_max = 64
///
/// [inventory.stack_limits.overrides]
/// "minecraft:ender_pearl" = 16
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedInventoryConfig {
    /// Stable key for persisted state (world or save id).
    pub environment_id: EnvironmentId,
    /// Slot count and stack limits.
    pub inventory: InventoryConfig,
    /// Periodic pass cadence.
    pub tick_interval_ms: u64,
    /// Persist every this many ticks in the tick loop. Zero disables it.
    pub persist_every_ticks: u64,
    /// Transport timeouts.
    #[serde(skip)]
    pub sync: SyncConfig,
}

impl SharedInventoryConfig {
    /// Parse from TOML and validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| SharedInventoryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.inventory.validate()?;
        if self.tick_interval_ms == 0 {
            return Err(SharedInventoryError::Config(
                "tick_interval_ms must be positive".into(),
            ));
        }
        if self.environment_id.as_str().is_empty() {
            return Err(SharedInventoryError::Config(
                "environment_id must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedInventoryConfig {
    fn default() -> Self {
        Self {
            environment_id: EnvironmentId::new("default"),
            inventory: InventoryConfig::default(),
            tick_interval_ms: 50,
            persist_every_ticks: 200,
            sync: SyncConfig::default(),
        }
    }
}
