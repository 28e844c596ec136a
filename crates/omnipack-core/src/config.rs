//! Inventory shape and stack-size configuration.
//!
//! The slot count and the maximum-stack-size lookup are the only parameters
//! the reconciliation core depends on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::item::{ItemId, ItemStack};

/// Default slot count: 36 general + 4 equipment + 1 offhand.
pub const DEFAULT_SLOT_COUNT: usize = 41;

/// Upper bound on configurable slot counts (slot indices travel as u16).
pub const MAX_SLOT_COUNT: usize = 1024;

/// Maximum stack size used for items without an override.
pub const DEFAULT_MAX_STACK: u32 = 64;

/// Maximum stack size lookup.
pub trait StackLimits: Send + Sync {
    /// Largest count a single slot may hold for `item`.
    fn max_stack_size(&self, item: &ItemId) -> u32;

    /// Clamp a stack's count down to its maximum stack size.
    ///
    /// Over-full stacks are silently clamped; this is never an error. A lookup
    /// returning zero is treated as one.
    fn clamp(&self, stack: ItemStack) -> ItemStack {
        let stack = stack.normalized();
        if stack.is_empty() {
            return stack;
        }
        let max = self.max_stack_size(&stack.item).max(1);
        if stack.count > max {
            stack.with_count(max)
        } else {
            stack
        }
    }
}

impl<F> StackLimits for F
where
    F: Fn(&ItemId) -> u32 + Send + Sync,
{
    fn max_stack_size(&self, item: &ItemId) -> u32 {
        self(item)
    }
}

/// Table-driven stack limits: one default plus per-item overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackLimitTable {
    pub default_max: u32,
    pub overrides: BTreeMap<ItemId, u32>,
}

impl StackLimitTable {
    pub fn new(default_max: u32) -> Self {
        Self {
            default_max,
            overrides: BTreeMap::new(),
        }
    }

    /// Override the maximum for one item.
    pub fn with_limit(mut self, item: impl Into<ItemId>, max: u32) -> Self {
        self.overrides.insert(item.into(), max);
        self
    }
}

impl Default for StackLimitTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STACK)
    }
}

impl StackLimits for StackLimitTable {
    fn max_stack_size(&self, item: &ItemId) -> u32 {
        self.overrides.get(item).copied().unwrap_or(self.default_max)
    }
}

/// Shape of the shared inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Number of slots N.
    pub slot_count: usize,
    /// Maximum stack sizes.
    pub stack_limits: StackLimitTable,
}

impl InventoryConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.slot_count == 0 {
            return Err(CoreError::InvalidConfig("slot_count must be positive".into()));
        }
        if self.slot_count > MAX_SLOT_COUNT {
            return Err(CoreError::InvalidConfig(format!(
                "slot_count {} exceeds maximum {}",
                self.slot_count, MAX_SLOT_COUNT
            )));
        }
        if self.stack_limits.default_max == 0 {
            return Err(CoreError::InvalidConfig(
                "default max stack size must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            stack_limits: StackLimitTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_default_max() {
        let limits = StackLimitTable::default();
        let clamped = limits.clamp(ItemStack::new("minecraft:stone", 70));
        assert_eq!(clamped, ItemStack::new("minecraft:stone", 64));
    }

    #[test]
    fn test_clamp_uses_override() {
        let limits = StackLimitTable::default().with_limit("minecraft:ender_pearl", 16);
        let clamped = limits.clamp(ItemStack::new("minecraft:ender_pearl", 20));
        assert_eq!(clamped.count, 16);
        let untouched = limits.clamp(ItemStack::new("minecraft:ender_pearl", 5));
        assert_eq!(untouched.count, 5);
    }

    #[test]
    fn test_clamp_keeps_components() {
        let limits = StackLimitTable::new(1);
        let stack = ItemStack::new("minecraft:sword", 3).with_components(vec![1u8, 2]);
        let clamped = limits.clamp(stack.clone());
        assert_eq!(clamped, stack.with_count(1));
    }

    #[test]
    fn test_closure_limits() {
        let limits = |_: &ItemId| 0u32;
        assert_eq!(limits.clamp(ItemStack::new("minecraft:stone", 5)).count, 1);
    }

    #[test]
    fn test_config_validation() {
        assert!(InventoryConfig::default().validate().is_ok());
        let zero = InventoryConfig {
            slot_count: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        let huge = InventoryConfig {
            slot_count: MAX_SLOT_COUNT + 1,
            ..Default::default()
        };
        assert!(huge.validate().is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_clamp_bounded(count in 0u32..1000, max in 0u32..128) {
            let limits = StackLimitTable::new(max);
            let clamped = limits.clamp(ItemStack::new("minecraft:stone", count));
            if count == 0 {
                proptest::prop_assert!(clamped.is_empty());
            } else {
                proptest::prop_assert_eq!(clamped.count, count.min(max.max(1)));
                proptest::prop_assert_eq!(clamped.item.as_str(), "minecraft:stone");
            }
        }
    }
}
