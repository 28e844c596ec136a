//! Item stacks: the value held by one inventory slot.
//!
//! The empty stack is a regular value, not an absent one. Every empty stack
//! compares equal to every other empty stack regardless of leftover id or
//! component bytes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespaced item identifier such as `minecraft:stone`.
///
/// The empty string identifies "no item".
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The "no item" identifier.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The contents of one slot: an item, a count and opaque auxiliary data.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ItemStack {
    /// What item this is.
    pub item: ItemId,
    /// How many of it. Zero means empty.
    pub count: u32,
    /// Auxiliary per-stack data (enchantments, names, ...), compared bytewise.
    #[serde(default)]
    pub components: Bytes,
}

impl ItemStack {
    /// Create a stack without components.
    pub fn new(item: impl Into<ItemId>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
            components: Bytes::new(),
        }
    }

    /// The empty slot value.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attach auxiliary component data.
    pub fn with_components(mut self, components: impl Into<Bytes>) -> Self {
        self.components = components.into();
        self
    }

    /// Copy of this stack with a different count.
    pub fn with_count(&self, count: u32) -> Self {
        Self {
            item: self.item.clone(),
            count,
            components: self.components.clone(),
        }
    }

    /// A stack is empty when it has no item or a zero count.
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.item.is_none()
    }

    /// Collapse every empty representation to [`ItemStack::empty`].
    pub fn normalized(self) -> Self {
        if self.is_empty() {
            Self::empty()
        } else {
            self
        }
    }

    /// Same item and same components, ignoring count.
    pub fn is_same_item(&self, other: &ItemStack) -> bool {
        self.item == other.item && self.components == other.components
    }
}

impl PartialEq for ItemStack {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => true,
            (false, false) => self.count == other.count && self.is_same_item(other),
            _ => false,
        }
    }
}

impl Eq for ItemStack {}

impl fmt::Debug for ItemStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("ItemStack(empty)");
        }
        write!(f, "ItemStack({} x{}", self.item, self.count)?;
        if !self.components.is_empty() {
            write!(f, ", {}b components", self.components.len())?;
        }
        f.write_str(")")
    }
}
