//! Slot value validation and tolerant comparison.
//!
//! Diff detection must never abort a pass because of one bad value, so the
//! comparison used by the engine reports malformed values as errors that the
//! caller downgrades to "no diff".

use crate::error::ValidationError;
use crate::item::ItemStack;

/// Maximum length of an item identifier.
pub const MAX_ITEM_ID_LEN: usize = 256;

/// Maximum size of a stack's component data.
pub const MAX_COMPONENT_BYTES: usize = 64 * 1024;

/// Validate a slot value's structure.
///
/// Empty stacks are always valid. Non-empty stacks must carry a well-formed
/// `namespace:path` (or bare `path`) identifier of lowercase ASCII letters,
/// digits and `_ - . /`, and bounded component data.
pub fn validate_stack(stack: &ItemStack) -> Result<(), ValidationError> {
    if stack.count == 0 {
        return Ok(());
    }

    let id = stack.item.as_str();
    if id.is_empty() {
        return Err(ValidationError::MissingItemId);
    }
    if id.len() > MAX_ITEM_ID_LEN || !is_valid_item_id(id) {
        return Err(ValidationError::InvalidItemId(id.to_string()));
    }

    if stack.components.len() > MAX_COMPONENT_BYTES {
        return Err(ValidationError::ComponentsTooLarge {
            len: stack.components.len(),
            max: MAX_COMPONENT_BYTES,
        });
    }

    Ok(())
}

fn is_valid_item_id(id: &str) -> bool {
    let mut parts = id.splitn(2, ':');
    let (namespace, path) = match (parts.next(), parts.next()) {
        (Some(ns), Some(path)) => (Some(ns), path),
        (Some(path), None) => (None, path),
        _ => return false,
    };

    let valid_char = |c: char| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.')
    };

    if let Some(ns) = namespace {
        if ns.is_empty() || !ns.chars().all(valid_char) {
            return false;
        }
    }
    !path.is_empty() && path.chars().all(|c| valid_char(c) || c == '/')
}

/// Compare a previously observed slot value with a fresh one.
///
/// Returns `Ok(true)` when they differ. The fresh value is validated first;
/// a malformed fresh value is an error, never a diff.
pub fn slot_differs(previous: &ItemStack, current: &ItemStack) -> Result<bool, ValidationError> {
    validate_stack(current)?;
    Ok(previous != current)
}
