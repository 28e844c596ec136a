//! Canonical CBOR encoding for deterministic slot hashing and persistence.
//!
//! This module implements RFC 8949 Core Deterministic Encoding for the
//! handful of shapes an inventory needs:
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - An empty slot is `null`; a non-empty slot is `[item, count, components]`
//!
//! The canonical encoding is what the content hash is computed over, so the
//! same slot contents produce identical bytes on every platform.

use ciborium::value::Value;

use crate::error::CoreError;
use crate::item::{ItemId, ItemStack};

/// Number of fields in an encoded non-empty stack.
const STACK_FIELDS: u64 = 3;

/// Encode a single slot to canonical CBOR bytes.
pub fn canonical_stack_bytes(stack: &ItemStack) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_stack_to(&mut buf, stack);
    buf
}

/// Encode an ordered slot list to canonical CBOR bytes.
///
/// Format: array header || slot_0 || ... || slot_{n-1}
pub fn canonical_slots_bytes<'a, I>(slots: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a ItemStack>,
    I::IntoIter: ExactSizeIterator,
{
    let slots = slots.into_iter();
    let mut buf = Vec::new();
    encode_uint(&mut buf, 4, slots.len() as u64);
    for stack in slots {
        encode_stack_to(&mut buf, stack);
    }
    buf
}

/// Recursively encode one slot.
fn encode_stack_to(buf: &mut Vec<u8>, stack: &ItemStack) {
    if stack.is_empty() {
        buf.push(0xf6);
        return;
    }
    encode_uint(buf, 4, STACK_FIELDS);
    encode_text(buf, stack.item.as_str());
    encode_uint(buf, 0, stack.count as u64);
    encode_bytes(buf, &stack.components);
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Decode a slot list produced by [`canonical_slots_bytes`].
///
/// `null` entries decode to the empty stack.
pub fn decode_slots(bytes: &[u8]) -> Result<Vec<Option<ItemStack>>, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let entries = match value {
        Value::Array(entries) => entries,
        _ => return Err(CoreError::MalformedSlots("expected array".into())),
    };

    entries.iter().map(cbor_value_to_slot).collect()
}

/// Convert one CBOR value back to a slot.
fn cbor_value_to_slot(value: &Value) -> Result<Option<ItemStack>, CoreError> {
    let fields = match value {
        Value::Null => return Ok(None),
        Value::Array(fields) if fields.len() == STACK_FIELDS as usize => fields,
        _ => return Err(CoreError::MalformedSlots("expected null or 3-element array".into())),
    };

    let item = match &fields[0] {
        Value::Text(s) => ItemId::new(s.clone()),
        _ => return Err(CoreError::MalformedSlots("invalid item id".into())),
    };

    let count = match &fields[1] {
        Value::Integer(i) => {
            let n: i128 = (*i).into();
            u32::try_from(n).map_err(|_| CoreError::MalformedSlots(format!("invalid count: {}", n)))?
        }
        _ => return Err(CoreError::MalformedSlots("missing count".into())),
    };

    let components = match &fields[2] {
        Value::Bytes(b) => b.clone(),
        _ => return Err(CoreError::MalformedSlots("invalid components".into())),
    };

    let stack = ItemStack::new(item, count).with_components(components);
    Ok(Some(stack).filter(|s| !s.is_empty()))
}
