//! Layout compatibility hashing.
//!
//! Uses FNV-1a over each field's stable type identifier, array/scalar kind
//! and element capacity, in layout order. Two containers are compatible
//! iff their hashes and per-group record counts match exactly. These
//! hashes are not cryptographically secure.

use keel_core::FieldDef;

use crate::layout::GroupLayout;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u32(mut hash: u64, v: u32) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

#[inline]
fn fnv1a_u64(mut hash: u64, v: u64) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

fn fold_field(hash: u64, def: &FieldDef) -> u64 {
    let hash = fnv1a_u64(hash, def.type_id.0);
    let hash = fnv1a_byte(hash, def.is_array() as u8);
    fnv1a_u32(hash, def.max_elements())
}

/// Hash of one group's field composition.
///
/// Returns `FNV_OFFSET` for an empty field list.
pub fn layout_hash(fields: &[FieldDef]) -> u64 {
    fields.iter().fold(FNV_OFFSET, fold_field)
}

/// Hash of a whole container layout: the group count followed by every
/// group's fields, in group order.
pub fn container_layout_hash(groups: &[GroupLayout]) -> u64 {
    let mut hash = fnv1a_u32(FNV_OFFSET, groups.len() as u32);
    for group in groups {
        hash = fnv1a_u32(hash, group.field_count() as u32);
        for field in group.fields() {
            hash = fold_field(hash, &field.def);
        }
    }
    hash
}

/// A container layout hash with every group's record count folded in, in
/// group order.
///
/// Serialized snapshots carry this value, so two containers that share
/// their groups but split the records differently do not accept each
/// other's bytes.
pub fn snapshot_hash(layout_hash: u64, groups: &[GroupLayout]) -> u64 {
    groups
        .iter()
        .fold(layout_hash, |hash, group| fnv1a_u32(hash, group.record_count()))
}
