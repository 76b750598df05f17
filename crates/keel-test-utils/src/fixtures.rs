//! Reusable field lists, containers and populated worlds.
//!
//! - [`scenario_fields`]: three scalar fields of 4, 0 and 20 bytes.
//! - [`mixed_fields`]: scalar, enableable scalar, tag and array fields.
//! - [`populate`]: fill one group of a [`MockWorld`] with deterministic
//!   values.

use keel_container::{GroupSpec, SnapshotContainer};
use keel_core::{ContainerId, FieldDef, FieldTypeId, GroupId, LocalIndex, RecordHandle};

use crate::MockWorld;

/// Three scalar fields sized 4, 0 and 20 bytes.
pub fn scenario_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::scalar("position", FieldTypeId(0x10), 4),
        FieldDef::scalar("marker", FieldTypeId(0x11), 0),
        FieldDef::scalar("name", FieldTypeId(0x12), 20),
    ]
}

/// One field of every shape.
pub fn mixed_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::scalar("health", FieldTypeId(0x20), 4),
        FieldDef::scalar("shield", FieldTypeId(0x21), 8).enableable(true),
        FieldDef::scalar("tag", FieldTypeId(0x22), 0),
        FieldDef::array("waypoints", FieldTypeId(0x23), 3, 5).enableable(true),
    ]
}

/// A single-group container.
pub fn container_for(fields: &[FieldDef], record_count: u32) -> SnapshotContainer {
    SnapshotContainer::new(&[GroupSpec::new(fields.to_vec(), record_count)])
        .unwrap_or_else(|e| panic!("fixture layout rejected: {e}"))
}

/// Deterministic value bytes for a record's field. Arrays get a length
/// that varies with the handle (0 up to one past capacity, so clamping is
/// exercised).
pub fn value_for(def: &FieldDef, handle: RecordHandle) -> Vec<u8> {
    let elements = if def.is_array() {
        (handle.0 as usize) % (def.max_elements() as usize + 2)
    } else {
        1
    };
    let len = elements * def.element_size as usize;
    (0..len)
        .map(|i| (handle.0 as u8).wrapping_mul(31) ^ (def.type_id.0 as u8) ^ (i as u8))
        .collect()
}

/// Spawn `count` records into `group` of `container`, with handles
/// starting at `first_handle` and local indices `0..count`.
///
/// `carries(handle, field)` decides which fields each record has;
/// enableable fields alternate their enabled flag by handle.
pub fn populate(
    world: &mut MockWorld,
    container: ContainerId,
    group: GroupId,
    fields: &[FieldDef],
    first_handle: u64,
    count: u32,
    carries: impl Fn(RecordHandle, &FieldDef) -> bool,
) -> Vec<RecordHandle> {
    let mut handles = Vec::with_capacity(count as usize);
    for i in 0..count {
        let handle = RecordHandle(first_handle + i as u64);
        let values: Vec<(FieldTypeId, Vec<u8>, bool)> = fields
            .iter()
            .filter(|def| carries(handle, def))
            .map(|def| {
                let enabled = !def.enableable || handle.0 % 2 == 0;
                (def.type_id, value_for(def, handle), enabled)
            })
            .collect();
        let refs: Vec<(FieldTypeId, &[u8], bool)> = values
            .iter()
            .map(|(f, v, e)| (*f, v.as_slice(), *e))
            .collect();
        world.spawn(container, group, handle, LocalIndex(i), &refs);
        handles.push(handle);
    }
    handles
}

/// `populate` with every field present.
pub fn carries_all(_: RecordHandle, _: &FieldDef) -> bool {
    true
}
