//! Test utilities and mock types for Keel development.
//!
//! [`MockWorld`] stands in for the host runtime: it keeps live records in
//! [`RecordBatch`]es grouped by field composition, hands them to the
//! engine per container and group, and applies deferred mutations by
//! migrating records between batches. [`fixtures`] builds field lists and
//! populated worlds for common scenarios.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::BTreeMap;

use indexmap::IndexMap;

use keel_core::{
    ContainerId, FieldColumn, FieldDef, FieldTypeId, GroupId, LocalIndex, RecordBatch,
    RecordHandle,
};
use keel_engine::{CaptureInput, LiveWorld, RestoreInput, StructuralSink};

/// Observable state of one record: slot index plus `(value, enabled)` per
/// carried field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordState {
    pub local_index: LocalIndex,
    pub fields: BTreeMap<FieldTypeId, (Vec<u8>, bool)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Location {
    container: ContainerId,
    group: usize,
    batch: usize,
    row: usize,
}

/// In-memory host world.
///
/// Every record lives in exactly one batch of one group of one container.
/// Batches within a group are kept one per distinct field composition,
/// with columns in the order the field definitions were registered.
#[derive(Clone, Debug, Default)]
pub struct MockWorld {
    defs: IndexMap<FieldTypeId, FieldDef>,
    containers: IndexMap<ContainerId, Vec<Vec<RecordBatch>>>,
}

impl MockWorld {
    /// A world that knows the given field definitions.
    pub fn new(defs: impl IntoIterator<Item = FieldDef>) -> Self {
        Self {
            defs: defs.into_iter().map(|d| (d.type_id, d)).collect(),
            containers: IndexMap::new(),
        }
    }

    /// Register another field definition.
    pub fn define(&mut self, def: FieldDef) {
        self.defs.insert(def.type_id, def);
    }

    /// Create a record. `values` may list fields in any order.
    ///
    /// # Panics
    ///
    /// Panics if the handle already exists or a field is undefined.
    pub fn spawn(
        &mut self,
        container: ContainerId,
        group: GroupId,
        handle: RecordHandle,
        local_index: LocalIndex,
        values: &[(FieldTypeId, &[u8], bool)],
    ) {
        assert!(self.locate(handle).is_none(), "record {handle} already exists");
        let owned: Vec<(FieldTypeId, Vec<u8>, bool)> = values
            .iter()
            .map(|&(f, v, e)| (f, v.to_vec(), e))
            .collect();
        self.insert(container, group.index(), handle, local_index, owned);
    }

    /// Batches of one group, empty if the group has no records.
    pub fn batches(&self, container: ContainerId, group: GroupId) -> &[RecordBatch] {
        self.containers
            .get(&container)
            .and_then(|groups| groups.get(group.index()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mutable batches of one group.
    pub fn batches_mut(&mut self, container: ContainerId, group: GroupId) -> &mut [RecordBatch] {
        match self
            .containers
            .get_mut(&container)
            .and_then(|groups| groups.get_mut(group.index()))
        {
            Some(batches) => batches,
            None => &mut [],
        }
    }

    /// Number of records across all containers.
    pub fn record_count(&self) -> usize {
        self.containers
            .values()
            .flatten()
            .flatten()
            .map(RecordBatch::len)
            .sum()
    }

    /// State of one record.
    pub fn record(&self, handle: RecordHandle) -> Option<RecordState> {
        let loc = self.locate(handle)?;
        let batch = &self.containers[&loc.container][loc.group][loc.batch];
        let fields = batch
            .field_types()
            .map(|f| {
                let column = batch.column(f).unwrap_or_else(|| unreachable!());
                (f, (column.get(loc.row).to_vec(), column.is_enabled(loc.row)))
            })
            .collect();
        Some(RecordState {
            local_index: batch.local_indices()[loc.row],
            fields,
        })
    }

    /// State of every record, keyed by handle.
    pub fn states(&self) -> BTreeMap<RecordHandle, RecordState> {
        let mut out = BTreeMap::new();
        for batch in self.containers.values().flatten().flatten() {
            for &handle in batch.handles() {
                if let Some(state) = self.record(handle) {
                    out.insert(handle, state);
                }
            }
        }
        out
    }

    /// Overwrite a field value in place.
    ///
    /// # Panics
    ///
    /// Panics if the record or field is missing.
    pub fn set_value(&mut self, handle: RecordHandle, field: FieldTypeId, value: &[u8]) {
        let (column, row) = self.column_mut(handle, field);
        column.set(row, value);
    }

    /// Change a field's enabled flag in place.
    ///
    /// # Panics
    ///
    /// Panics if the record or field is missing.
    pub fn set_field_enabled(&mut self, handle: RecordHandle, field: FieldTypeId, enabled: bool) {
        let (column, row) = self.column_mut(handle, field);
        column.set_enabled(row, enabled);
    }

    /// Move a record to a different slot index.
    pub fn set_local_index(&mut self, handle: RecordHandle, local_index: LocalIndex) {
        let loc = self.expect_record(handle);
        self.containers[&loc.container][loc.group][loc.batch].set_local_index(loc.row, local_index);
    }

    /// Delete a record entirely.
    pub fn despawn(&mut self, handle: RecordHandle) {
        let loc = self.expect_record(handle);
        self.containers[&loc.container][loc.group][loc.batch].swap_remove(loc.row);
    }

    fn column_mut(&mut self, handle: RecordHandle, field: FieldTypeId) -> (&mut FieldColumn, usize) {
        let loc = self.expect_record(handle);
        let column = self.containers[&loc.container][loc.group][loc.batch]
            .column_mut(field)
            .unwrap_or_else(|| panic!("record {handle} does not carry field {field}"));
        (column, loc.row)
    }

    fn locate(&self, handle: RecordHandle) -> Option<Location> {
        for (&container, groups) in &self.containers {
            for (group, batches) in groups.iter().enumerate() {
                for (batch, b) in batches.iter().enumerate() {
                    if let Some(row) = b.row_of(handle) {
                        return Some(Location {
                            container,
                            group,
                            batch,
                            row,
                        });
                    }
                }
            }
        }
        None
    }

    fn expect_record(&self, handle: RecordHandle) -> Location {
        self.locate(handle)
            .unwrap_or_else(|| panic!("record {handle} does not exist"))
    }

    /// Put a record into the batch matching its composition, creating the
    /// batch if needed.
    fn insert(
        &mut self,
        container: ContainerId,
        group: usize,
        handle: RecordHandle,
        local_index: LocalIndex,
        mut values: Vec<(FieldTypeId, Vec<u8>, bool)>,
    ) {
        let order = |f: FieldTypeId| {
            self.defs
                .get_index_of(&f)
                .unwrap_or_else(|| panic!("field {f} is not defined"))
        };
        values.sort_by_key(|&(f, _, _)| order(f));
        let composition: Vec<FieldTypeId> = values.iter().map(|&(f, _, _)| f).collect();

        let columns: Vec<(FieldTypeId, FieldColumn)> = composition
            .iter()
            .map(|f| (*f, FieldColumn::for_def(&self.defs[f])))
            .collect();
        let groups = self.containers.entry(container).or_default();
        if groups.len() <= group {
            groups.resize_with(group + 1, Vec::new);
        }
        let batches = &mut groups[group];
        let index = match batches
            .iter()
            .position(|b| b.field_types().eq(composition.iter().copied()))
        {
            Some(index) => index,
            None => {
                batches.push(RecordBatch::new(columns));
                batches.len() - 1
            }
        };
        let refs: Vec<(FieldTypeId, &[u8], bool)> = values
            .iter()
            .map(|(f, v, e)| (*f, v.as_slice(), *e))
            .collect();
        batches[index].push(handle, local_index, &refs);
    }

    /// Remove a record from its batch, let `edit` change its values, and
    /// reinsert it where its new composition belongs.
    fn migrate(
        &mut self,
        handle: RecordHandle,
        edit: impl FnOnce(&mut Vec<(FieldTypeId, Vec<u8>, bool)>),
    ) {
        let loc = self.expect_record(handle);
        let mut removed = self.containers[&loc.container][loc.group][loc.batch].swap_remove(loc.row);
        edit(&mut removed.values);
        self.insert(loc.container, loc.group, handle, removed.local_index, removed.values);
    }
}

impl StructuralSink for MockWorld {
    fn add_field(&mut self, handle: RecordHandle, field: FieldTypeId, value: &[u8]) {
        self.migrate(handle, |values| {
            assert!(
                values.iter().all(|(f, _, _)| *f != field),
                "record {handle} already carries field {field}"
            );
            values.push((field, value.to_vec(), true));
        });
    }

    fn remove_field(&mut self, handle: RecordHandle, field: FieldTypeId) {
        self.migrate(handle, |values| values.retain(|(f, _, _)| *f != field));
    }

    fn set_enabled(&mut self, handle: RecordHandle, field: FieldTypeId, enabled: bool) {
        self.set_field_enabled(handle, field, enabled);
    }
}

impl LiveWorld for MockWorld {
    fn capture_batches(&self, container: ContainerId) -> Vec<CaptureInput<'_>> {
        self.containers
            .get(&container)
            .map(|groups| {
                groups
                    .iter()
                    .enumerate()
                    .map(|(g, batches)| (GroupId(g as u32), batches.as_slice()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn restore_batches(&mut self, container: ContainerId) -> Vec<RestoreInput<'_>> {
        self.containers
            .get_mut(&container)
            .map(|groups| {
                groups
                    .iter_mut()
                    .enumerate()
                    .map(|(g, batches)| (GroupId(g as u32), batches.as_mut_slice()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
