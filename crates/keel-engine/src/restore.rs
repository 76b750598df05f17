//! Restore: copy container state back onto live records.
//!
//! Values of fields a record already carries are written into its batch
//! directly. Changes to which fields a record carries are emitted as
//! [`DeferredMutation`](crate::DeferredMutation)s and returned in a
//! [`MutationList`] to apply once every task has finished.
//!
//! Scalar fields follow the slot's found count: a record that carries the
//! field but whose slot is absent loses it, and a record lacking the field
//! whose slot is found gains it. Array fields are never added or removed
//! here; they are resized to the stored element count.

use keel_container::{FieldDescriptor, GroupLayout, SnapshotContainer};
use keel_core::{FieldColumn, FieldTypeId, GroupId, LocalIndex, RecordBatch, RecordHandle};
use smallvec::SmallVec;

use crate::config::SchedulingStrategy;
use crate::mutation::{DeferredMutation, MutationBuffer, MutationList};
use crate::scheduler::WorkerPool;

/// The live batches of one group to restore into.
pub type RestoreInput<'a> = (GroupId, &'a mut [RecordBatch]);

/// Restore `inputs` from `container` with the given strategy.
///
/// # Panics
///
/// Panics if a group does not exist or a record's local index is past its
/// group's record count.
pub fn restore(
    container: &SnapshotContainer,
    inputs: &mut [RestoreInput<'_>],
    strategy: SchedulingStrategy,
    pool: &WorkerPool,
) -> MutationList {
    let buffers = match strategy {
        SchedulingStrategy::PerField => restore_per_field(container, inputs, pool),
        SchedulingStrategy::Grouped => restore_grouped(container, inputs, pool),
    };
    let mut merged = MutationBuffer::new();
    for mut buffer in buffers {
        merged.append(&mut buffer);
    }
    merged.finish()
}

/// The rows of one batch as seen by a single field.
struct FieldRows<'a> {
    handles: &'a [RecordHandle],
    locals: &'a [LocalIndex],
    column: Option<&'a mut FieldColumn>,
}

fn layout_of(container: &SnapshotContainer, group: GroupId) -> &GroupLayout {
    container.group(group).unwrap_or_else(|| {
        panic!(
            "group {group} out of range for container with {} groups",
            container.group_count()
        )
    })
}

/// Match a batch's columns to layout positions. Columns for fields the
/// group does not persist are skipped.
fn split_columns<'a>(
    layout: &GroupLayout,
    columns: impl Iterator<Item = (&'a FieldTypeId, &'a mut FieldColumn)>,
) -> Vec<Option<&'a mut FieldColumn>> {
    let mut out: Vec<Option<&'a mut FieldColumn>> = (0..layout.field_count()).map(|_| None).collect();
    for (&type_id, column) in columns {
        if let Some(position) = layout.field_position(type_id) {
            out[position] = Some(column);
        }
    }
    out
}

fn restore_rows(
    container: &SnapshotContainer,
    group: GroupId,
    field: usize,
    desc: &FieldDescriptor,
    rows: FieldRows<'_>,
    out: &mut MutationBuffer,
) {
    let type_id = desc.type_id();
    let mut column = rows.column;
    for (row, (&handle, &local)) in rows.handles.iter().zip(rows.locals).enumerate() {
        let slot = container.slot(group, field, local);
        let found = slot.meta.found_count() as usize;
        assert!(
            found <= desc.max_elements(),
            "slot of record {handle} holds {found} elements, field capacity is {}",
            desc.max_elements()
        );
        let value = &slot.payload[..found * desc.element_size()];

        match column.as_deref_mut() {
            Some(column) if desc.is_array() || found != 0 => {
                column.set(row, value);
                if desc.enableable() {
                    column.set_enabled(row, slot.meta.is_enabled());
                }
            }
            Some(_) => out.push(
                field,
                DeferredMutation::RemoveField {
                    handle,
                    field: type_id,
                },
            ),
            None if !desc.is_array() && found != 0 => {
                out.push(
                    field,
                    DeferredMutation::AddField {
                        handle,
                        field: type_id,
                        value: SmallVec::from_slice(value),
                    },
                );
                if desc.enableable() {
                    out.push(
                        field,
                        DeferredMutation::SetEnabled {
                            handle,
                            field: type_id,
                            enabled: slot.meta.is_enabled(),
                        },
                    );
                }
            }
            None => {}
        }
    }
}

// ── Per-field strategy ─────────────────────────────────────────────

struct FieldTask<'a> {
    group: GroupId,
    field: usize,
    desc: &'a FieldDescriptor,
    rows: Vec<FieldRows<'a>>,
}

fn restore_per_field(
    container: &SnapshotContainer,
    inputs: &mut [RestoreInput<'_>],
    pool: &WorkerPool,
) -> Vec<MutationBuffer> {
    let mut tasks = Vec::new();
    for (group, batches) in inputs.iter_mut() {
        let group = *group;
        let layout = layout_of(container, group);
        let mut group_tasks: Vec<FieldTask<'_>> = layout
            .fields()
            .iter()
            .enumerate()
            .map(|(field, desc)| FieldTask {
                group,
                field,
                desc,
                rows: Vec::with_capacity(batches.len()),
            })
            .collect();
        for batch in batches.iter_mut() {
            let parts = batch.parts_mut();
            let columns = split_columns(layout, parts.columns);
            for (task, column) in group_tasks.iter_mut().zip(columns) {
                task.rows.push(FieldRows {
                    handles: parts.handles,
                    locals: parts.local_indices,
                    column,
                });
            }
        }
        tasks.extend(group_tasks);
    }

    pool.run(tasks, |task| {
        let mut out = MutationBuffer::new();
        for rows in task.rows {
            restore_rows(container, task.group, task.field, task.desc, rows, &mut out);
        }
        out
    })
}

// ── Grouped strategy ───────────────────────────────────────────────

fn restore_grouped(
    container: &SnapshotContainer,
    inputs: &mut [RestoreInput<'_>],
    pool: &WorkerPool,
) -> Vec<MutationBuffer> {
    let mut tasks: Vec<(GroupId, &GroupLayout, &mut RecordBatch)> = Vec::new();
    for (group, batches) in inputs.iter_mut() {
        let layout = layout_of(container, *group);
        for batch in batches.iter_mut() {
            tasks.push((*group, layout, batch));
        }
    }

    pool.run(tasks, |(group, layout, batch)| {
        let mut out = MutationBuffer::new();
        let parts = batch.parts_mut();
        let columns = split_columns(layout, parts.columns);
        for (field, (desc, column)) in layout.fields().iter().zip(columns).enumerate() {
            let rows = FieldRows {
                handles: parts.handles,
                locals: parts.local_indices,
                column,
            };
            restore_rows(container, group, field, desc, rows, &mut out);
        }
        out
    })
}
