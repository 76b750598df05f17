//! Capture: copy live record state into a snapshot container.
//!
//! For every slot a record owns, capture writes the metadata header and
//! payload, and sets the changed bit when the stored state differs from
//! the live one. A record that lacks a field gets an absent header
//! (found count 0) and its stale payload is left in place.
//!
//! Array values longer than the field's element capacity are clamped to
//! it; the excess is not stored.

use std::ops::AddAssign;

use keel_container::{FieldDescriptor, GroupLayout, SlotWriter, SnapshotContainer};
use keel_core::{FieldColumn, GroupId, RecordBatch, SlotMeta, META_SIZE};

use crate::config::SchedulingStrategy;
use crate::scheduler::WorkerPool;

/// The live batches of one group to capture.
pub type CaptureInput<'a> = (GroupId, &'a [RecordBatch]);

/// Counters reported by one capture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Slots whose header (and, when present, payload) was written.
    pub slots_written: u64,
    /// Written slots whose changed bit was set.
    pub slots_changed: u64,
}

impl CaptureStats {
    fn record(&mut self, changed: bool) {
        self.slots_written += 1;
        self.slots_changed += changed as u64;
    }
}

impl AddAssign for CaptureStats {
    fn add_assign(&mut self, rhs: Self) {
        self.slots_written += rhs.slots_written;
        self.slots_changed += rhs.slots_changed;
    }
}

/// Capture `inputs` into `container` with the given strategy, then mark
/// the container valid.
///
/// # Panics
///
/// Panics if a group does not exist or is listed twice, or if a record's
/// local index is out of range or shared with another record of the same
/// group.
pub fn capture(
    container: &mut SnapshotContainer,
    inputs: &[CaptureInput<'_>],
    strategy: SchedulingStrategy,
    pool: &WorkerPool,
) -> CaptureStats {
    check_inputs(container, inputs);
    let stats = match strategy {
        SchedulingStrategy::PerField => capture_per_field(container, inputs, pool),
        SchedulingStrategy::Grouped => capture_grouped(container, inputs, pool),
    };
    container.mark_valid();
    stats
}

/// Each group is listed once, and every local index within a group is in
/// range and owned by one record only. Grouped capture relies on the
/// latter for its concurrent slot writes.
fn check_inputs(container: &SnapshotContainer, inputs: &[CaptureInput<'_>]) {
    let mut seen_groups = vec![false; container.group_count()];
    for &(group, batches) in inputs {
        let layout = container.group(group).unwrap_or_else(|| {
            panic!(
                "group {group} out of range for container with {} groups",
                container.group_count()
            )
        });
        assert!(
            !std::mem::replace(&mut seen_groups[group.index()], true),
            "group {group} listed twice in one capture"
        );
        let mut owned = vec![false; layout.record_count() as usize];
        for local in batches.iter().flat_map(|b| b.local_indices()) {
            assert!(
                local.0 < layout.record_count(),
                "local index {local} out of bounds for group with {} records",
                layout.record_count()
            );
            assert!(
                !std::mem::replace(&mut owned[local.get()], true),
                "local index {local} claimed by two records in group {group}"
            );
        }
    }
}

/// Write one slot from the live value. `live` is `None` when the record
/// does not carry the field. Returns whether the changed bit was set.
fn capture_slot(desc: &FieldDescriptor, slot: &mut [u8], live: Option<(&[u8], bool)>) -> bool {
    let (header, payload) = slot.split_at_mut(META_SIZE);
    let stored = SlotMeta::read(header);
    match live {
        Some((value, enabled)) => {
            let found = if desc.is_array() {
                (value.len() / desc.element_size()).min(desc.max_elements())
            } else {
                1
            };
            let len = found * desc.element_size();
            let value = &value[..len];
            let changed = stored.found_count() as usize != found || payload[..len] != *value;
            let enabled = !desc.enableable() || enabled;
            SlotMeta::new(found, enabled, changed).write(header);
            payload[..len].copy_from_slice(value);
            changed
        }
        None => {
            let changed = stored.found_count() != 0;
            SlotMeta::new(0, false, changed).write(header);
            changed
        }
    }
}

fn live_value(column: Option<&FieldColumn>, row: usize) -> Option<(&[u8], bool)> {
    column.map(|c| (c.get(row), c.is_enabled(row)))
}

// ── Per-field strategy ─────────────────────────────────────────────

struct FieldTask<'a> {
    layout: &'a GroupLayout,
    field: usize,
    region: &'a mut [u8],
    batches: &'a [RecordBatch],
}

fn capture_per_field(
    container: &mut SnapshotContainer,
    inputs: &[CaptureInput<'_>],
    pool: &WorkerPool,
) -> CaptureStats {
    let (layouts, regions) = container.all_field_regions_mut();
    let mut regions: Vec<Option<Vec<&mut [u8]>>> = regions.into_iter().map(Some).collect();

    let mut tasks = Vec::new();
    for &(group, batches) in inputs {
        let layout = &layouts[group.index()];
        let Some(fields) = regions[group.index()].take() else {
            continue;
        };
        for (field, region) in fields.into_iter().enumerate() {
            tasks.push(FieldTask {
                layout,
                field,
                region,
                batches,
            });
        }
    }

    let mut total = CaptureStats::default();
    for stats in pool.run(tasks, capture_field) {
        total += stats;
    }
    total
}

fn capture_field(task: FieldTask<'_>) -> CaptureStats {
    let desc = task.layout.field(task.field);
    let mut stats = CaptureStats::default();
    for batch in task.batches {
        let column = batch.column(desc.type_id());
        for (row, &local) in batch.local_indices().iter().enumerate() {
            let range = task.layout.slot_in_field(task.field, local);
            let changed = capture_slot(desc, &mut task.region[range], live_value(column, row));
            stats.record(changed);
        }
    }
    stats
}

// ── Grouped strategy ───────────────────────────────────────────────

fn capture_grouped(
    container: &mut SnapshotContainer,
    inputs: &[CaptureInput<'_>],
    pool: &WorkerPool,
) -> CaptureStats {
    let (layouts, writer) = container.slot_writer();
    let tasks: Vec<(&GroupLayout, &RecordBatch)> = inputs
        .iter()
        .flat_map(|&(group, batches)| {
            let layout = &layouts[group.index()];
            batches.iter().map(move |batch| (layout, batch))
        })
        .collect();

    let mut total = CaptureStats::default();
    for stats in pool.run(tasks, |(layout, batch)| capture_batch(layout, batch, &writer)) {
        total += stats;
    }
    total
}

#[allow(unsafe_code)]
fn capture_batch(layout: &GroupLayout, batch: &RecordBatch, writer: &SlotWriter<'_>) -> CaptureStats {
    let columns: Vec<Option<&FieldColumn>> = layout
        .fields()
        .iter()
        .map(|desc| batch.column(desc.type_id()))
        .collect();
    let mut stats = CaptureStats::default();
    for (row, &local) in batch.local_indices().iter().enumerate() {
        for (field, desc) in layout.fields().iter().enumerate() {
            let range = layout.slot_range(field, local);
            // SAFETY: group regions and field sub-arrays never overlap, and
            // `check_inputs` proved each local index belongs to one record of
            // one listed group, so no other task touches this slot. The
            // slice is dropped before the next claim in this task.
            let slot = unsafe { writer.slot_mut(range) };
            stats.record(capture_slot(desc, slot, live_value(columns[field], row)));
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_container::GroupSpec;
    use keel_core::{FieldDef, FieldTypeId, LocalIndex, RecordHandle};

    const HP: FieldTypeId = FieldTypeId(1);
    const TAG: FieldTypeId = FieldTypeId(2);
    const PATH: FieldTypeId = FieldTypeId(3);

    fn container() -> SnapshotContainer {
        SnapshotContainer::new(&[GroupSpec::new(
            vec![
                FieldDef::scalar("hp", HP, 4).enableable(true),
                FieldDef::scalar("tag", TAG, 0),
                FieldDef::array("path", PATH, 2, 3),
            ],
            4,
        )])
        .unwrap()
    }

    fn full_batch(hp: [u8; 4], path: &[u8], enabled: bool) -> RecordBatch {
        let mut batch = RecordBatch::new([
            (HP, FieldColumn::scalar(4)),
            (TAG, FieldColumn::scalar(0)),
            (PATH, FieldColumn::array(2)),
        ]);
        batch.push(
            RecordHandle(1),
            LocalIndex(0),
            &[(HP, &hp, enabled), (TAG, &[], true), (PATH, path, true)],
        );
        batch
    }

    fn run(c: &mut SnapshotContainer, batches: &[RecordBatch], s: SchedulingStrategy) -> CaptureStats {
        capture(c, &[(GroupId(0), batches)], s, &WorkerPool::new(2))
    }

    #[test]
    fn present_fields_store_value_and_flags() {
        for strategy in [SchedulingStrategy::PerField, SchedulingStrategy::Grouped] {
            let mut c = container();
            let stats = run(&mut c, &[full_batch([1, 2, 3, 4], &[7, 7, 8, 8], false)], strategy);
            assert_eq!(stats.slots_written, 3);
            assert!(c.is_valid());

            let hp = c.slot(GroupId(0), 0, LocalIndex(0));
            assert_eq!(hp.meta.found_count(), 1);
            assert!(!hp.meta.is_enabled());
            assert_eq!(hp.value(), &[1, 2, 3, 4]);

            let tag = c.slot(GroupId(0), 1, LocalIndex(0));
            assert_eq!(tag.meta.found_count(), 1);
            assert!(tag.meta.is_enabled(), "non-enableable fields always store enabled");

            let path = c.slot(GroupId(0), 2, LocalIndex(0));
            assert_eq!(path.meta.found_count(), 2);
            assert_eq!(path.value(), &[7, 7, 8, 8]);
        }
    }

    #[test]
    fn second_identical_capture_is_unchanged() {
        let mut c = container();
        let batches = [full_batch([1, 2, 3, 4], &[1, 1], true)];
        let first = run(&mut c, &batches, SchedulingStrategy::PerField);
        assert_eq!(first.slots_changed, 3);
        let second = run(&mut c, &batches, SchedulingStrategy::PerField);
        assert_eq!(second.slots_changed, 0);
        assert!(!c.slot(GroupId(0), 0, LocalIndex(0)).meta.is_changed());

        let third = run(&mut c, &[full_batch([1, 2, 3, 5], &[1, 1], true)], SchedulingStrategy::Grouped);
        assert_eq!(third.slots_changed, 1);
        assert!(c.slot(GroupId(0), 0, LocalIndex(0)).meta.is_changed());
        assert!(!c.slot(GroupId(0), 2, LocalIndex(0)).meta.is_changed());
    }

    #[test]
    fn array_length_change_sets_changed() {
        let mut c = container();
        run(&mut c, &[full_batch([0; 4], &[1, 1, 2, 2], true)], SchedulingStrategy::PerField);
        run(&mut c, &[full_batch([0; 4], &[1, 1], true)], SchedulingStrategy::PerField);
        let path = c.slot(GroupId(0), 2, LocalIndex(0));
        assert_eq!(path.meta.found_count(), 1);
        assert!(path.meta.is_changed());
    }

    #[test]
    fn arrays_are_clamped_to_capacity() {
        let mut c = container();
        run(&mut c, &[full_batch([0; 4], &[1, 1, 2, 2, 3, 3, 4, 4], true)], SchedulingStrategy::Grouped);
        let path = c.slot(GroupId(0), 2, LocalIndex(0));
        assert_eq!(path.meta.found_count(), 3);
        assert_eq!(path.value(), &[1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn absent_field_writes_absent_header_and_keeps_payload() {
        let mut c = container();
        run(&mut c, &[full_batch([9, 9, 9, 9], &[], true)], SchedulingStrategy::PerField);

        let mut lacking = RecordBatch::new([(TAG, FieldColumn::scalar(0))]);
        lacking.push(RecordHandle(1), LocalIndex(0), &[(TAG, &[], true)]);
        let stats = run(&mut c, &[lacking.clone()], SchedulingStrategy::PerField);
        assert_eq!(stats.slots_changed, 1, "hp went from found to absent");

        let hp = c.slot(GroupId(0), 0, LocalIndex(0));
        assert_eq!(hp.meta, SlotMeta::new(0, false, true));
        assert_eq!(hp.payload, &[9, 9, 9, 9]);

        let again = run(&mut c, &[lacking], SchedulingStrategy::PerField);
        assert_eq!(again.slots_changed, 0);
        assert_eq!(c.slot(GroupId(0), 0, LocalIndex(0)).meta, SlotMeta::ABSENT);
    }

    #[test]
    fn untouched_slots_stay_zero() {
        let mut c = container();
        run(&mut c, &[full_batch([1; 4], &[], true)], SchedulingStrategy::Grouped);
        assert_eq!(c.slot(GroupId(0), 0, LocalIndex(3)).meta, SlotMeta::ABSENT);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn local_index_past_record_count_panics() {
        let mut c = container();
        let mut batch = RecordBatch::new([(TAG, FieldColumn::scalar(0))]);
        batch.push(RecordHandle(1), LocalIndex(4), &[(TAG, &[], true)]);
        run(&mut c, &[batch], SchedulingStrategy::PerField);
    }

    #[test]
    #[should_panic(expected = "claimed by two records")]
    fn shared_local_index_panics() {
        let mut c = container();
        let mut batch = RecordBatch::new([(TAG, FieldColumn::scalar(0))]);
        batch.push(RecordHandle(1), LocalIndex(1), &[(TAG, &[], true)]);
        batch.push(RecordHandle(2), LocalIndex(1), &[(TAG, &[], true)]);
        run(&mut c, &[batch], SchedulingStrategy::Grouped);
    }

    #[test]
    #[should_panic(expected = "listed twice")]
    fn duplicate_group_panics() {
        let mut c = container();
        let none: &[RecordBatch] = &[];
        capture(
            &mut c,
            &[(GroupId(0), none), (GroupId(0), none)],
            SchedulingStrategy::PerField,
            &WorkerPool::default(),
        );
    }
}
