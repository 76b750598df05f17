//! The snapshot container: one buffer, many group regions.

use keel_core::{FieldDef, GroupId, LocalIndex, SlotMeta, ValidationError, META_SIZE};

use crate::error::LayoutError;
use crate::hash::{container_layout_hash, snapshot_hash};
use crate::layout::GroupLayout;
use crate::raw::SlotWriter;

/// Input for one group when building a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSpec {
    /// Persisted fields in baking order.
    pub fields: Vec<FieldDef>,
    /// Initial number of record slots.
    pub record_count: u32,
}

impl GroupSpec {
    /// A group spec from fields and an initial record count.
    pub fn new(fields: Vec<FieldDef>, record_count: u32) -> Self {
        Self {
            fields,
            record_count,
        }
    }
}

/// Read-only view of one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotView<'a> {
    /// Decoded metadata header.
    pub meta: SlotMeta,
    /// The whole payload area, including stale bytes past the found count.
    pub payload: &'a [u8],
    element_size: usize,
}

impl<'a> SlotView<'a> {
    /// The live part of the payload: `found_count` elements.
    pub fn value(&self) -> &'a [u8] {
        &self.payload[..self.meta.found_count() as usize * self.element_size]
    }
}

/// Owns the packed byte buffer and the layouts of every group in it.
///
/// Group `n` in the layout list is addressed as `GroupId(n)`. Regions are
/// packed back to back in group order starting at offset 0, so the buffer
/// length always equals the sum of all group region lengths.
///
/// A container starts out invalid; it becomes valid once a capture or a
/// validated load has filled it, and is marked invalid again when a load
/// into it is rejected.
#[derive(Clone, Debug)]
pub struct SnapshotContainer {
    pub(crate) data: Vec<u8>,
    pub(crate) groups: Vec<GroupLayout>,
    layout_hash: u64,
    valid: bool,
}

impl SnapshotContainer {
    /// Build layouts for `specs` in order and allocate a zeroed buffer.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if any group cannot be laid out or the
    /// total size overflows.
    pub fn new(specs: &[GroupSpec]) -> Result<Self, LayoutError> {
        let mut groups = Vec::with_capacity(specs.len());
        let mut cursor = 0usize;
        for spec in specs {
            let layout = GroupLayout::build(&spec.fields, spec.record_count, cursor)?;
            cursor = layout.region().end;
            groups.push(layout);
        }
        let layout_hash = container_layout_hash(&groups);
        Ok(Self {
            data: vec![0; cursor],
            groups,
            layout_hash,
            valid: false,
        })
    }

    /// Total buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Group layouts in container order.
    pub fn groups(&self) -> &[GroupLayout] {
        &self.groups
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Layout of `group`, if it exists.
    pub fn group(&self, group: GroupId) -> Option<&GroupLayout> {
        self.groups.get(group.index())
    }

    /// Record count of every group, in group order.
    pub fn record_counts(&self) -> Vec<u32> {
        self.groups.iter().map(GroupLayout::record_count).collect()
    }

    /// Total record capacity across groups.
    pub fn total_capacity(&self) -> u64 {
        self.groups.iter().map(|g| g.record_count() as u64).sum()
    }

    /// Layout compatibility hash of the whole container.
    pub fn layout_hash(&self) -> u64 {
        self.layout_hash
    }

    /// Layout hash with the current record counts folded in.
    ///
    /// This is what a serialized snapshot of the container carries; it
    /// changes whenever a resize changes any group's record count.
    pub fn snapshot_hash(&self) -> u64 {
        snapshot_hash(self.layout_hash, &self.groups)
    }

    /// Whether the container holds usable data.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Mark the container as holding usable data.
    pub fn mark_valid(&mut self) {
        self.valid = true;
    }

    /// Mark the container as unusable until the next capture or load.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Whether `other` shares this container's layout and record counts.
    pub fn compatible_with(&self, other: &SnapshotContainer) -> bool {
        self.check_compatible(other).is_ok()
    }

    /// Explain why `other` is not compatible with this container.
    pub fn check_compatible(&self, other: &SnapshotContainer) -> Result<(), ValidationError> {
        if self.layout_hash != other.layout_hash {
            return Err(ValidationError::LayoutHashMismatch {
                expected: self.layout_hash,
                found: other.layout_hash,
            });
        }
        if self.groups.len() != other.groups.len() {
            return Err(ValidationError::GroupCountMismatch {
                expected: self.groups.len(),
                found: other.groups.len(),
            });
        }
        for (i, (mine, theirs)) in self.groups.iter().zip(&other.groups).enumerate() {
            if mine.record_count() != theirs.record_count() {
                return Err(ValidationError::RecordCountMismatch {
                    group: GroupId(i as u32),
                    expected: mine.record_count(),
                    found: theirs.record_count(),
                });
            }
        }
        Ok(())
    }

    /// Check a serialized snapshot's header against this container.
    ///
    /// `snapshot_hash` is compared against [`Self::snapshot_hash`], so a
    /// snapshot whose groups match but whose per-group record counts
    /// differ is rejected even when the totals agree.
    pub fn validate_header(
        &self,
        snapshot_hash: u64,
        capacity: u64,
        data_len: u64,
    ) -> Result<(), ValidationError> {
        if capacity != self.total_capacity() {
            return Err(ValidationError::CapacityMismatch {
                expected: self.total_capacity(),
                found: capacity,
            });
        }
        let expected = self.snapshot_hash();
        if snapshot_hash != expected {
            return Err(ValidationError::LayoutHashMismatch {
                expected,
                found: snapshot_hash,
            });
        }
        if data_len != self.data.len() as u64 {
            return Err(ValidationError::DataLengthMismatch {
                expected: self.data.len() as u64,
                found: data_len,
            });
        }
        Ok(())
    }

    /// Replace the buffer contents with `bytes` after validating the
    /// header values that accompany them.
    ///
    /// On mismatch the container is marked invalid and left otherwise
    /// untouched.
    pub fn load_raw(
        &mut self,
        snapshot_hash: u64,
        capacity: u64,
        bytes: &[u8],
    ) -> Result<(), ValidationError> {
        if let Err(e) = self.validate_header(snapshot_hash, capacity, bytes.len() as u64) {
            self.valid = false;
            return Err(e);
        }
        self.data.copy_from_slice(bytes);
        self.valid = true;
        Ok(())
    }

    /// Copy the contents of a compatible container into this one.
    pub fn copy_from(&mut self, other: &SnapshotContainer) -> Result<(), ValidationError> {
        if let Err(e) = self.check_compatible(other) {
            self.valid = false;
            return Err(e);
        }
        self.data.copy_from_slice(&other.data);
        self.valid = other.valid;
        Ok(())
    }

    fn layout(&self, group: GroupId) -> &GroupLayout {
        self.groups.get(group.index()).unwrap_or_else(|| {
            panic!(
                "group {group} out of range for container with {} groups",
                self.groups.len()
            )
        })
    }

    /// Bytes of `group`'s region.
    ///
    /// # Panics
    ///
    /// Panics if `group` does not exist.
    pub fn group_bytes(&self, group: GroupId) -> &[u8] {
        &self.data[self.layout(group).region()]
    }

    /// Bytes of one field sub-array.
    ///
    /// # Panics
    ///
    /// Panics if `group` or `field` does not exist.
    pub fn field_bytes(&self, group: GroupId, field: usize) -> &[u8] {
        &self.data[self.layout(group).field_range(field)]
    }

    /// One slot of one field.
    ///
    /// # Panics
    ///
    /// Panics if the group or field does not exist or `local` is past the
    /// group's record count.
    pub fn slot(&self, group: GroupId, field: usize, local: LocalIndex) -> SlotView<'_> {
        let layout = self.layout(group);
        let bytes = &self.data[layout.slot_range(field, local)];
        SlotView {
            meta: SlotMeta::read(bytes),
            payload: &bytes[META_SIZE..],
            element_size: layout.field(field).element_size(),
        }
    }

    /// Split `group`'s region into one mutable sub-array per field.
    ///
    /// # Panics
    ///
    /// Panics if `group` does not exist.
    pub fn field_regions_mut(&mut self, group: GroupId) -> Vec<&mut [u8]> {
        let range = self.layout(group).region();
        let layout = &self.groups[group.index()];
        split_fields(layout, &mut self.data[range])
    }

    /// Split the whole buffer into per-group lists of per-field sub-arrays,
    /// alongside the layouts that describe them.
    pub fn all_field_regions_mut(&mut self) -> (&[GroupLayout], Vec<Vec<&mut [u8]>>) {
        let mut rest: &mut [u8] = &mut self.data;
        let mut out = Vec::with_capacity(self.groups.len());
        for layout in &self.groups {
            let (region, tail) = std::mem::take(&mut rest).split_at_mut(layout.region_len());
            out.push(split_fields(layout, region));
            rest = tail;
        }
        (&self.groups, out)
    }

    /// Shared writer over the whole buffer for scattered slot writes.
    pub fn slot_writer(&mut self) -> (&[GroupLayout], SlotWriter<'_>) {
        (&self.groups, SlotWriter::new(&mut self.data))
    }
}

fn split_fields<'a>(layout: &GroupLayout, region: &'a mut [u8]) -> Vec<&'a mut [u8]> {
    let mut rest = region;
    let mut out = Vec::with_capacity(layout.field_count());
    for i in 0..layout.field_count() {
        let len = layout.field_range_local(i).len();
        let (field, tail) = std::mem::take(&mut rest).split_at_mut(len);
        out.push(field);
        rest = tail;
    }
    out
}
