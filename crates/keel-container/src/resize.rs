//! In-place resize of a packed container.
//!
//! Every group's region and every field sub-array inside it depends on the
//! record counts of everything before it, so a change to one group's count
//! shifts bytes throughout the buffer. Resize repacks in two passes so
//! that no write ever lands on bytes that have not been read yet:
//!
//! 1. **Shrink pass, low to high.** Each group is truncated to
//!    `min(old, new)` records. A shrinking group first compacts its field
//!    sub-arrays within its own old region, then the group moves left to
//!    its packed position. Every destination is at or before its source,
//!    and earlier groups only ever got smaller.
//! 2. **Grow pass, high to low.** Each group moves right to its final
//!    offset, then a growing group expands its field sub-arrays in reverse
//!    field order and zero-fills the new slots. Destinations are at or
//!    after their sources, and later groups are already in place.
//!
//! The buffer is grown before the passes and truncated after them.

use keel_core::{GroupId, LocalIndex};
use log::debug;

use crate::container::SnapshotContainer;
use crate::error::LayoutError;
use crate::layout::GroupLayout;

/// What a resize call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Every group already had the requested count; no bytes moved.
    Unchanged,
    /// The buffer was repacked.
    Resized {
        /// Buffer length before the resize.
        old_len: usize,
        /// Buffer length after the resize.
        new_len: usize,
    },
}

impl SnapshotContainer {
    /// Change the record count of every group, preserving the slots of
    /// local indices below `min(old, new)` and zero-filling new slots.
    ///
    /// Records whose local index is at or past a group's new count are
    /// dropped. Callers must reassign such records before capturing again.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Overflow`] if the new sizes do not fit in
    /// `usize`. The container is left untouched in that case.
    ///
    /// # Panics
    ///
    /// Panics if `new_counts.len()` differs from the number of groups.
    pub fn resize(&mut self, new_counts: &[u32]) -> Result<ResizeOutcome, LayoutError> {
        assert_eq!(
            new_counts.len(),
            self.groups.len(),
            "resize needs one record count per group"
        );
        if self
            .groups
            .iter()
            .zip(new_counts)
            .all(|(g, &count)| g.record_count() == count)
        {
            return Ok(ResizeOutcome::Unchanged);
        }

        // Plan every layout up front so overflow aborts before any byte moves.
        let mut finals = Vec::with_capacity(self.groups.len());
        let mut staged = Vec::with_capacity(self.groups.len());
        let mut final_cursor = 0usize;
        let mut staged_cursor = 0usize;
        for (group, &count) in self.groups.iter().zip(new_counts) {
            let final_layout = group.with_placement(count, final_cursor)?;
            final_cursor = final_layout.region().end;
            finals.push(final_layout);

            let kept = group.record_count().min(count);
            let staged_layout = group.with_placement(kept, staged_cursor)?;
            staged_cursor = staged_layout.region().end;
            staged.push(staged_layout);
        }

        let old_len = self.data.len();
        let new_len = final_cursor;
        debug_assert_eq!(
            old_len,
            self.groups.iter().map(GroupLayout::region_len).sum::<usize>()
        );

        if new_len > old_len {
            self.data.resize(new_len, 0);
        }

        for (old, staged) in self.groups.iter().zip(&staged) {
            if staged.record_count() < old.record_count() {
                compact_fields(&mut self.data, old, staged);
            }
            if staged.offset() != old.offset() {
                let src = old.offset();
                self.data
                    .copy_within(src..src + staged.region_len(), staged.offset());
            }
        }

        for (staged, fin) in staged.iter().zip(&finals).rev() {
            if fin.offset() != staged.offset() {
                self.data.copy_within(staged.region(), fin.offset());
            }
            if fin.record_count() > staged.record_count() {
                expand_fields(&mut self.data, staged, fin);
            }
        }

        if new_len < old_len {
            self.data.truncate(new_len);
        }

        debug!(
            "container resized {old_len} -> {new_len} bytes, counts {:?} -> {:?}",
            self.record_counts(),
            new_counts
        );
        self.groups = finals;
        Ok(ResizeOutcome::Resized { old_len, new_len })
    }

    /// Whether `local` is still addressable in `group` after a resize.
    pub fn contains_local(&self, group: GroupId, local: LocalIndex) -> bool {
        self.group(group)
            .is_some_and(|layout| local.0 < layout.record_count())
    }
}

/// Compact a shrinking group's field sub-arrays inside its old region.
///
/// Field `f` moves from its old offset to the running total of the kept
/// sizes of fields before it, which is never past the old offset.
fn compact_fields(data: &mut [u8], old: &GroupLayout, staged: &GroupLayout) {
    let base = old.offset();
    for (from, to) in old.fields().iter().zip(staged.fields()) {
        let len = staged.record_count() as usize * from.stride();
        let src = base + from.offset;
        let dst = base + to.offset;
        debug_assert!(dst <= src);
        if src != dst && len > 0 {
            data.copy_within(src..src + len, dst);
        }
    }
}

/// Expand a growing group's field sub-arrays in place, last field first,
/// and zero the slots past the kept records.
///
/// The group region already sits at `fin.offset()`.
fn expand_fields(data: &mut [u8], staged: &GroupLayout, fin: &GroupLayout) {
    let base = fin.offset();
    for (from, to) in staged.fields().iter().zip(fin.fields()).rev() {
        let stride = from.stride();
        let kept_len = staged.record_count() as usize * stride;
        let new_len = fin.record_count() as usize * stride;
        let src = base + from.offset;
        let dst = base + to.offset;
        debug_assert!(dst >= src);
        if src != dst && kept_len > 0 {
            data.copy_within(src..src + kept_len, dst);
        }
        data[dst + kept_len..dst + new_len].fill(0);
    }
}
