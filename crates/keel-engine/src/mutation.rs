//! Deferred structural mutations emitted by restore.
//!
//! Restore tasks may not change which fields a record carries while
//! batches are being iterated, so they record the change instead. Every
//! task fills its own [`MutationBuffer`]; the buffers are merged after all
//! tasks have joined, sorted into a canonical order, and applied on the
//! calling thread through a [`StructuralSink`].

use smallvec::SmallVec;

use keel_core::{FieldTypeId, RecordHandle};

/// Inline capacity for added field values; larger values spill to the heap.
pub const INLINE_VALUE_BYTES: usize = 32;

/// A structural change to apply to a live record after restore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeferredMutation {
    /// Give the record `field`, initialised with `value`.
    AddField {
        /// Target record.
        handle: RecordHandle,
        /// Field to add.
        field: FieldTypeId,
        /// Initial value bytes.
        value: SmallVec<[u8; INLINE_VALUE_BYTES]>,
    },
    /// Take `field` away from the record.
    RemoveField {
        /// Target record.
        handle: RecordHandle,
        /// Field to remove.
        field: FieldTypeId,
    },
    /// Set the enabled flag of `field` on the record.
    SetEnabled {
        /// Target record.
        handle: RecordHandle,
        /// Field whose flag changes.
        field: FieldTypeId,
        /// New flag value.
        enabled: bool,
    },
}

impl DeferredMutation {
    /// The record this mutation targets.
    pub fn handle(&self) -> RecordHandle {
        match self {
            Self::AddField { handle, .. }
            | Self::RemoveField { handle, .. }
            | Self::SetEnabled { handle, .. } => *handle,
        }
    }

    /// The field this mutation targets.
    pub fn field(&self) -> FieldTypeId {
        match self {
            Self::AddField { field, .. }
            | Self::RemoveField { field, .. }
            | Self::SetEnabled { field, .. } => *field,
        }
    }

    /// Position within one (record, field) pair: removals first, then
    /// additions, then flag changes, which may target a freshly added field.
    fn kind_rank(&self) -> u8 {
        match self {
            Self::RemoveField { .. } => 0,
            Self::AddField { .. } => 1,
            Self::SetEnabled { .. } => 2,
        }
    }
}

/// Receives deferred mutations. Implemented by the host's record store.
pub trait StructuralSink {
    /// Add `field` with `value` to the record.
    fn add_field(&mut self, handle: RecordHandle, field: FieldTypeId, value: &[u8]);
    /// Remove `field` from the record.
    fn remove_field(&mut self, handle: RecordHandle, field: FieldTypeId);
    /// Set the enabled flag of `field` on the record.
    fn set_enabled(&mut self, handle: RecordHandle, field: FieldTypeId, enabled: bool);
}

#[derive(Clone, Debug)]
struct Entry {
    field_order: usize,
    mutation: DeferredMutation,
}

/// Append-only per-task buffer of mutations.
#[derive(Clone, Debug, Default)]
pub struct MutationBuffer {
    entries: Vec<Entry>,
}

impl MutationBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation. `field_order` is the field's position in its
    /// group layout and only affects the final ordering.
    pub fn push(&mut self, field_order: usize, mutation: DeferredMutation) {
        self.entries.push(Entry {
            field_order,
            mutation,
        });
    }

    /// Move every entry of `other` into this buffer.
    pub fn append(&mut self, other: &mut MutationBuffer) {
        self.entries.append(&mut other.entries);
    }

    /// Number of buffered mutations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sort into canonical order: by record handle, then field order, then
    /// mutation kind. The result does not depend on how work was split
    /// into tasks.
    pub fn finish(mut self) -> MutationList {
        self.entries.sort_by(|a, b| {
            (a.mutation.handle(), a.field_order, a.mutation.kind_rank()).cmp(&(
                b.mutation.handle(),
                b.field_order,
                b.mutation.kind_rank(),
            ))
        });
        MutationList {
            mutations: self.entries.into_iter().map(|e| e.mutation).collect(),
        }
    }
}

/// The merged, ordered result of a restore, waiting to be applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use = "deferred mutations do nothing until applied"]
pub struct MutationList {
    mutations: Vec<DeferredMutation>,
}

impl MutationList {
    /// The mutations in application order.
    pub fn as_slice(&self) -> &[DeferredMutation] {
        &self.mutations
    }

    /// Number of mutations.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Whether there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Apply every mutation to `sink`, in order, on the calling thread.
    /// Returns the number applied.
    pub fn apply<S: StructuralSink + ?Sized>(self, sink: &mut S) -> usize {
        let count = self.mutations.len();
        for mutation in self.mutations {
            match mutation {
                DeferredMutation::AddField {
                    handle,
                    field,
                    value,
                } => sink.add_field(handle, field, &value),
                DeferredMutation::RemoveField { handle, field } => {
                    sink.remove_field(handle, field)
                }
                DeferredMutation::SetEnabled {
                    handle,
                    field,
                    enabled,
                } => sink.set_enabled(handle, field, enabled),
            }
        }
        count
    }

    /// The mutations as a vector.
    pub fn into_vec(self) -> Vec<DeferredMutation> {
        self.mutations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
    }

    impl StructuralSink for Recorder {
        fn add_field(&mut self, handle: RecordHandle, field: FieldTypeId, value: &[u8]) {
            self.log.push(format!("add {} {} {value:?}", handle.0, field.0));
        }
        fn remove_field(&mut self, handle: RecordHandle, field: FieldTypeId) {
            self.log.push(format!("remove {} {}", handle.0, field.0));
        }
        fn set_enabled(&mut self, handle: RecordHandle, field: FieldTypeId, enabled: bool) {
            self.log.push(format!("enable {} {} {enabled}", handle.0, field.0));
        }
    }

    fn add(h: u64, f: u64) -> DeferredMutation {
        DeferredMutation::AddField {
            handle: RecordHandle(h),
            field: FieldTypeId(f),
            value: smallvec![h as u8],
        }
    }

    fn enable(h: u64, f: u64) -> DeferredMutation {
        DeferredMutation::SetEnabled {
            handle: RecordHandle(h),
            field: FieldTypeId(f),
            enabled: true,
        }
    }

    fn remove(h: u64, f: u64) -> DeferredMutation {
        DeferredMutation::RemoveField {
            handle: RecordHandle(h),
            field: FieldTypeId(f),
        }
    }

    #[test]
    fn finish_orders_by_handle_field_then_kind() {
        let mut buf = MutationBuffer::new();
        buf.push(1, enable(2, 20));
        buf.push(0, remove(2, 10));
        buf.push(1, add(2, 20));
        buf.push(0, add(1, 10));
        let list = buf.finish();
        assert_eq!(
            list.as_slice(),
            &[add(1, 10), remove(2, 10), add(2, 20), enable(2, 20)]
        );
    }

    #[test]
    fn merge_order_does_not_matter() {
        let mut a = MutationBuffer::new();
        a.push(0, add(5, 1));
        a.push(1, remove(3, 2));
        let mut b = MutationBuffer::new();
        b.push(0, add(3, 1));
        b.push(0, enable(5, 1));

        let mut ab = a.clone();
        ab.append(&mut b.clone());
        let mut ba = b;
        ba.append(&mut a);
        assert_eq!(ab.len(), 4);
        assert_eq!(ab.finish(), ba.finish());
    }

    #[test]
    fn apply_drives_the_sink_in_order() {
        let mut buf = MutationBuffer::new();
        buf.push(0, enable(7, 4));
        buf.push(0, add(7, 4));
        let mut sink = Recorder::default();
        assert_eq!(buf.finish().apply(&mut sink), 2);
        assert_eq!(sink.log, vec!["add 7 4 [7]", "enable 7 4 true"]);
    }

    #[test]
    fn accessors() {
        let m = remove(9, 3);
        assert_eq!(m.handle(), RecordHandle(9));
        assert_eq!(m.field(), FieldTypeId(3));
        assert!(MutationBuffer::new().finish().is_empty());
    }
}
