//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a record group within a snapshot container.
///
/// Groups are registered when the container is built and assigned
/// sequential IDs. `GroupId(n)` corresponds to the n-th group layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

impl GroupId {
    /// The group's position in the container's layout list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GroupId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Stable identifier of a field's type.
///
/// Produced by the baking step and folded into the layout hash, so it
/// must be identical across builds for containers to stay compatible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldTypeId(pub u64);

impl fmt::Display for FieldTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl From<u64> for FieldTypeId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Opaque handle of a live record, owned by the host runtime.
///
/// Deferred structural mutations are keyed by this handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordHandle(pub u64);

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordHandle {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Per-group slot index of a live record.
///
/// Unique within its group and in `[0, record_count)`. Assigned once when
/// the record is associated with a container and stable until the
/// container is resized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalIndex(pub u32);

impl LocalIndex {
    /// The index as a `usize` for slot arithmetic.
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LocalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LocalIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a snapshot container within a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u32);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ContainerId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Frame identifier stored in the on-disk header.
///
/// Informational only; never used for validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub i32);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for FrameId {
    fn from(v: i32) -> Self {
        Self(v)
    }
}
