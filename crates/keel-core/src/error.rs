//! Error types shared across the Keel workspace.

use std::error::Error;
use std::fmt;

use crate::id::GroupId;

/// A field definition that cannot be laid out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldDefError {
    /// Array field declared with room for zero elements.
    ZeroCapacity {
        /// Name of the offending field.
        name: String,
    },
    /// Array field with zero-sized elements; lengths could not be
    /// recovered from byte counts.
    ZeroSizedElement {
        /// Name of the offending field.
        name: String,
    },
    /// Array capacity exceeds the slot metadata found-count ceiling.
    TooManyElements {
        /// Name of the offending field.
        name: String,
        /// The declared capacity.
        max_elements: u32,
    },
}

impl fmt::Display for FieldDefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity { name } => {
                write!(f, "array field '{name}' has zero capacity")
            }
            Self::ZeroSizedElement { name } => {
                write!(f, "array field '{name}' has zero-sized elements")
            }
            Self::TooManyElements { name, max_elements } => {
                write!(
                    f,
                    "array field '{name}' capacity {max_elements} exceeds the 16383 element ceiling"
                )
            }
        }
    }
}

impl Error for FieldDefError {}

/// A snapshot that does not match the container it is loaded into.
///
/// Validation failures are recoverable: the target container is marked
/// invalid and the load is rejected as a whole.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Layout hashes differ.
    LayoutHashMismatch {
        /// Hash of the target container.
        expected: u64,
        /// Hash carried by the snapshot.
        found: u64,
    },
    /// Total record capacity differs.
    CapacityMismatch {
        /// Capacity of the target container.
        expected: u64,
        /// Capacity carried by the snapshot.
        found: u64,
    },
    /// Raw data length differs.
    DataLengthMismatch {
        /// Byte length of the target container.
        expected: u64,
        /// Byte length carried by the snapshot.
        found: u64,
    },
    /// Number of groups differs.
    GroupCountMismatch {
        /// Groups in the target container.
        expected: usize,
        /// Groups in the source.
        found: usize,
    },
    /// A group's record count differs.
    RecordCountMismatch {
        /// The group that differs.
        group: GroupId,
        /// Record count in the target container.
        expected: u32,
        /// Record count in the source.
        found: u32,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LayoutHashMismatch { expected, found } => write!(
                f,
                "layout hash mismatch: expected={expected:#018x}, found={found:#018x}"
            ),
            Self::CapacityMismatch { expected, found } => {
                write!(f, "record capacity mismatch: expected {expected}, found {found}")
            }
            Self::DataLengthMismatch { expected, found } => {
                write!(f, "data length mismatch: expected {expected} bytes, found {found}")
            }
            Self::GroupCountMismatch { expected, found } => {
                write!(f, "group count mismatch: expected {expected}, found {found}")
            }
            Self::RecordCountMismatch {
                group,
                expected,
                found,
            } => write!(
                f,
                "group {group} record count mismatch: expected {expected}, found {found}"
            ),
        }
    }
}

impl Error for ValidationError {}
