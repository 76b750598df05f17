//! Container-specific error types.

use std::error::Error;
use std::fmt;

use keel_core::{FieldDefError, FieldTypeId};

/// Errors that can occur while building layouts or sizing a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// A field definition is invalid.
    Field(FieldDefError),
    /// The same field type appears twice in one group.
    DuplicateField {
        /// The repeated type.
        type_id: FieldTypeId,
    },
    /// Offset or size arithmetic overflowed `usize`.
    Overflow {
        /// Description of the computation that overflowed.
        reason: String,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(e) => write!(f, "invalid field: {e}"),
            Self::DuplicateField { type_id } => {
                write!(f, "field type {type_id} appears more than once in a group")
            }
            Self::Overflow { reason } => write!(f, "layout overflow: {reason}"),
        }
    }
}

impl Error for LayoutError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldDefError> for LayoutError {
    fn from(e: FieldDefError) -> Self {
        Self::Field(e)
    }
}
