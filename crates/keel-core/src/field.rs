//! Field definitions handed over by the baking step.

use crate::error::FieldDefError;
use crate::id::FieldTypeId;
use crate::meta::{MAX_FOUND_COUNT, META_SIZE};

/// Whether a field holds one value or a bounded array of values per record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Exactly one element per record.
    Scalar,
    /// Up to `max_elements` elements per record.
    Array {
        /// Capacity of the slot in elements. Longer live arrays are
        /// clamped at capture.
        max_elements: u32,
    },
}

/// Definition of a persisted field within a record group.
///
/// Definitions are produced by the external baking step in a fixed
/// order; that order is part of the layout and of the layout hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    /// Human-readable name for diagnostics.
    pub name: String,
    /// Stable type identifier folded into the layout hash.
    pub type_id: FieldTypeId,
    /// Size in bytes of one element. Zero for tag fields.
    pub element_size: u32,
    /// Scalar or bounded array.
    pub kind: FieldKind,
    /// Whether the field type can be enabled and disabled independently
    /// of its presence. Non-enableable fields always capture `enabled`.
    pub enableable: bool,
}

impl FieldDef {
    /// A scalar field definition.
    pub fn scalar(name: impl Into<String>, type_id: FieldTypeId, element_size: u32) -> Self {
        Self {
            name: name.into(),
            type_id,
            element_size,
            kind: FieldKind::Scalar,
            enableable: false,
        }
    }

    /// An array field definition with room for `max_elements` elements.
    pub fn array(
        name: impl Into<String>,
        type_id: FieldTypeId,
        element_size: u32,
        max_elements: u32,
    ) -> Self {
        Self {
            name: name.into(),
            type_id,
            element_size,
            kind: FieldKind::Array { max_elements },
            enableable: false,
        }
    }

    /// Mark the field as independently enableable.
    pub fn enableable(mut self, enableable: bool) -> Self {
        self.enableable = enableable;
        self
    }

    /// Whether this is an array field.
    pub fn is_array(&self) -> bool {
        matches!(self.kind, FieldKind::Array { .. })
    }

    /// Element capacity of one slot (1 for scalars).
    pub fn max_elements(&self) -> u32 {
        match self.kind {
            FieldKind::Scalar => 1,
            FieldKind::Array { max_elements } => max_elements,
        }
    }

    /// Payload bytes reserved per slot: `element_size * max_elements`.
    pub fn payload_size(&self) -> usize {
        self.element_size as usize * self.max_elements() as usize
    }

    /// Bytes per slot including the metadata header.
    pub fn stride(&self) -> usize {
        self.payload_size() + META_SIZE
    }

    /// Check the definition against the metadata ceiling.
    pub fn validate(&self) -> Result<(), FieldDefError> {
        if let FieldKind::Array { max_elements } = self.kind {
            if max_elements == 0 {
                return Err(FieldDefError::ZeroCapacity {
                    name: self.name.clone(),
                });
            }
            if self.element_size == 0 {
                return Err(FieldDefError::ZeroSizedElement {
                    name: self.name.clone(),
                });
            }
            if max_elements > MAX_FOUND_COUNT as u32 {
                return Err(FieldDefError::TooManyElements {
                    name: self.name.clone(),
                    max_elements,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_stride_includes_header() {
        let def = FieldDef::scalar("position", FieldTypeId(1), 12);
        assert_eq!(def.max_elements(), 1);
        assert_eq!(def.payload_size(), 12);
        assert_eq!(def.stride(), 14);
        assert!(!def.is_array());
    }

    #[test]
    fn tag_field_is_header_only() {
        let def = FieldDef::scalar("frozen", FieldTypeId(2), 0);
        assert_eq!(def.stride(), META_SIZE);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn array_stride_is_capacity_times_element() {
        let def = FieldDef::array("inventory", FieldTypeId(3), 8, 16);
        assert!(def.is_array());
        assert_eq!(def.payload_size(), 128);
        assert_eq!(def.stride(), 130);
    }

    #[test]
    fn array_capacity_ceiling() {
        assert!(FieldDef::array("a", FieldTypeId(4), 1, 16383)
            .validate()
            .is_ok());
        assert!(matches!(
            FieldDef::array("a", FieldTypeId(4), 1, 16384).validate(),
            Err(FieldDefError::TooManyElements {
                max_elements: 16384,
                ..
            })
        ));
        assert!(matches!(
            FieldDef::array("a", FieldTypeId(4), 1, 0).validate(),
            Err(FieldDefError::ZeroCapacity { .. })
        ));
    }

    #[test]
    fn zero_sized_array_element_rejected() {
        assert!(matches!(
            FieldDef::array("a", FieldTypeId(4), 0, 4).validate(),
            Err(FieldDefError::ZeroSizedElement { .. })
        ));
    }

    #[test]
    fn enableable_builder() {
        let def = FieldDef::scalar("renderable", FieldTypeId(5), 4).enableable(true);
        assert!(def.enableable);
    }
}
