//! Layout builder: byte offsets and strides for one record group.
//!
//! [`GroupLayout::build`] walks the fields in the caller-supplied order and
//! assigns each field sub-array an offset equal to the running total of
//! `record_count * stride` of the fields before it. The walk is pure and
//! deterministic, so identical inputs always produce identical layouts.

use std::ops::Range;
use std::sync::Arc;

use keel_core::{FieldDef, FieldTypeId, LocalIndex, META_SIZE};

use crate::error::LayoutError;

/// A field definition placed inside a group region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// The definition handed over by the baking step.
    pub def: FieldDef,
    /// Byte offset of this field's sub-array from the group region start.
    pub offset: usize,
}

impl FieldDescriptor {
    /// Stable type identifier.
    pub fn type_id(&self) -> FieldTypeId {
        self.def.type_id
    }

    /// Bytes of one element.
    pub fn element_size(&self) -> usize {
        self.def.element_size as usize
    }

    /// Element capacity of one slot.
    pub fn max_elements(&self) -> usize {
        self.def.max_elements() as usize
    }

    /// Whether the field is an array.
    pub fn is_array(&self) -> bool {
        self.def.is_array()
    }

    /// Whether the field supports an independent enabled flag.
    pub fn enableable(&self) -> bool {
        self.def.enableable
    }

    /// Payload capacity of one slot in bytes.
    pub fn payload_size(&self) -> usize {
        self.def.payload_size()
    }

    /// Bytes per slot: header plus payload.
    pub fn stride(&self) -> usize {
        self.def.stride()
    }
}

/// Placement of one record group inside the container buffer.
///
/// The field table is shared behind an `Arc` so capture and restore tasks
/// can hold it concurrently. A layout is never mutated; resize replaces it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupLayout {
    fields: Arc<[FieldDescriptor]>,
    record_count: u32,
    offset: usize,
    size_per_record: usize,
}

impl GroupLayout {
    /// Lay out `defs` for `record_count` records starting at `start_offset`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Field`] for invalid definitions,
    /// [`LayoutError::DuplicateField`] if a type repeats, and
    /// [`LayoutError::Overflow`] if the region would not fit in `usize`.
    pub fn build(
        defs: &[FieldDef],
        record_count: u32,
        start_offset: usize,
    ) -> Result<Self, LayoutError> {
        for (i, def) in defs.iter().enumerate() {
            def.validate()?;
            if defs[..i].iter().any(|d| d.type_id == def.type_id) {
                return Err(LayoutError::DuplicateField {
                    type_id: def.type_id,
                });
            }
        }
        Self::place(defs.iter().cloned(), record_count, start_offset)
    }

    /// The same fields re-laid out for a different record count and offset.
    pub fn with_placement(&self, record_count: u32, offset: usize) -> Result<Self, LayoutError> {
        Self::place(
            self.fields.iter().map(|f| f.def.clone()),
            record_count,
            offset,
        )
    }

    fn place(
        defs: impl Iterator<Item = FieldDef>,
        record_count: u32,
        start_offset: usize,
    ) -> Result<Self, LayoutError> {
        let overflow = |what: &str| LayoutError::Overflow {
            reason: format!("{what} for {record_count} records"),
        };

        let mut fields = Vec::new();
        let mut cursor = 0usize;
        let mut size_per_record = 0usize;
        for def in defs {
            let stride = def
                .element_size
                .checked_mul(def.max_elements())
                .and_then(|p| (p as usize).checked_add(META_SIZE))
                .ok_or_else(|| overflow(&format!("stride of field '{}'", def.name)))?;
            let sub_array = stride
                .checked_mul(record_count as usize)
                .ok_or_else(|| overflow(&format!("sub-array of field '{}'", def.name)))?;
            fields.push(FieldDescriptor {
                def,
                offset: cursor,
            });
            cursor = cursor
                .checked_add(sub_array)
                .ok_or_else(|| overflow("group region"))?;
            size_per_record = size_per_record
                .checked_add(stride)
                .ok_or_else(|| overflow("record size"))?;
        }
        start_offset
            .checked_add(cursor)
            .ok_or_else(|| overflow("group region end"))?;

        Ok(Self {
            fields: fields.into(),
            record_count,
            offset: start_offset,
            size_per_record,
        })
    }

    /// Field descriptors in layout order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Shared handle to the field table.
    pub fn shared_fields(&self) -> Arc<[FieldDescriptor]> {
        Arc::clone(&self.fields)
    }

    /// Descriptor of the field at `field`.
    pub fn field(&self, field: usize) -> &FieldDescriptor {
        &self.fields[field]
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Position of the field with `type_id`, if present.
    pub fn field_position(&self, type_id: FieldTypeId) -> Option<usize> {
        self.fields.iter().position(|f| f.type_id() == type_id)
    }

    /// Number of record slots per field.
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Byte offset of the group region within the container.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes per record across all fields, headers included.
    pub fn size_per_record(&self) -> usize {
        self.size_per_record
    }

    /// Total bytes of the group region.
    pub fn region_len(&self) -> usize {
        self.record_count as usize * self.size_per_record
    }

    /// Absolute byte range of the group region.
    pub fn region(&self) -> Range<usize> {
        self.offset..self.offset + self.region_len()
    }

    /// Byte range of `field`'s sub-array relative to the group region.
    pub fn field_range_local(&self, field: usize) -> Range<usize> {
        let desc = &self.fields[field];
        let start = desc.offset;
        start..start + self.record_count as usize * desc.stride()
    }

    /// Absolute byte range of `field`'s sub-array.
    pub fn field_range(&self, field: usize) -> Range<usize> {
        let local = self.field_range_local(field);
        self.offset + local.start..self.offset + local.end
    }

    /// Absolute byte range of one slot.
    ///
    /// # Panics
    ///
    /// Panics if `local` is not below the record count. An out-of-range
    /// index means the live records and the container disagree on layout,
    /// and writing anyway would corrupt a neighbouring group.
    pub fn slot_range(&self, field: usize, local: LocalIndex) -> Range<usize> {
        let within = self.slot_in_field(field, local);
        let base = self.offset + self.fields[field].offset;
        base + within.start..base + within.end
    }

    /// Byte range of one slot relative to the start of `field`'s sub-array.
    ///
    /// # Panics
    ///
    /// Panics if `local` is not below the record count.
    pub fn slot_in_field(&self, field: usize, local: LocalIndex) -> Range<usize> {
        assert!(
            local.0 < self.record_count,
            "local index {local} out of bounds for group with {} records",
            self.record_count
        );
        let stride = self.fields[field].stride();
        let start = local.get() * stride;
        start..start + stride
    }
}
