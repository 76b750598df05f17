//! Live record batches: the host-runtime side of capture and restore.
//!
//! A [`RecordBatch`] is one chunk of records that share a field
//! composition. Each carried field is stored column-wise in a
//! [`FieldColumn`], so capture and restore tasks can borrow different
//! fields of the same batch independently.
//!
//! Records in one batch either all carry a field or all lack it; a record
//! that gains or loses a field moves to a batch with the matching
//! composition, which is why such changes are deferred during restore.

use indexmap::IndexMap;

use crate::field::FieldDef;
use crate::id::{FieldTypeId, LocalIndex, RecordHandle};

#[derive(Clone, Debug, PartialEq, Eq)]
enum ColumnData {
    /// `rows * element_size` packed bytes.
    Scalar(Vec<u8>),
    /// One byte vector per row, each a whole number of elements.
    Array(Vec<Vec<u8>>),
}

/// Values of one field for every row of a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldColumn {
    element_size: usize,
    data: ColumnData,
    enabled: Vec<bool>,
}

impl FieldColumn {
    /// An empty scalar column.
    pub fn scalar(element_size: usize) -> Self {
        Self {
            element_size,
            data: ColumnData::Scalar(Vec::new()),
            enabled: Vec::new(),
        }
    }

    /// An empty array column.
    ///
    /// # Panics
    ///
    /// Panics if `element_size` is zero; array lengths are derived from
    /// byte lengths.
    pub fn array(element_size: usize) -> Self {
        assert!(element_size > 0, "array columns need a non-zero element size");
        Self {
            element_size,
            data: ColumnData::Array(Vec::new()),
            enabled: Vec::new(),
        }
    }

    /// An empty column shaped for `def`.
    pub fn for_def(def: &FieldDef) -> Self {
        if def.is_array() {
            Self::array(def.element_size as usize)
        } else {
            Self::scalar(def.element_size as usize)
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    /// Whether this is an array column.
    pub fn is_array(&self) -> bool {
        matches!(self.data, ColumnData::Array(_))
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// The value bytes of `row`. For arrays, all elements back to back.
    pub fn get(&self, row: usize) -> &[u8] {
        match &self.data {
            ColumnData::Scalar(bytes) => {
                let start = row * self.element_size;
                &bytes[start..start + self.element_size]
            }
            ColumnData::Array(rows) => &rows[row],
        }
    }

    /// Number of elements in `row` (always 1 for scalars).
    pub fn element_count(&self, row: usize) -> usize {
        match &self.data {
            ColumnData::Scalar(_) => 1,
            ColumnData::Array(rows) => rows[row].len() / self.element_size,
        }
    }

    /// Overwrite the value of `row`. Array rows are resized to fit.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` does not hold exactly one element (scalars) or a
    /// whole number of elements (arrays).
    pub fn set(&mut self, row: usize, bytes: &[u8]) {
        let size = self.element_size;
        match &mut self.data {
            ColumnData::Scalar(data) => {
                assert_eq!(bytes.len(), size, "scalar value size mismatch");
                data[row * size..(row + 1) * size].copy_from_slice(bytes);
            }
            ColumnData::Array(rows) => {
                assert_eq!(bytes.len() % size, 0, "array value is not whole elements");
                let dst = &mut rows[row];
                dst.clear();
                dst.extend_from_slice(bytes);
            }
        }
    }

    /// Enabled flag of `row`.
    pub fn is_enabled(&self, row: usize) -> bool {
        self.enabled[row]
    }

    /// Set the enabled flag of `row`.
    pub fn set_enabled(&mut self, row: usize, enabled: bool) {
        self.enabled[row] = enabled;
    }

    /// Append a row.
    pub fn push(&mut self, bytes: &[u8], enabled: bool) {
        match &mut self.data {
            ColumnData::Scalar(data) => {
                assert_eq!(bytes.len(), self.element_size, "scalar value size mismatch");
                data.extend_from_slice(bytes);
            }
            ColumnData::Array(rows) => {
                assert_eq!(
                    bytes.len() % self.element_size,
                    0,
                    "array value is not whole elements"
                );
                rows.push(bytes.to_vec());
            }
        }
        self.enabled.push(enabled);
    }

    /// Remove `row` by swapping in the last row. Returns the removed value
    /// and enabled flag.
    pub fn swap_remove(&mut self, row: usize) -> (Vec<u8>, bool) {
        let last = self.len() - 1;
        let value = match &mut self.data {
            ColumnData::Scalar(data) => {
                let size = self.element_size;
                let removed = data[row * size..(row + 1) * size].to_vec();
                if row != last {
                    data.copy_within(last * size..(last + 1) * size, row * size);
                }
                data.truncate(last * size);
                removed
            }
            ColumnData::Array(rows) => rows.swap_remove(row),
        };
        (value, self.enabled.swap_remove(row))
    }
}

/// A row removed from a batch, ready to be pushed into another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedRow {
    /// Handle of the removed record.
    pub handle: RecordHandle,
    /// Slot index of the removed record.
    pub local_index: LocalIndex,
    /// `(field, value, enabled)` for every column, in column order.
    pub values: Vec<(FieldTypeId, Vec<u8>, bool)>,
}

/// Disjoint mutable view of a batch used by restore tasks.
pub struct BatchPartsMut<'a> {
    /// Record handles, one per row.
    pub handles: &'a [RecordHandle],
    /// Slot indices, one per row.
    pub local_indices: &'a [LocalIndex],
    /// Columns in registration order.
    pub columns: indexmap::map::IterMut<'a, FieldTypeId, FieldColumn>,
}

/// A chunk of live records sharing one field composition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordBatch {
    handles: Vec<RecordHandle>,
    local_indices: Vec<LocalIndex>,
    columns: IndexMap<FieldTypeId, FieldColumn>,
}

impl RecordBatch {
    /// An empty batch carrying the given (empty) columns.
    ///
    /// # Panics
    ///
    /// Panics if a column already has rows or a field appears twice.
    pub fn new(columns: impl IntoIterator<Item = (FieldTypeId, FieldColumn)>) -> Self {
        let mut map = IndexMap::new();
        for (field, column) in columns {
            assert!(column.is_empty(), "batch columns must start empty");
            assert!(
                map.insert(field, column).is_none(),
                "duplicate field {field} in batch"
            );
        }
        Self {
            handles: Vec::new(),
            local_indices: Vec::new(),
            columns: map,
        }
    }

    /// Append a record. `values` must supply exactly one entry per column.
    ///
    /// # Panics
    ///
    /// Panics if a column has no value or a value names a missing column.
    pub fn push(
        &mut self,
        handle: RecordHandle,
        local_index: LocalIndex,
        values: &[(FieldTypeId, &[u8], bool)],
    ) -> usize {
        assert_eq!(
            values.len(),
            self.columns.len(),
            "record {handle} must supply one value per column"
        );
        for &(field, bytes, enabled) in values {
            let column = self
                .columns
                .get_mut(&field)
                .unwrap_or_else(|| panic!("batch has no column for field {field}"));
            column.push(bytes, enabled);
        }
        self.handles.push(handle);
        self.local_indices.push(local_index);
        debug_assert!(self.columns.values().all(|c| c.len() == self.handles.len()));
        self.handles.len() - 1
    }

    /// Remove `row`, moving the last row into its place.
    pub fn swap_remove(&mut self, row: usize) -> RemovedRow {
        let handle = self.handles.swap_remove(row);
        let local_index = self.local_indices.swap_remove(row);
        let values = self
            .columns
            .iter_mut()
            .map(|(&field, column)| {
                let (value, enabled) = column.swap_remove(row);
                (field, value, enabled)
            })
            .collect();
        RemovedRow {
            handle,
            local_index,
            values,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Record handles, one per row.
    pub fn handles(&self) -> &[RecordHandle] {
        &self.handles
    }

    /// Slot indices, one per row.
    pub fn local_indices(&self) -> &[LocalIndex] {
        &self.local_indices
    }

    /// Reassign the slot index of `row`.
    pub fn set_local_index(&mut self, row: usize, local_index: LocalIndex) {
        self.local_indices[row] = local_index;
    }

    /// Row of the record with `handle`, if present.
    pub fn row_of(&self, handle: RecordHandle) -> Option<usize> {
        self.handles.iter().position(|&h| h == handle)
    }

    /// Whether records in this batch carry `field`.
    pub fn has_field(&self, field: FieldTypeId) -> bool {
        self.columns.contains_key(&field)
    }

    /// Fields carried by this batch, in registration order.
    pub fn field_types(&self) -> impl Iterator<Item = FieldTypeId> + '_ {
        self.columns.keys().copied()
    }

    /// The column of `field`, if carried.
    pub fn column(&self, field: FieldTypeId) -> Option<&FieldColumn> {
        self.columns.get(&field)
    }

    /// Mutable column of `field`, if carried.
    pub fn column_mut(&mut self, field: FieldTypeId) -> Option<&mut FieldColumn> {
        self.columns.get_mut(&field)
    }

    /// Borrow identity slices and every column at once.
    pub fn parts_mut(&mut self) -> BatchPartsMut<'_> {
        BatchPartsMut {
            handles: &self.handles,
            local_indices: &self.local_indices,
            columns: self.columns.iter_mut(),
        }
    }

    /// Empty columns with the same composition. Used when a record
    /// migrates between batches.
    pub fn empty_like(&self) -> Vec<(FieldTypeId, FieldColumn)> {
        self.columns
            .iter()
            .map(|(&field, column)| {
                let empty = if column.is_array() {
                    FieldColumn::array(column.element_size())
                } else {
                    FieldColumn::scalar(column.element_size())
                };
                (field, empty)
            })
            .collect()
    }
}
