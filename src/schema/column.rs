//! The flattened, per-record column schema produced by expanding a format.

use crate::primitives::Primitive;

/// One column of a flattened record schema.
///
/// Nested records are flattened into dotted names and array elements
/// become `name[i]`; each column keeps its own absolute byte offset so a
/// timestamp (or any other column) can be extracted in O(1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    /// The column's flattened, dotted name (e.g. `"imu[0].accel[2]"`).
    pub name: String,
    /// The column's primitive wire type.
    pub primitive: Primitive,
    /// Byte offset of this column within one record.
    pub byte_offset: usize,
}

impl Column {
    /// Size in bytes of this column (same as `self.primitive.size()`).
    #[must_use]
    pub fn element_size(&self) -> usize {
        self.primitive.size()
    }
}

/// A format name resolved into its flattened column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedSchema {
    /// Columns in flattened, declaration order.
    pub columns: Vec<Column>,
    /// Index into `columns` of the column named `"timestamp"`, if any.
    pub timestamp_column: Option<usize>,
}

impl FlattenedSchema {
    /// Total size in bytes of one record under this schema.
    #[must_use]
    pub fn record_size(&self) -> usize {
        self.columns
            .last()
            .map_or(0, |c| c.byte_offset + c.element_size())
    }

    /// Byte offset of the `timestamp` column, or `0` if this schema has none.
    ///
    /// A `0` result when `timestamp_column` is `None` does not mean there is
    /// a real column at offset zero; callers must check `timestamp_column`
    /// before trusting it for per-record timestamp extraction, per spec.
    #[must_use]
    pub fn timestamp_offset(&self) -> usize {
        self.timestamp_column
            .map_or(0, |idx| self.columns[idx].byte_offset)
    }
}
