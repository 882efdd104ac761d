//! The materialised per-topic columnar view produced from a subscription.

use crate::errors::Error;
use crate::primitives::{Primitive, Value};
use crate::schema::FlattenedSchema;

/// One column's values, materialised out of a subscription's raw byte
/// buffer into a structure-of-arrays view matching [`FlattenedSchema`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// `int8_t` column.
    Int8(Vec<i8>),
    /// `uint8_t` column.
    UInt8(Vec<u8>),
    /// `int16_t` column.
    Int16(Vec<i16>),
    /// `uint16_t` column.
    UInt16(Vec<u16>),
    /// `int32_t` column.
    Int32(Vec<i32>),
    /// `uint32_t` column.
    UInt32(Vec<u32>),
    /// `int64_t` column.
    Int64(Vec<i64>),
    /// `uint64_t` column.
    UInt64(Vec<u64>),
    /// `float` column.
    Float(Vec<f32>),
    /// `double` column.
    Double(Vec<f64>),
    /// `bool` column.
    Bool(Vec<bool>),
    /// `char` column.
    Char(Vec<u8>),
}

impl ColumnData {
    /// Allocate an empty column of the given primitive kind.
    #[must_use]
    pub fn empty(primitive: Primitive) -> Self {
        match primitive {
            Primitive::Int8 => ColumnData::Int8(Vec::new()),
            Primitive::UInt8 => ColumnData::UInt8(Vec::new()),
            Primitive::Int16 => ColumnData::Int16(Vec::new()),
            Primitive::UInt16 => ColumnData::UInt16(Vec::new()),
            Primitive::Int32 => ColumnData::Int32(Vec::new()),
            Primitive::UInt32 => ColumnData::UInt32(Vec::new()),
            Primitive::Int64 => ColumnData::Int64(Vec::new()),
            Primitive::UInt64 => ColumnData::UInt64(Vec::new()),
            Primitive::Float => ColumnData::Float(Vec::new()),
            Primitive::Double => ColumnData::Double(Vec::new()),
            Primitive::Bool => ColumnData::Bool(Vec::new()),
            Primitive::Char => ColumnData::Char(Vec::new()),
        }
    }

    /// The primitive kind backing this column.
    #[must_use]
    pub fn primitive(&self) -> Primitive {
        match self {
            ColumnData::Int8(_) => Primitive::Int8,
            ColumnData::UInt8(_) => Primitive::UInt8,
            ColumnData::Int16(_) => Primitive::Int16,
            ColumnData::UInt16(_) => Primitive::UInt16,
            ColumnData::Int32(_) => Primitive::Int32,
            ColumnData::UInt32(_) => Primitive::UInt32,
            ColumnData::Int64(_) => Primitive::Int64,
            ColumnData::UInt64(_) => Primitive::UInt64,
            ColumnData::Float(_) => Primitive::Float,
            ColumnData::Double(_) => Primitive::Double,
            ColumnData::Bool(_) => Primitive::Bool,
            ColumnData::Char(_) => Primitive::Char,
        }
    }

    /// Number of records held in this column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int8(v) => v.len(),
            ColumnData::UInt8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Double(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Char(v) => v.len(),
        }
    }

    /// Whether this column holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push one record's value, decoded by the caller via [`Primitive::decode`].
    pub fn push(&mut self, value: Value) {
        match (self, value) {
            (ColumnData::Int8(v), Value::Int8(x)) => v.push(x),
            (ColumnData::UInt8(v), Value::UInt8(x)) => v.push(x),
            (ColumnData::Int16(v), Value::Int16(x)) => v.push(x),
            (ColumnData::UInt16(v), Value::UInt16(x)) => v.push(x),
            (ColumnData::Int32(v), Value::Int32(x)) => v.push(x),
            (ColumnData::UInt32(v), Value::UInt32(x)) => v.push(x),
            (ColumnData::Int64(v), Value::Int64(x)) => v.push(x),
            (ColumnData::UInt64(v), Value::UInt64(x)) => v.push(x),
            (ColumnData::Float(v), Value::Float(x)) => v.push(x),
            (ColumnData::Double(v), Value::Double(x)) => v.push(x),
            (ColumnData::Bool(v), Value::Bool(x)) => v.push(x),
            (ColumnData::Char(v), Value::Char(x)) => v.push(x),
            _ => unreachable!("column primitive kind and pushed value kind must match"),
        }
    }

    /// Fetch record `i` as a generic [`Value`].
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn get(&self, i: usize) -> Value {
        match self {
            ColumnData::Int8(v) => Value::Int8(v[i]),
            ColumnData::UInt8(v) => Value::UInt8(v[i]),
            ColumnData::Int16(v) => Value::Int16(v[i]),
            ColumnData::UInt16(v) => Value::UInt16(v[i]),
            ColumnData::Int32(v) => Value::Int32(v[i]),
            ColumnData::UInt32(v) => Value::UInt32(v[i]),
            ColumnData::Int64(v) => Value::Int64(v[i]),
            ColumnData::UInt64(v) => Value::UInt64(v[i]),
            ColumnData::Float(v) => Value::Float(v[i]),
            ColumnData::Double(v) => Value::Double(v[i]),
            ColumnData::Bool(v) => Value::Bool(v[i]),
            ColumnData::Char(v) => Value::Char(v[i]),
        }
    }

    /// Encode this column's `i`-th record back to its wire bytes.
    pub fn encode_at(&self, i: usize, out: &mut Vec<u8>) {
        self.primitive().encode(self.get(i), out);
    }
}

/// The materialised, per-topic columnar view of one subscription's data.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Distinguishes multiple concurrent instances of the same topic.
    pub multi_id: u8,
    /// The numeric message id this dataset was subscribed under.
    pub msg_id: u16,
    /// The subscribed topic's format name.
    pub message_name: String,
    /// The flattened column schema this dataset's columns follow.
    pub schema: FlattenedSchema,
    /// Per-column materialised arrays, same order and length as `schema.columns`.
    pub columns: Vec<ColumnData>,
}

impl Dataset {
    /// Number of records in this dataset (all columns have equal length).
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, ColumnData::len)
    }

    /// Whether this dataset holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw byte length this dataset's buffer had before materialisation.
    #[must_use]
    pub fn record_size(&self) -> usize {
        self.schema.record_size()
    }

    fn column_index(&self, field: &str) -> Option<usize> {
        self.schema.columns.iter().position(|c| c.name == field)
    }

    fn timestamp_at(&self, i: usize) -> u64 {
        match self.schema.timestamp_column {
            Some(idx) => match self.columns[idx].get(i) {
                Value::UInt64(t) => t,
                _ => 0,
            },
            None => 0,
        }
    }

    /// A list of `(timestamp, value)` pairs whenever `field`'s value
    /// changes. Samples with a zero timestamp are dropped first; the first
    /// remaining sample is always kept, followed by every subsequent sample
    /// whose value differs from the one immediately before it.
    pub fn list_value_changes(&self, field: &str) -> Result<Vec<(u64, Value)>, Error> {
        let idx = self.column_index(field).ok_or_else(|| Error::NotFound {
            name: field.to_string(),
            multi_id: self.multi_id,
        })?;
        let column = &self.columns[idx];

        let samples: Vec<(u64, Value)> = (0..self.len())
            .map(|i| (self.timestamp_at(i), column.get(i)))
            .filter(|(t, _)| *t != 0)
            .collect();

        let mut out = Vec::new();
        let mut prev: Option<Value> = None;
        for (t, v) in samples {
            if prev != Some(v) {
                out.push((t, v));
            }
            prev = Some(v);
        }
        Ok(out)
    }
}
