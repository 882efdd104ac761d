//! Fixed-width little-endian primitive codec for the ULog wire format.
//!
//! ULog field declarations name one of twelve primitive scalar types (see
//! the table in the format spec). Every value on the wire is little-endian;
//! there is no varint encoding anywhere in ULog, unlike the SQLite
//! changeset format this crate's encoding layer is modeled on.

/// One of the twelve primitive scalar types a ULog field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `int8_t`
    Int8,
    /// `uint8_t`
    UInt8,
    /// `int16_t`
    Int16,
    /// `uint16_t`
    UInt16,
    /// `int32_t`
    Int32,
    /// `uint32_t`
    UInt32,
    /// `int64_t`
    Int64,
    /// `uint64_t`
    UInt64,
    /// `float` (IEEE-754 binary32)
    Float,
    /// `double` (IEEE-754 binary64)
    Double,
    /// `bool` (nonzero = true)
    Bool,
    /// `char` (single byte; arrays of `char` form text)
    Char,
}

impl Primitive {
    /// Parse the wire type name (e.g. `"uint64_t"`, `"float"`) into a primitive.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "int8_t" => Primitive::Int8,
            "uint8_t" => Primitive::UInt8,
            "int16_t" => Primitive::Int16,
            "uint16_t" => Primitive::UInt16,
            "int32_t" => Primitive::Int32,
            "uint32_t" => Primitive::UInt32,
            "int64_t" => Primitive::Int64,
            "uint64_t" => Primitive::UInt64,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            "bool" => Primitive::Bool,
            "char" => Primitive::Char,
            _ => return None,
        })
    }

    /// The wire type name for this primitive.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int8 => "int8_t",
            Primitive::UInt8 => "uint8_t",
            Primitive::Int16 => "int16_t",
            Primitive::UInt16 => "uint16_t",
            Primitive::Int32 => "int32_t",
            Primitive::UInt32 => "uint32_t",
            Primitive::Int64 => "int64_t",
            Primitive::UInt64 => "uint64_t",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bool => "bool",
            Primitive::Char => "char",
        }
    }

    /// Wire size in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Primitive::Int8 | Primitive::UInt8 | Primitive::Bool | Primitive::Char => 1,
            Primitive::Int16 | Primitive::UInt16 => 2,
            Primitive::Int32 | Primitive::UInt32 | Primitive::Float => 4,
            Primitive::Int64 | Primitive::UInt64 | Primitive::Double => 8,
        }
    }

    /// Decode one value of this type from exactly `size()` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len() != self.size()`. Callers in this crate always
    /// slice the record buffer to the exact column width before calling.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Value {
        assert_eq!(bytes.len(), self.size());
        match self {
            Primitive::Int8 => Value::Int8(bytes[0] as i8),
            Primitive::UInt8 => Value::UInt8(bytes[0]),
            Primitive::Int16 => Value::Int16(i16::from_le_bytes(bytes.try_into().unwrap())),
            Primitive::UInt16 => Value::UInt16(u16::from_le_bytes(bytes.try_into().unwrap())),
            Primitive::Int32 => Value::Int32(i32::from_le_bytes(bytes.try_into().unwrap())),
            Primitive::UInt32 => Value::UInt32(u32::from_le_bytes(bytes.try_into().unwrap())),
            Primitive::Int64 => Value::Int64(i64::from_le_bytes(bytes.try_into().unwrap())),
            Primitive::UInt64 => Value::UInt64(u64::from_le_bytes(bytes.try_into().unwrap())),
            Primitive::Float => Value::Float(f32::from_le_bytes(bytes.try_into().unwrap())),
            Primitive::Double => Value::Double(f64::from_le_bytes(bytes.try_into().unwrap())),
            Primitive::Bool => Value::Bool(bytes[0] != 0),
            Primitive::Char => Value::Char(bytes[0]),
        }
    }

    /// Encode a value of this type, appending its little-endian bytes to `out`.
    pub fn encode(self, value: Value, out: &mut Vec<u8>) {
        match value {
            Value::Int8(v) => out.push(v as u8),
            Value::UInt8(v) => out.push(v),
            Value::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::UInt16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::UInt64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Bool(v) => out.push(u8::from(v)),
            Value::Char(v) => out.push(v),
        }
    }
}

/// A decoded primitive scalar value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// `int8_t` value.
    Int8(i8),
    /// `uint8_t` value.
    UInt8(u8),
    /// `int16_t` value.
    Int16(i16),
    /// `uint16_t` value.
    UInt16(u16),
    /// `int32_t` value.
    Int32(i32),
    /// `uint32_t` value.
    UInt32(u32),
    /// `int64_t` value.
    Int64(i64),
    /// `uint64_t` value.
    UInt64(u64),
    /// `float` value.
    Float(f32),
    /// `double` value.
    Double(f64),
    /// `bool` value.
    Bool(bool),
    /// `char` value.
    Char(u8),
}

impl Value {
    /// The primitive type this value was decoded as / will be encoded as.
    #[must_use]
    pub fn primitive(self) -> Primitive {
        match self {
            Value::Int8(_) => Primitive::Int8,
            Value::UInt8(_) => Primitive::UInt8,
            Value::Int16(_) => Primitive::Int16,
            Value::UInt16(_) => Primitive::UInt16,
            Value::Int32(_) => Primitive::Int32,
            Value::UInt32(_) => Primitive::UInt32,
            Value::Int64(_) => Primitive::Int64,
            Value::UInt64(_) => Primitive::UInt64,
            Value::Float(_) => Primitive::Float,
            Value::Double(_) => Primitive::Double,
            Value::Bool(_) => Primitive::Bool,
            Value::Char(_) => Primitive::Char,
        }
    }

    /// Widen to `f64` for generic numeric use (e.g. version info, reporting).
    ///
    /// Not used for equality: [`Value`]'s `PartialEq` compares same-variant
    /// values exactly, which is what the value-change filter in
    /// [`crate::model::dataset`] relies on.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int8(v) => f64::from(v),
            Value::UInt8(v) => f64::from(v),
            Value::Int16(v) => f64::from(v),
            Value::UInt16(v) => f64::from(v),
            Value::Int32(v) => f64::from(v),
            Value::UInt32(v) => f64::from(v),
            Value::Int64(v) => v as f64,
            Value::UInt64(v) => v as f64,
            Value::Float(v) => f64::from(v),
            Value::Double(v) => v,
            Value::Bool(v) => f64::from(u8::from(v)),
            Value::Char(v) => f64::from(v),
        }
    }

    /// Interpret the value as an `i64`, truncating/rounding as needed.
    ///
    /// Used by the default-parameter bitfield decomposition and other
    /// places that need an integer index out of a generically-typed value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Value::Int8(v) => i64::from(v),
            Value::UInt8(v) => i64::from(v),
            Value::Int16(v) => i64::from(v),
            Value::UInt16(v) => i64::from(v),
            Value::Int32(v) => i64::from(v),
            Value::UInt32(v) => i64::from(v),
            Value::Int64(v) => v,
            Value::UInt64(v) => v as i64,
            Value::Float(v) => v as i64,
            Value::Double(v) => v as i64,
            Value::Bool(v) => i64::from(v),
            Value::Char(v) => i64::from(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_name_round_trip() {
        for name in [
            "int8_t", "uint8_t", "int16_t", "uint16_t", "int32_t", "uint32_t", "int64_t",
            "uint64_t", "float", "double", "bool", "char",
        ] {
            let p = Primitive::parse(name).unwrap();
            assert_eq!(p.name(), name);
        }
        assert!(Primitive::parse("not_a_type").is_none());
    }

    #[test]
    fn sizes_match_spec_table() {
        assert_eq!(Primitive::Int8.size(), 1);
        assert_eq!(Primitive::UInt16.size(), 2);
        assert_eq!(Primitive::Int32.size(), 4);
        assert_eq!(Primitive::Float.size(), 4);
        assert_eq!(Primitive::UInt64.size(), 8);
        assert_eq!(Primitive::Double.size(), 8);
        assert_eq!(Primitive::Bool.size(), 1);
        assert_eq!(Primitive::Char.size(), 1);
    }

    #[test]
    fn decode_encode_round_trip_all_types() {
        let cases: &[(Primitive, Value)] = &[
            (Primitive::Int8, Value::Int8(-5)),
            (Primitive::UInt8, Value::UInt8(250)),
            (Primitive::Int16, Value::Int16(-1234)),
            (Primitive::UInt16, Value::UInt16(60000)),
            (Primitive::Int32, Value::Int32(-123_456)),
            (Primitive::UInt32, Value::UInt32(4_000_000_000)),
            (Primitive::Int64, Value::Int64(-9_000_000_000)),
            (Primitive::UInt64, Value::UInt64(18_000_000_000)),
            (Primitive::Float, Value::Float(3.25)),
            (Primitive::Double, Value::Double(6.125)),
            (Primitive::Bool, Value::Bool(true)),
            (Primitive::Char, Value::Char(b'x')),
        ];
        for &(prim, value) in cases {
            let mut buf = Vec::new();
            prim.encode(value, &mut buf);
            assert_eq!(buf.len(), prim.size());
            assert_eq!(prim.decode(&buf), value);
        }
    }

    #[test]
    fn little_endian_byte_order() {
        let mut buf = Vec::new();
        Primitive::UInt32.encode(Value::UInt32(0x0102_0304), &mut buf);
        assert_eq!(buf, vec![0x04, 0x03, 0x02, 0x01]);
    }
}
