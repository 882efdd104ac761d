//! Decoding/encoding of the `I`/`M`/`P`/`Q` "info"-shaped record body.
//!
//! All four record kinds share the same `(key_len, "typename key", value)`
//! payload shape; `M` additionally prefixes a continuation byte and `Q`
//! prefixes a bitfield byte, both handled by the callers in
//! [`crate::parser`], not here.

use crate::primitives::{Primitive, Value};

/// A decoded info/parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    /// A single primitive scalar.
    Scalar(Value),
    /// A `char[N]`-typed field, rendered as text.
    Text(String),
    /// A type outside the closed primitive/`char[N]` set, preserved verbatim.
    Raw(Vec<u8>),
}

/// One decoded `(type, key, value)` info record.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoRecord {
    /// The declared type token, verbatim (e.g. `"int32_t"`, `"char[16]"`).
    pub type_name: String,
    /// The info/parameter key.
    pub key: String,
    /// The decoded value.
    pub value: InfoValue,
}

/// Error decoding an info-shaped record body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InfoError {
    /// The record is shorter than its declared `key_len`.
    #[error("info record truncated before end of type/key string")]
    Truncated,
    /// The `"typename key"` token has no space separating type from key.
    #[error("info record type/key string {0:?} has no space separator")]
    MissingKeySeparator(String),
    /// The type/key string, or a `char[N]` value, is not valid UTF-8/ASCII.
    #[error("info record contains invalid text")]
    InvalidText,
    /// A scalar value's byte length does not match its declared primitive size.
    #[error("info record value length {0} does not match type {1:?}")]
    BadScalarLength(usize, &'static str),
}

impl InfoRecord {
    /// Decode one info-shaped record body (the bytes *after* any
    /// continuation/bitfield prefix byte the caller has already consumed).
    pub fn decode(data: &[u8], lossy: bool) -> Result<Self, InfoError> {
        if data.is_empty() {
            return Err(InfoError::Truncated);
        }
        let key_len = data[0] as usize;
        if 1 + key_len > data.len() {
            return Err(InfoError::Truncated);
        }
        let type_key = decode_text(&data[1..1 + key_len], lossy).ok_or(InfoError::InvalidText)?;
        let (type_name, key) = type_key
            .split_once(' ')
            .ok_or_else(|| InfoError::MissingKeySeparator(type_key.clone()))?;
        let value_bytes = &data[1 + key_len..];

        let value = if let Some(array_len) = char_array_len(type_name) {
            let text = decode_text(&value_bytes[..value_bytes.len().min(array_len.max(value_bytes.len()))], lossy)
                .ok_or(InfoError::InvalidText)?;
            InfoValue::Text(text)
        } else if let Some(primitive) = Primitive::parse(type_name) {
            if value_bytes.len() != primitive.size() {
                return Err(InfoError::BadScalarLength(value_bytes.len(), primitive.name()));
            }
            InfoValue::Scalar(primitive.decode(value_bytes))
        } else {
            InfoValue::Raw(value_bytes.to_vec())
        };

        Ok(InfoRecord {
            type_name: type_name.to_string(),
            key: key.to_string(),
            value,
        })
    }

    /// Encode this info record back to its wire body (without any
    /// continuation/bitfield prefix byte, which callers prepend themselves).
    pub fn encode(&self, out: &mut Vec<u8>) {
        let type_key = format!("{} {}", self.type_name, self.key);
        out.push(type_key.len() as u8);
        out.extend_from_slice(type_key.as_bytes());
        match &self.value {
            InfoValue::Scalar(v) => v.primitive().encode(*v, out),
            InfoValue::Text(s) => out.extend_from_slice(s.as_bytes()),
            InfoValue::Raw(bytes) => out.extend_from_slice(bytes),
        }
    }
}

/// Whether `type_name` is a `char[N]` token; if so, return `N`.
fn char_array_len(type_name: &str) -> Option<usize> {
    let rest = type_name.strip_prefix("char[")?;
    let n = rest.strip_suffix(']')?;
    n.parse().ok()
}

pub(crate) fn decode_text(bytes: &[u8], lossy: bool) -> Option<String> {
    if lossy {
        Some(String::from_utf8_lossy(bytes).into_owned())
    } else {
        String::from_utf8(bytes.to_vec()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_scalar_info() {
        let mut body = vec![b"int32_t MAV_TYPE".len() as u8];
        body.extend_from_slice(b"int32_t MAV_TYPE");
        body.extend_from_slice(&1i32.to_le_bytes());
        let rec = InfoRecord::decode(&body, false).unwrap();
        assert_eq!(rec.type_name, "int32_t");
        assert_eq!(rec.key, "MAV_TYPE");
        assert_eq!(rec.value, InfoValue::Scalar(Value::Int32(1)));
    }

    #[test]
    fn decodes_char_array_as_text() {
        let mut body = vec![b"char[4] sys_name".len() as u8];
        body.extend_from_slice(b"char[4] sys_name");
        body.extend_from_slice(b"PX4");
        let rec = InfoRecord::decode(&body, false).unwrap();
        assert_eq!(rec.value, InfoValue::Text("PX4".to_string()));
    }

    #[test]
    fn unknown_type_is_stored_raw() {
        let mut body = vec![b"weird_t key".len() as u8];
        body.extend_from_slice(b"weird_t key");
        body.extend_from_slice(&[1, 2, 3, 4]);
        let rec = InfoRecord::decode(&body, false).unwrap();
        assert_eq!(rec.value, InfoValue::Raw(vec![1, 2, 3, 4]));
    }

    #[test]
    fn round_trips_through_encode() {
        let rec = InfoRecord {
            type_name: "float".to_string(),
            key: "gain".to_string(),
            value: InfoValue::Scalar(Value::Float(0.5)),
        };
        let mut buf = Vec::new();
        rec.encode(&mut buf);
        let decoded = InfoRecord::decode(&buf, false).unwrap();
        assert_eq!(decoded, rec);
    }
}
