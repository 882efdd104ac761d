//! Parsing of a single format declaration's text blob.
//!
//! A format declaration has the shape `Name:T1 f1;T2[K] f2;...;`, e.g.
//! `vehicle_gps_position:uint64_t timestamp;int32_t lat;int32_t lon;`.

use crate::primitives::Primitive;

/// The declared type of a field: either a primitive or the name of another
/// declared format (resolved against the [`super::registry::TypeRegistry`]
/// at flatten time).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A fixed-width primitive scalar.
    Primitive(Primitive),
    /// A reference to another declared format, resolved at flatten time.
    Format(String),
}

/// One field of a format declaration: its type, array extent (1 for a
/// scalar field), and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// The field's declared type.
    pub field_type: FieldType,
    /// Number of array elements; `1` for a non-array field.
    pub array_size: usize,
    /// The field's own name (not yet flattened/prefixed).
    pub name: String,
}

impl Field {
    /// Whether this field is structural padding, discarded after flattening.
    #[must_use]
    pub fn is_padding(&self) -> bool {
        self.name.starts_with("_padding")
    }
}

/// An ordered, named sequence of fields, as declared by an `F` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDecl {
    /// The format's name.
    pub name: String,
    /// The format's fields, in declaration order.
    pub fields: Vec<Field>,
}

/// Error parsing a format declaration's text blob.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatParseError {
    /// The blob has no `:` separating the name from the field list.
    #[error("format declaration missing ':' separator")]
    MissingSeparator,
    /// A field entry has no ` ` separating the type from the field name.
    #[error("field entry {0:?} missing type/name separator")]
    MissingFieldName(String),
    /// A field entry's array suffix (`T[N]`) has an unparsable `N`.
    #[error("field entry {0:?} has an invalid array size")]
    InvalidArraySize(String),
}

impl FormatDecl {
    /// Render this declaration back to its wire text blob, the inverse of
    /// [`FormatDecl::parse`].
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut text = format!("{}:", self.name);
        for field in &self.fields {
            let type_name = match &field.field_type {
                FieldType::Primitive(p) => p.name(),
                FieldType::Format(name) => name.as_str(),
            };
            if field.array_size > 1 {
                text.push_str(&format!("{type_name}[{}] {};", field.array_size, field.name));
            } else {
                text.push_str(&format!("{type_name} {};", field.name));
            }
        }
        text
    }

    /// Parse a format declaration's text blob, e.g.
    /// `"ping:uint64_t timestamp;float x;"`.
    pub fn parse(text: &str) -> Result<Self, FormatParseError> {
        let (name, fields_str) = text
            .split_once(':')
            .ok_or(FormatParseError::MissingSeparator)?;
        let mut fields = Vec::new();
        for entry in fields_str.split(';') {
            if entry.is_empty() {
                continue;
            }
            fields.push(parse_field(entry)?);
        }
        Ok(FormatDecl {
            name: name.to_string(),
            fields,
        })
    }
}

fn parse_field(entry: &str) -> Result<Field, FormatParseError> {
    let (type_str, name) = entry
        .split_once(' ')
        .ok_or_else(|| FormatParseError::MissingFieldName(entry.to_string()))?;

    let (type_name, array_size) = match type_str.find('[') {
        None => (type_str, 1),
        Some(open) => {
            let close = type_str
                .find(']')
                .ok_or_else(|| FormatParseError::InvalidArraySize(entry.to_string()))?;
            let n: usize = type_str[open + 1..close]
                .parse()
                .map_err(|_| FormatParseError::InvalidArraySize(entry.to_string()))?;
            (&type_str[..open], n)
        }
    };

    let field_type = match Primitive::parse(type_name) {
        Some(p) => FieldType::Primitive(p),
        None => FieldType::Format(type_name.to_string()),
    };

    Ok(Field {
        field_type,
        array_size,
        name: name.to_string(),
    })
}
