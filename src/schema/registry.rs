//! The type registry: declared formats, resolved into flattened schemas.

use indexmap::IndexMap;
use std::collections::HashSet;

use super::column::{Column, FlattenedSchema};
use super::field::{Field, FieldType, FormatDecl};
use crate::primitives::Primitive;

/// Recursion depth cap for nested-format expansion, guarding against
/// reference cycles between format declarations (spec.md §9).
const MAX_EXPANSION_DEPTH: usize = 128;

/// Error resolving a format name into a flattened schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A referenced type is neither a primitive nor a previously declared format.
    #[error("unknown type {0:?}")]
    UnknownType(String),
    /// Expanding the format recursed into itself (directly or indirectly).
    #[error("cyclic format reference through {0:?}")]
    Cycle(String),
    /// The format declares a `timestamp` field whose type is not `uint64_t`.
    #[error("timestamp field must be uint64_t, found {0:?}")]
    BadTimestampType(&'static str),
}

/// Holds every format declaration seen so far and resolves format names
/// into [`FlattenedSchema`]s on demand.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    formats: IndexMap<String, FormatDecl>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a format declaration.
    pub fn insert(&mut self, decl: FormatDecl) {
        self.formats.insert(decl.name.clone(), decl);
    }

    /// Look up a previously registered format declaration by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FormatDecl> {
        self.formats.get(name)
    }

    /// All registered formats, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FormatDecl)> {
        self.formats.iter()
    }

    /// Resolve a format name into its flattened column schema.
    ///
    /// Depth-first expansion of nested types; array fields (primitive or
    /// nested) expand element-wise into individually offset columns.
    /// Trailing `_padding*` columns (by unprefixed top-level name) are
    /// stripped from the result.
    pub fn flatten(&self, name: &str) -> Result<FlattenedSchema, RegistryError> {
        let mut columns = Vec::new();
        let mut offset = 0usize;
        let mut active = HashSet::new();
        self.expand(name, "", &mut columns, &mut offset, &mut active, 0)?;

        while columns
            .last()
            .is_some_and(|c: &Column| unprefixed_is_padding(&c.name))
        {
            columns.pop();
        }

        let timestamp_column = columns.iter().position(|c| c.name == "timestamp");
        if let Some(idx) = timestamp_column
            && columns[idx].primitive != Primitive::UInt64
        {
            return Err(RegistryError::BadTimestampType(columns[idx].primitive.name()));
        }

        Ok(FlattenedSchema {
            columns,
            timestamp_column,
        })
    }

    fn expand(
        &self,
        type_name: &str,
        prefix: &str,
        columns: &mut Vec<Column>,
        offset: &mut usize,
        active: &mut HashSet<String>,
        depth: usize,
    ) -> Result<(), RegistryError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(RegistryError::Cycle(type_name.to_string()));
        }
        if !active.insert(type_name.to_string()) {
            return Err(RegistryError::Cycle(type_name.to_string()));
        }

        let decl = self
            .formats
            .get(type_name)
            .ok_or_else(|| RegistryError::UnknownType(type_name.to_string()))?;

        for field in &decl.fields {
            self.expand_field(field, prefix, columns, offset, active, depth)?;
        }

        active.remove(type_name);
        Ok(())
    }

    fn expand_field(
        &self,
        field: &Field,
        prefix: &str,
        columns: &mut Vec<Column>,
        offset: &mut usize,
        active: &mut HashSet<String>,
        depth: usize,
    ) -> Result<(), RegistryError> {
        match &field.field_type {
            FieldType::Primitive(primitive) => {
                if field.array_size > 1 {
                    for i in 0..field.array_size {
                        let name = format!("{prefix}{}[{i}]", field.name);
                        self.push_column(name, *primitive, columns, offset);
                    }
                } else {
                    self.push_column(format!("{prefix}{}", field.name), *primitive, columns, offset);
                }
                Ok(())
            }
            FieldType::Format(type_name) => {
                if field.array_size > 1 {
                    for i in 0..field.array_size {
                        let nested_prefix = format!("{prefix}{}[{i}].", field.name);
                        self.expand(type_name, &nested_prefix, columns, offset, active, depth + 1)?;
                    }
                } else {
                    let nested_prefix = format!("{prefix}{}.", field.name);
                    self.expand(type_name, &nested_prefix, columns, offset, active, depth + 1)?;
                }
                Ok(())
            }
        }
    }

    fn push_column(
        &self,
        name: String,
        primitive: Primitive,
        columns: &mut Vec<Column>,
        offset: &mut usize,
    ) {
        let byte_offset = *offset;
        *offset += primitive.size();
        columns.push(Column {
            name,
            primitive,
            byte_offset,
        });
    }
}

/// Whether a flattened column's name is a padding field declared at the
/// top level (no dotted prefix) -- matches `pyulog`'s trailing-padding-strip,
/// which only ever sees unprefixed names because it runs once after the
/// whole recursive expansion completes.
fn unprefixed_is_padding(name: &str) -> bool {
    !name.contains('.') && name.starts_with("_padding")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(decls: &[&str]) -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        for d in decls {
            reg.insert(FormatDecl::parse(d).unwrap());
        }
        reg
    }

    #[test]
    fn flattens_simple_format() {
        let reg = registry_with(&["ping:uint64_t timestamp;float x;"]);
        let schema = reg.flatten("ping").unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[0].name, "timestamp");
        assert_eq!(schema.columns[0].byte_offset, 0);
        assert_eq!(schema.columns[1].name, "x");
        assert_eq!(schema.columns[1].byte_offset, 8);
        assert_eq!(schema.record_size(), 12);
        assert_eq!(schema.timestamp_column, Some(0));
    }

    #[test]
    fn flattens_primitive_array_into_indexed_columns() {
        let reg = registry_with(&["imu:uint64_t timestamp;float[3] accel;"]);
        let schema = reg.flatten("imu").unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["timestamp", "accel[0]", "accel[1]", "accel[2]"]);
    }

    #[test]
    fn flattens_nested_format_with_dotted_prefix() {
        let reg = registry_with(&[
            "vec3:float x;float y;float z;",
            "imu:uint64_t timestamp;vec3 accel;",
        ]);
        let schema = reg.flatten("imu").unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["timestamp", "accel.x", "accel.y", "accel.z"]);
    }

    #[test]
    fn flattens_array_of_nested_format() {
        let reg = registry_with(&[
            "vec3:float x;float y;",
            "imu:uint64_t timestamp;vec3[2] accel;",
        ]);
        let schema = reg.flatten("imu").unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["timestamp", "accel[0].x", "accel[0].y", "accel[1].x", "accel[1].y"]
        );
    }

    #[test]
    fn strips_trailing_padding() {
        let reg = registry_with(&["t:uint64_t timestamp;uint8_t v;uint8_t[3] _padding0;"]);
        let schema = reg.flatten("t").unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["timestamp", "v"]);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let reg = registry_with(&["t:not_a_type f;"]);
        assert_eq!(
            reg.flatten("t"),
            Err(RegistryError::UnknownType("not_a_type".to_string()))
        );
    }

    #[test]
    fn cyclic_formats_are_rejected() {
        let reg = registry_with(&["a:b f;", "b:a f;"]);
        assert!(matches!(reg.flatten("a"), Err(RegistryError::Cycle(_))));
    }

    #[test]
    fn non_uint64_timestamp_is_rejected() {
        let reg = registry_with(&["t:uint32_t timestamp;"]);
        assert_eq!(
            reg.flatten("t"),
            Err(RegistryError::BadTimestampType("uint32_t"))
        );
    }

    #[test]
    fn missing_timestamp_column_is_none() {
        let reg = registry_with(&["t:float x;"]);
        let schema = reg.flatten("t").unwrap();
        assert_eq!(schema.timestamp_column, None);
        assert_eq!(schema.timestamp_offset(), 0);
    }
}
