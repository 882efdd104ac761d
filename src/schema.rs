//! Format declarations and the flattened column schemas resolved from them.

mod column;
mod field;
mod registry;

pub use column::{Column, FlattenedSchema};
pub use field::{Field, FieldType, FormatDecl, FormatParseError};
pub use registry::{RegistryError, TypeRegistry};
