//! A streaming decoder and encoder for the ULog binary flight log format
//! used by PX4 and other flight stacks.
//!
//! ```no_run
//! use ulog_rs::{open, OpenOptions};
//! use ulog_rs::byte_source::SliceSource;
//!
//! # fn main() -> Result<(), ulog_rs::Error> {
//! let bytes = std::fs::read("log.ulg").unwrap();
//! let mut source = SliceSource::new(&bytes);
//! let model = open(&mut source, OpenOptions::default())?;
//! for dataset in &model.data_list {
//!     println!("{} x{} ({} rows)", dataset.message_name, dataset.multi_id, dataset.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod byte_source;
pub mod encoder;
pub mod errors;
pub mod model;
pub mod parser;
pub mod primitives;
pub mod schema;
pub mod subscription;

pub use byte_source::{ByteSource, ReaderSource, SliceSource};
pub use errors::Error;
pub use model::{Dropout, LoggedMessage, Model, Parameter};
pub use model::dataset::{ColumnData, Dataset};
pub use model::info::{InfoRecord, InfoValue};
pub use parser::{open, OpenOptions};
pub use primitives::{Primitive, Value};
pub use schema::{Column, FlattenedSchema, FormatDecl, TypeRegistry};
