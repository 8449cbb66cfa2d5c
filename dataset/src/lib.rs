//! FILENAME: dataset/src/lib.rs
//! Booking dataset: typed values, schema coercion and the immutable columnar
//! table shared by every report.
//!
//! Layers:
//! - `value`: Normalized, hashable field values
//! - `schema`: Field declarations and raw-text coercion
//! - `cache`: Per-field value interning and ordering
//! - `dataset`: The table itself, its filters and derived fields

pub mod value;
pub mod schema;
pub mod cache;
pub mod dataset;
pub mod error;

pub use value::{format_decimal, OrderedFloat, Value, DATE_FORMAT};
pub use schema::{fields, parse_date, FieldDef, FieldIndex, FieldKind, Schema};
pub use cache::{Column, FieldCache, FieldOrdering, ValueId, VALUE_ID_EMPTY};
pub use dataset::{Dataset, DatasetBuilder, RecordRef};
pub use error::DatasetError;
