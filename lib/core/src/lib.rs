//! # avrovec Core
//!
//! Core library for avrovec.
//!
//! This crate provides the record-to-vector engine:
//!
//! - [`FieldMap`] - Ordered numeric-compatible subset of a record schema
//! - [`RecordProjector`] - Projects decoded Avro records onto dense [`Vector`]s
//! - [`RecordStream`] - Lazy, single-pass vector iterator over one Avro data file
//! - [`DistanceRegistry`] - Resolves [`DistanceMeasure`]s by alias or qualified name
//!
//! ## Example
//!
//! ```rust
//! use apache_avro::types::Value;
//! use apache_avro::Schema;
//! use avrovec_core::RecordProjector;
//!
//! let schema = Schema::parse_str(r#"{"type": "record", "name": "Row", "fields": [
//!     {"name": "a", "type": "long"},
//!     {"name": "b", "type": "string"},
//!     {"name": "c", "type": "boolean"}
//! ]}"#).unwrap();
//! let projector = RecordProjector::new(schema).unwrap();
//! assert_eq!(projector.field_map().retained_names(), vec!["a", "c"]);
//!
//! let record = Value::Record(vec![
//!     ("a".to_string(), Value::Long(5)),
//!     ("b".to_string(), Value::String("ignored".to_string())),
//!     ("c".to_string(), Value::Boolean(true)),
//! ]);
//! let vector = projector.project(&record).unwrap();
//! assert_eq!(vector.as_slice(), &[5.0, 1.0]);
//! ```

pub mod distance;
pub mod error;
pub mod projection;
pub mod stream;
pub mod vector;

pub use distance::{Distance, DistanceMeasure, DistanceRegistry};
pub use error::{Error, Result};
pub use projection::{FieldKind, FieldMap, MappedField, RecordProjector};
pub use stream::{read_writer_schema, RecordStream};
pub use vector::Vector;

// Re-exported so downstream crates name one Avro version
pub use apache_avro;
