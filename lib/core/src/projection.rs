//! Schema-driven projection of Avro records onto dense vectors.
//!
//! A [`FieldMap`] is computed once from the governing record schema and keeps the
//! numeric-compatible fields (`int`, `long`, `float`, `double`, `boolean`, `null`)
//! in declaration order. Every other field is dropped silently. Each record is then
//! projected positionally: vector slot `i` holds the value of `FieldMap[i]`.
//!
//! Date, time and timestamp fields count as the `int` or `long` they are stored as.
//!
//! Coercion:
//! - numeric values widen to `f64` (large `long`s may lose precision)
//! - `true` → 1.0, `false` → 0.0
//! - `null`-typed fields and explicit null values → 0.0
//! - anything else is a [`Error::DataConsistency`] failure

use apache_avro::schema::SchemaKind;
use apache_avro::types::Value;
use apache_avro::Schema;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{Error, Result, Vector};

/// Declared type of a schema field, as far as projection cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Null,
    /// `["null", "boolean"]` in either order
    NullableBoolean,
    Record,
    Other(String),
}

impl FieldKind {
    pub fn of(schema: &Schema) -> Self {
        match schema {
            Schema::Int | Schema::Date | Schema::TimeMillis => FieldKind::Int,
            Schema::Long
            | Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros => FieldKind::Long,
            Schema::Float => FieldKind::Float,
            Schema::Double => FieldKind::Double,
            Schema::Boolean => FieldKind::Boolean,
            Schema::Null => FieldKind::Null,
            Schema::Record(_) => FieldKind::Record,
            Schema::Union(union) => {
                let variants = union.variants();
                let nullable_boolean = variants.len() == 2
                    && variants.iter().any(|s| matches!(s, Schema::Null))
                    && variants.iter().any(|s| matches!(s, Schema::Boolean));
                if nullable_boolean {
                    FieldKind::NullableBoolean
                } else {
                    FieldKind::Other("union".to_string())
                }
            }
            other => FieldKind::Other(format!("{:?}", SchemaKind::from(other)).to_lowercase()),
        }
    }

    /// Whether a field of this kind gets a vector slot
    #[inline]
    pub fn is_projectable(&self) -> bool {
        matches!(
            self,
            FieldKind::Int
                | FieldKind::Long
                | FieldKind::Float
                | FieldKind::Double
                | FieldKind::Boolean
                | FieldKind::Null
        )
    }

    #[inline]
    fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Int | FieldKind::Long | FieldKind::Float | FieldKind::Double
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Int => write!(f, "int"),
            FieldKind::Long => write!(f, "long"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Double => write!(f, "double"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::Null => write!(f, "null"),
            FieldKind::NullableBoolean => write!(f, "union<null,boolean>"),
            FieldKind::Record => write!(f, "record"),
            FieldKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A retained field: its name, declared kind, and position in the record schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedField {
    pub name: String,
    pub kind: FieldKind,
    pub position: usize,
}

/// Ordered subset of schema fields that are projected into vectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    fields: Vec<MappedField>,
    dropped: Vec<MappedField>,
}

impl FieldMap {
    /// Build the field map for a record schema.
    ///
    /// Fails with [`Error::Schema`] when the top-level schema is not a record.
    /// An empty map is not an error.
    pub fn from_schema(schema: &Schema) -> Result<Self> {
        let record = match schema {
            Schema::Record(record) => record,
            other => {
                return Err(Error::Schema(format!(
                    "top-level schema must be a record, got {:?}",
                    SchemaKind::from(other)
                )))
            }
        };

        let mut fields = Vec::with_capacity(record.fields.len());
        let mut dropped = Vec::new();
        for (position, field) in record.fields.iter().enumerate() {
            let mapped = MappedField {
                name: field.name.clone(),
                kind: FieldKind::of(&field.schema),
                position,
            };
            if mapped.kind.is_projectable() {
                fields.push(mapped);
            } else {
                dropped.push(mapped);
            }
        }

        debug!(
            "Using {} out of {} potential fields; the rest are non-numeric.",
            fields.len(),
            record.fields.len()
        );

        Ok(Self { fields, dropped })
    }

    /// Number of vector slots
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline]
    pub fn fields(&self) -> &[MappedField] {
        &self.fields
    }

    #[inline]
    pub fn dropped(&self) -> &[MappedField] {
        &self.dropped
    }

    pub fn retained_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn dropped_names(&self) -> Vec<String> {
        self.dropped.iter().map(|f| f.name.clone()).collect()
    }

    /// Project one decoded record into a vector of length [`FieldMap::len`]
    pub fn project(&self, record: &Value) -> Result<Vector> {
        let values = match record {
            Value::Record(values) => values,
            other => {
                return Err(Error::Decode(format!(
                    "expected a record, decoded {}",
                    value_kind(other)
                )))
            }
        };

        let mut out = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = lookup(values, field);
            out.push(coerce(field, value)?);
        }
        Ok(Vector::new(out))
    }
}

/// Positional lookup with a by-name fallback for records whose field order differs
#[inline]
fn lookup<'v>(values: &'v [(String, Value)], field: &MappedField) -> Option<&'v Value> {
    match values.get(field.position) {
        Some((name, value)) if *name == field.name => Some(value),
        _ => values
            .iter()
            .find(|(name, _)| *name == field.name)
            .map(|(_, value)| value),
    }
}

fn coerce(field: &MappedField, value: Option<&Value>) -> Result<f64> {
    if field.kind == FieldKind::Null {
        return Ok(0.0);
    }

    match value {
        Some(Value::Null) => Ok(0.0),
        Some(Value::Int(v) | Value::Date(v) | Value::TimeMillis(v)) if field.kind.is_numeric() => {
            Ok(f64::from(*v))
        }
        Some(
            Value::Long(v)
            | Value::TimeMicros(v)
            | Value::TimestampMillis(v)
            | Value::TimestampMicros(v)
            | Value::LocalTimestampMillis(v)
            | Value::LocalTimestampMicros(v),
        ) if field.kind.is_numeric() => Ok(*v as f64),
        Some(Value::Float(v)) if field.kind.is_numeric() => Ok(f64::from(*v)),
        Some(Value::Double(v)) if field.kind.is_numeric() => Ok(*v),
        Some(Value::Boolean(b)) if field.kind == FieldKind::Boolean => {
            Ok(if *b { 1.0 } else { 0.0 })
        }
        Some(other) => Err(Error::DataConsistency {
            field: field.name.clone(),
            expected: field.kind.to_string(),
            found: value_kind(other).to_string(),
        }),
        None => Err(Error::DataConsistency {
            field: field.name.clone(),
            expected: field.kind.to_string(),
            found: "missing field".to_string(),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) => "int",
        Value::Long(_) => "long",
        Value::Float(_) => "float",
        Value::Double(_) => "double",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "string",
        Value::Fixed(..) => "fixed",
        Value::Enum(..) => "enum",
        Value::Union(..) => "union",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Record(_) => "record",
        Value::Date(_) => "date",
        Value::TimestampMillis(_) | Value::TimestampMicros(_) => "timestamp",
        _ => "logical value",
    }
}

/// Owns the governing schema and its field map for a whole run
#[derive(Debug, Clone)]
pub struct RecordProjector {
    schema: Schema,
    field_map: FieldMap,
}

impl RecordProjector {
    pub fn new(schema: Schema) -> Result<Self> {
        let field_map = FieldMap::from_schema(&schema)?;
        Ok(Self { schema, field_map })
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.field_map.len()
    }

    #[inline]
    pub fn project(&self, record: &Value) -> Result<Vector> {
        self.field_map.project(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(json: &str) -> Schema {
        Schema::parse_str(json).unwrap()
    }

    fn record(fields: Vec<(&str, Value)>) -> Value {
        Value::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    #[test]
    fn test_field_map_keeps_numeric_fields_in_order() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [
                {"name": "a", "type": "long"},
                {"name": "b", "type": "string"},
                {"name": "c", "type": "boolean"},
                {"name": "d", "type": {"type": "array", "items": "int"}},
                {"name": "e", "type": "float"},
                {"name": "f", "type": ["null", "double"]},
                {"name": "g", "type": "null"},
                {"name": "h", "type": "int"},
                {"name": "i", "type": "double"}
            ]}"#,
        );

        let map = FieldMap::from_schema(&s).unwrap();
        assert_eq!(map.retained_names(), vec!["a", "c", "e", "g", "h", "i"]);
        assert_eq!(map.dropped_names(), vec!["b", "d", "f"]);
        assert!(map.fields().iter().all(|f| f.kind.is_projectable()));

        let positions: Vec<usize> = map.fields().iter().map(|f| f.position).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_nullable_boolean_union_is_dropped() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [
                {"name": "flag", "type": ["null", "boolean"]},
                {"name": "inner", "type": {"type": "record", "name": "Inner", "fields": [
                    {"name": "x", "type": "int"}
                ]}}
            ]}"#,
        );

        let map = FieldMap::from_schema(&s).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.dropped()[0].kind, FieldKind::NullableBoolean);
        assert_eq!(map.dropped()[1].kind, FieldKind::Record);

        let vector = map
            .project(&record(vec![
                ("flag", Value::Union(1, Box::new(Value::Boolean(true)))),
                ("inner", record(vec![("x", Value::Int(1))])),
            ]))
            .unwrap();
        assert_eq!(vector.dim(), 0);
    }

    #[test]
    fn test_non_record_schema_is_rejected() {
        let s = schema(r#"{"type": "array", "items": "long"}"#);
        let err = FieldMap::from_schema(&s).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.is_config());
    }

    #[test]
    fn test_project_long_string_boolean() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [
                {"name": "a", "type": "long"},
                {"name": "b", "type": "string"},
                {"name": "c", "type": "boolean"}
            ]}"#,
        );
        let projector = RecordProjector::new(s).unwrap();
        assert_eq!(projector.field_map().retained_names(), vec!["a", "c"]);

        let vector = projector
            .project(&record(vec![
                ("a", Value::Long(5)),
                ("b", Value::String("ignored".to_string())),
                ("c", Value::Boolean(true)),
            ]))
            .unwrap();
        assert_eq!(vector.as_slice(), &[5.0, 1.0]);
    }

    #[test]
    fn test_project_null_and_double() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [
                {"name": "x", "type": "null"},
                {"name": "y", "type": "double"}
            ]}"#,
        );
        let projector = RecordProjector::new(s).unwrap();
        let vector = projector
            .project(&record(vec![("x", Value::Null), ("y", Value::Double(3.14))]))
            .unwrap();
        assert_eq!(vector.as_slice(), &[0.0, 3.14]);
    }

    #[test]
    fn test_boolean_false_and_explicit_null() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [
                {"name": "p", "type": "boolean"},
                {"name": "q", "type": "int"},
                {"name": "r", "type": "float"}
            ]}"#,
        );
        let map = FieldMap::from_schema(&s).unwrap();
        let vector = map
            .project(&record(vec![
                ("p", Value::Boolean(false)),
                ("q", Value::Null),
                ("r", Value::Float(0.5)),
            ]))
            .unwrap();
        assert_eq!(vector.as_slice(), &[0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_large_long_widens_with_precision_loss() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [{"name": "n", "type": "long"}]}"#,
        );
        let map = FieldMap::from_schema(&s).unwrap();
        let big = i64::MAX;
        let vector = map.project(&record(vec![("n", Value::Long(big))])).unwrap();
        assert_eq!(vector.as_slice()[0], big as f64);
    }

    #[test]
    fn test_mismatched_value_fails_fast() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [{"name": "n", "type": "int"}]}"#,
        );
        let map = FieldMap::from_schema(&s).unwrap();
        let err = map
            .project(&record(vec![("n", Value::String("five".to_string()))]))
            .unwrap_err();
        match err {
            Error::DataConsistency { field, expected, found } => {
                assert_eq!(field, "n");
                assert_eq!(expected, "int");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!Error::Decode(String::new()).is_config());
    }

    #[test]
    fn test_missing_field_is_inconsistent() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [{"name": "n", "type": "int"}]}"#,
        );
        let map = FieldMap::from_schema(&s).unwrap();
        let err = map.project(&record(vec![])).unwrap_err();
        assert!(matches!(err, Error::DataConsistency { .. }));
    }

    #[test]
    fn test_logical_int_and_long_fields_are_kept() {
        let s = schema(
            r#"{"type": "record", "name": "Event", "fields": [
                {"name": "ts", "type": {"type": "long", "logicalType": "timestamp-millis"}},
                {"name": "day", "type": {"type": "int", "logicalType": "date"}},
                {"name": "at", "type": {"type": "long", "logicalType": "local-timestamp-micros"}},
                {"name": "price", "type": {"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 2}},
                {"name": "v", "type": "double"}
            ]}"#,
        );
        let map = FieldMap::from_schema(&s).unwrap();
        assert_eq!(map.retained_names(), vec!["ts", "day", "at", "v"]);
        assert_eq!(map.dropped_names(), vec!["price"]);
        assert_eq!(map.fields()[0].kind, FieldKind::Long);
        assert_eq!(map.fields()[1].kind, FieldKind::Int);

        let vector = map
            .project(&record(vec![
                ("ts", Value::TimestampMillis(1000)),
                ("day", Value::Date(3)),
                ("at", Value::LocalTimestampMicros(7)),
                ("price", Value::Bytes(vec![1, 2])),
                ("v", Value::Double(2.0)),
            ]))
            .unwrap();
        assert_eq!(vector.as_slice(), &[1000.0, 3.0, 7.0, 2.0]);
    }

    #[test]
    fn test_lookup_falls_back_to_name() {
        let s = schema(
            r#"{"type": "record", "name": "Row", "fields": [
                {"name": "a", "type": "int"},
                {"name": "b", "type": "int"}
            ]}"#,
        );
        let map = FieldMap::from_schema(&s).unwrap();
        let vector = map
            .project(&record(vec![("b", Value::Int(2)), ("a", Value::Int(1))]))
            .unwrap();
        assert_eq!(vector.as_slice(), &[1.0, 2.0]);
    }
}
