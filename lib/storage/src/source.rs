use avrovec_core::apache_avro::Schema;
use avrovec_core::{read_writer_schema, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::fs::{with_path, Storage};

/// Where an explicit reader schema comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaSource {
    /// The process-local filesystem, regardless of the storage root
    Local(PathBuf),
    /// A path on the configured storage layer
    Storage(PathBuf),
}

impl SchemaSource {
    pub fn path(&self) -> &Path {
        match self {
            SchemaSource::Local(path) | SchemaSource::Storage(path) => path,
        }
    }

    /// Read and parse the full schema definition
    pub fn load(&self, storage: &dyn Storage) -> Result<Schema> {
        let mut input: Box<dyn Read> = match self {
            SchemaSource::Local(path) => {
                Box::new(BufReader::new(File::open(path).map_err(|e| with_path(path, e))?))
            }
            SchemaSource::Storage(path) => storage.open(path)?,
        };

        let mut text = String::new();
        input.read_to_string(&mut text)?;
        debug!("Parsing schema from {:?}", self);
        parse_schema(&text)
    }
}

/// Parse a schema definition, mapping failures to schema errors
pub fn parse_schema(text: &str) -> Result<Schema> {
    Schema::parse_str(text).map_err(|e| Error::Schema(format!("unable to parse schema: {}", e)))
}

/// Schema embedded in the header of an Avro data file on storage. Records are not read.
///
/// A header that cannot be read is an I/O or decode failure, not a schema error.
pub fn schema_from_data_file(storage: &dyn Storage, path: &Path) -> Result<Schema> {
    let input = storage.open(path)?;
    read_writer_schema(input).map_err(|e| match e {
        Error::Decode(msg) => {
            Error::Decode(format!("unable to read schema header of {}: {}", path.display(), msg))
        }
        Error::Io(io) => with_path(path, io),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalStorage;
    use avrovec_core::apache_avro::{types::Record, Writer};
    use std::fs;

    const SCHEMA: &str = r#"{"type": "record", "name": "Row", "fields": [
        {"name": "x", "type": "null"},
        {"name": "y", "type": "double"}
    ]}"#;

    #[test]
    fn test_storage_and_local_sources() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        fs::write(root.path().join("row.avsc"), SCHEMA).unwrap();
        fs::write(elsewhere.path().join("row.avsc"), SCHEMA).unwrap();

        let storage = LocalStorage::rooted(root.path());
        let from_storage = SchemaSource::Storage(PathBuf::from("row.avsc")).load(&storage).unwrap();
        let from_local = SchemaSource::Local(elsewhere.path().join("row.avsc"))
            .load(&storage)
            .unwrap();
        assert_eq!(from_storage, from_local);
    }

    #[test]
    fn test_local_source_ignores_storage_root() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("row.avsc"), SCHEMA).unwrap();

        let storage = LocalStorage::rooted(root.path());
        let err = SchemaSource::Local(PathBuf::from("definitely-not-here/row.avsc"))
            .load(&storage)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_unparseable_schema() {
        let err = parse_schema("{\"type\": \"recrod\"").unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.is_config());
    }

    #[test]
    fn test_schema_from_data_file() {
        let root = tempfile::tempdir().unwrap();
        let schema = parse_schema(SCHEMA).unwrap();
        let mut writer = Writer::new(&schema, Vec::new());
        let mut record = Record::new(&schema).unwrap();
        record.put("x", ());
        record.put("y", 3.14f64);
        writer.append(record).unwrap();
        fs::write(root.path().join("data.avro"), writer.into_inner().unwrap()).unwrap();

        let storage = LocalStorage::rooted(root.path());
        let header = schema_from_data_file(&storage, Path::new("data.avro")).unwrap();
        assert_eq!(header, schema);

        fs::write(root.path().join("plain.txt"), b"not avro").unwrap();
        let err = schema_from_data_file(&storage, Path::new("plain.txt")).unwrap_err();
        assert!(matches!(err, Error::Decode(_) | Error::Io(_)));
        assert!(!err.is_config());

        let err = schema_from_data_file(&storage, Path::new("missing.avro")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_config());
    }
}
