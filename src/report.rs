use atomicwrites::{AllowOverwrite, AtomicFile};
use avrovec_core::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One converted input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub records: u64,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Qualified output directory
    pub output_dir: String,
    pub files: Vec<ConvertedFile>,
    /// Field names that became vector slots, in slot order
    pub retained_fields: Vec<String>,
    pub dropped_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ConversionReport {
    #[inline]
    pub fn dimension(&self) -> usize {
        self.retained_fields.len()
    }

    pub fn total_records(&self) -> u64 {
        self.files.iter().map(|f| f.records).sum()
    }

    /// Write the report as pretty JSON, replacing `path` atomically
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Container(format!("unable to serialize report: {}", e)))?;
        AtomicFile::new(path, AllowOverwrite)
            .write(|f| f.write_all(&json))
            .map_err(|e| match e {
                atomicwrites::Error::Internal(io) | atomicwrites::Error::User(io) => Error::Io(io),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ConversionReport {
        let now = Utc::now();
        ConversionReport {
            output_dir: "file:///out".to_string(),
            files: vec![
                ConvertedFile {
                    input: PathBuf::from("a/x.avro"),
                    output: PathBuf::from("out/0badf00d-x.avro.vec"),
                    records: 3,
                },
                ConvertedFile {
                    input: PathBuf::from("b/x.avro"),
                    output: PathBuf::from("out/deadbeef-x.avro.vec"),
                    records: 4,
                },
            ],
            retained_fields: vec!["a".to_string(), "c".to_string()],
            dropped_fields: vec!["b".to_string()],
            seed: None,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_totals() {
        let report = report();
        assert_eq!(report.total_records(), 7);
        assert_eq!(report.dimension(), 2);
    }

    #[test]
    fn test_write_json_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, b"stale").unwrap();

        report().write_json(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["retained_fields"], serde_json::json!(["a", "c"]));
        assert_eq!(value["files"][1]["records"], 4);
        assert!(value.get("seed").is_none());
    }
}
