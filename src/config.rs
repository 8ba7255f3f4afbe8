use avrovec_core::{Error, Result};
use avrovec_seed::DEFAULT_SAMPLE_SIZE;
use avrovec_storage::SchemaSource;
use std::path::PathBuf;

/// Configuration for one conversion run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Glob over the storage layer selecting the input Avro data files
    pub input_glob: String,
    /// Directory receiving one vector container per input file
    pub output_dir: PathBuf,
    /// Explicit reader schema; the first input's header schema when absent
    pub schema: Option<SchemaSource>,
    /// Gzip the body of every output container
    pub compress: bool,
    /// Convert files on the rayon pool instead of one after another
    pub parallel: bool,
    pub seed: Option<SeedConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_glob: String::new(),
            output_dir: PathBuf::new(),
            schema: None,
            compress: false,
            parallel: false,
            seed: None,
        }
    }
}

impl PipelineConfig {
    pub fn new(input_glob: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_glob: input_glob.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Checks that need no I/O. Distance names are resolved later, at sampling time.
    pub fn validate(&self) -> Result<()> {
        if self.input_glob.trim().is_empty() {
            return Err(Error::Config("an input pattern is required".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("an output directory is required".to_string()));
        }
        if let Some(seed) = &self.seed {
            if seed.sample_size == 0 {
                return Err(Error::Config("seed sample size must be at least 1".to_string()));
            }
            if seed.seed_path.as_os_str().is_empty() {
                return Err(Error::Config("seed path is empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Optional seed sampling stage
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub seed_path: PathBuf,
    pub sample_size: usize,
    /// Alias or qualified name; Euclidean when absent
    pub distance_measure: Option<String>,
    /// Fixed RNG seed for reproducible samples
    pub rng_seed: Option<u64>,
}

impl SeedConfig {
    pub fn new(seed_path: impl Into<PathBuf>) -> Self {
        Self {
            seed_path: seed_path.into(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            distance_measure: None,
            rng_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let seed = SeedConfig::new("seed");
        assert_eq!(seed.sample_size, 10);
        assert!(seed.distance_measure.is_none());

        let config = PipelineConfig::new("in/*.avro", "out");
        assert!(!config.compress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_options() {
        assert!(PipelineConfig::default().validate().unwrap_err().is_config());
        assert!(PipelineConfig::new("in/*.avro", "").validate().is_err());

        let mut config = PipelineConfig::new("in/*.avro", "out");
        let mut seed = SeedConfig::new("seed");
        seed.sample_size = 0;
        config.seed = Some(seed);
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_unknown_distance_is_not_checked_up_front() {
        let mut config = PipelineConfig::new("in/*.avro", "out");
        let mut seed = SeedConfig::new("seed");
        seed.distance_measure = Some("NoSuchMeasure".to_string());
        config.seed = Some(seed);
        assert!(config.validate().is_ok());
    }
}
