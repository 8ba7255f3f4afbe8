use avrovec_core::{DistanceMeasure, Error, Result, Vector};
use avrovec_storage::{ContainerHeader, Storage, VectorFileReader, VectorFileWriter, OUTPUT_SUFFIX};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{SeedSampler, DISTANCE_MEASURE_KEY};

/// File written inside the seed directory
pub const SEED_FILE_NAME: &str = "part-randomSeed";

/// Uniform random seeding over every container in a directory
pub struct RandomSeedGenerator {
    storage: Arc<dyn Storage>,
    rng_seed: Option<u64>,
}

impl RandomSeedGenerator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            rng_seed: None,
        }
    }

    /// Fix the RNG seed so repeated runs pick the same sample
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    fn containers(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let files: Vec<PathBuf> = self
            .storage
            .list_files(output_dir)?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map_or(false, |name| name.ends_with(OUTPUT_SUFFIX) && !name.starts_with('.'))
            })
            .collect();

        if files.is_empty() {
            return Err(Error::Config(format!(
                "no vector containers found in {}",
                output_dir.display()
            )));
        }
        Ok(files)
    }
}

impl SeedSampler for RandomSeedGenerator {
    fn sample(
        &self,
        output_dir: &Path,
        seed_path: &Path,
        sample_size: usize,
        measure: Arc<dyn DistanceMeasure>,
    ) -> Result<PathBuf> {
        if sample_size == 0 {
            return Err(Error::Config("seed sample size must be at least 1".to_string()));
        }

        if encloses(self.storage.as_ref(), seed_path, output_dir) {
            return Err(Error::Config(format!(
                "seed path {} would replace the output directory {}",
                seed_path.display(),
                output_dir.display()
            )));
        }

        let mut rng = self.rng();
        let mut reservoir: Vec<Vector> = Vec::with_capacity(sample_size);
        let mut seen: u64 = 0;
        let mut fields: Option<Vec<String>> = None;

        for path in self.containers(output_dir)? {
            let reader = VectorFileReader::new(self.storage.open(&path)?)?;
            match &fields {
                None => fields = Some(reader.header().fields.clone()),
                Some(expected) if expected.len() != reader.header().dim() => {
                    return Err(Error::Container(format!(
                        "{} has dimension {}, expected {}",
                        path.display(),
                        reader.header().dim(),
                        expected.len()
                    )));
                }
                Some(_) => {}
            }

            for record in reader {
                let (_, vector) = record?;
                if reservoir.len() < sample_size {
                    reservoir.push(vector);
                } else {
                    let slot = rng.random_range(0..=seen);
                    if slot < sample_size as u64 {
                        reservoir[slot as usize] = vector;
                    }
                }
                seen += 1;
            }
            debug!("Sampled {} ({} vectors seen so far)", path.display(), seen);
        }

        if reservoir.len() < sample_size {
            warn!(
                "Only {} vectors available; seeding with all of them instead of {}",
                reservoir.len(),
                sample_size
            );
        }

        self.storage.remove_all(seed_path)?;
        self.storage.create_dir_all(seed_path)?;
        let target = seed_path.join(SEED_FILE_NAME);

        let header = ContainerHeader::new(fields.unwrap_or_default())
            .with_metadata(DISTANCE_MEASURE_KEY, measure.name())
            .with_metadata("source", self.storage.qualify(output_dir))
            .with_metadata("sampled_from", seen.to_string());
        let mut writer = VectorFileWriter::new(self.storage.create(&target)?, header)?;
        for (cluster_id, center) in reservoir.iter().enumerate() {
            writer.append(cluster_id as u64, center)?;
        }
        let clusters = writer.records();
        writer.finish()?;

        info!(
            "Wrote {} initial clusters out of {} vectors using {}",
            clusters,
            seen,
            measure.name()
        );
        Ok(target)
    }
}

/// Whether `dir` is `ancestor` or lies beneath it, compared by path component
fn encloses(storage: &dyn Storage, ancestor: &Path, dir: &Path) -> bool {
    let ancestor = storage.qualify(ancestor);
    let dir = storage.qualify(dir);
    Path::new(&dir).starts_with(Path::new(&ancestor))
}
