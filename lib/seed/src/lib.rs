//! # avrovec Seed
//!
//! Initial cluster seeding over a directory of converted vector containers.
//!
//! The converter treats seeding as an external service: it hands a [`SeedSampler`]
//! the output directory, a seed location, a sample size and a resolved
//! [`DistanceMeasure`], and gets back the path of the written seed artifact.
//!
//! [`RandomSeedGenerator`] is the default sampler. It draws `k` vectors uniformly
//! at random (reservoir sampling, one pass, `O(k)` memory) and writes them as
//! cluster centers `0..k` to `<seed>/part-randomSeed`.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │ *.vec files │────>│  Reservoir  │────>│ part-randomSeed  │
//! │ (output dir)│     │  (k slots)  │     │ (k centers)      │
//! └─────────────┘     └─────────────┘     └──────────────────┘
//! ```

pub mod random;
pub mod seed_set;

pub use random::{RandomSeedGenerator, SEED_FILE_NAME};
pub use seed_set::SeedSet;

use avrovec_core::{DistanceMeasure, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default number of seed samples
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Metadata key naming the distance measure in a seed artifact
pub const DISTANCE_MEASURE_KEY: &str = "distance_measure";

/// Produces an initial cluster sample from converted output
pub trait SeedSampler: Send + Sync {
    fn sample(
        &self,
        output_dir: &Path,
        seed_path: &Path,
        sample_size: usize,
        measure: Arc<dyn DistanceMeasure>,
    ) -> Result<PathBuf>;
}
