use avrovec_core::{DistanceMeasure, DistanceRegistry, Error, Result, Vector};
use avrovec_storage::{Storage, VectorFileReader};
use std::path::Path;
use std::sync::Arc;

use crate::DISTANCE_MEASURE_KEY;

/// A loaded seed artifact: cluster centers plus the measure they were drawn for
#[derive(Debug)]
pub struct SeedSet {
    centers: Vec<(u64, Vector)>,
    measure: Arc<dyn DistanceMeasure>,
}

impl SeedSet {
    pub fn new(centers: Vec<(u64, Vector)>, measure: Arc<dyn DistanceMeasure>) -> Self {
        Self { centers, measure }
    }

    /// Read a seed file, resolving its recorded measure through `registry`
    pub fn load(storage: &dyn Storage, path: &Path, registry: &DistanceRegistry) -> Result<Self> {
        let reader = VectorFileReader::new(storage.open(path)?)?;
        let name = reader
            .header()
            .metadata
            .get(DISTANCE_MEASURE_KEY)
            .cloned()
            .ok_or_else(|| {
                Error::Container(format!("{} does not name a distance measure", path.display()))
            })?;
        let measure = registry.resolve(&name)?;
        let centers = reader.collect::<Result<Vec<_>>>()?;
        Ok(Self { centers, measure })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    #[inline]
    pub fn centers(&self) -> &[(u64, Vector)] {
        &self.centers
    }

    #[inline]
    pub fn measure(&self) -> &dyn DistanceMeasure {
        self.measure.as_ref()
    }

    /// Closest center to `vector` under the seed's measure
    pub fn nearest(&self, vector: &Vector) -> Option<(u64, f64)> {
        self.centers
            .iter()
            .map(|(id, center)| (*id, self.measure.distance(center.as_slice(), vector.as_slice())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
