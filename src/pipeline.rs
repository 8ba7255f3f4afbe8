use avrovec_core::{
    Distance, DistanceMeasure, DistanceRegistry, Error, RecordProjector, RecordStream, Result,
};
use avrovec_seed::{RandomSeedGenerator, SeedSampler};
use avrovec_storage::{output_name, schema_from_data_file, ContainerHeader, Storage, VectorFileWriter};
use chrono::Utc;
use rayon::prelude::*;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

use crate::config::{PipelineConfig, SeedConfig};
use crate::report::{ConversionReport, ConvertedFile};

/// Where a run currently is. A run only moves forward; any failure ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Configuring,
    DiscoveringInputs,
    ResolvingSchema,
    PreparingOutput,
    Converting,
    SamplingSeed,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Configuring => "configuring",
            PipelineStage::DiscoveringInputs => "discovering inputs",
            PipelineStage::ResolvingSchema => "resolving schema",
            PipelineStage::PreparingOutput => "preparing output",
            PipelineStage::Converting => "converting",
            PipelineStage::SamplingSeed => "sampling seed",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Converts a set of Avro data files into vector containers, one per input,
/// then optionally samples a seed from the result.
pub struct ConversionPipeline {
    config: PipelineConfig,
    storage: Arc<dyn Storage>,
    registry: DistanceRegistry,
    sampler: Option<Box<dyn SeedSampler>>,
    stage: Mutex<PipelineStage>,
}

impl ConversionPipeline {
    pub fn new(config: PipelineConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            config,
            storage,
            registry: DistanceRegistry::with_builtins(),
            sampler: None,
            stage: Mutex::new(PipelineStage::Configuring),
        }
    }

    /// Replace the distance registry used to resolve the seed measure
    #[must_use]
    pub fn with_registry(mut self, registry: DistanceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use `sampler` instead of a [`RandomSeedGenerator`] over the pipeline's storage
    #[must_use]
    pub fn with_sampler(mut self, sampler: Box<dyn SeedSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage of the current or most recent run
    pub fn stage(&self) -> PipelineStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next`, returning the stage that was left
    fn advance(&self, next: PipelineStage) -> PipelineStage {
        let mut stage = self.stage.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *stage;
        debug!("Stage {} -> {}", previous, next);
        *stage = next;
        previous
    }

    /// Execute every stage in order
    pub fn run(&self) -> Result<ConversionReport> {
        self.advance(PipelineStage::Configuring);
        match self.run_stages() {
            Ok(report) => {
                info!("Wrote {} files to {}", report.files.len(), report.output_dir);
                info!(
                    "Converted {} records in {} ms; list the output with `ls {}`",
                    report.total_records(),
                    (report.finished_at - report.started_at).num_milliseconds(),
                    self.config.output_dir.display()
                );
                Ok(report)
            }
            Err(e) => {
                let failed_in = self.advance(PipelineStage::Failed);
                error!("Run failed while {}: {}", failed_in, e);
                Err(e)
            }
        }
    }

    fn run_stages(&self) -> Result<ConversionReport> {
        let started_at = Utc::now();
        self.config.validate()?;

        self.advance(PipelineStage::DiscoveringInputs);
        let inputs = self.discover_inputs()?;

        self.advance(PipelineStage::ResolvingSchema);
        let projector = self.resolve_schema(&inputs)?;

        self.advance(PipelineStage::PreparingOutput);
        self.prepare_output()?;

        self.advance(PipelineStage::Converting);
        let files = self.convert_all(&projector, &inputs)?;

        let seed = match &self.config.seed {
            Some(seed) => {
                self.advance(PipelineStage::SamplingSeed);
                Some(self.sample_seed(seed)?)
            }
            None => None,
        };

        self.advance(PipelineStage::Done);
        let field_map = projector.field_map();
        Ok(ConversionReport {
            output_dir: self.storage.qualify(&self.config.output_dir),
            files,
            retained_fields: field_map.retained_names(),
            dropped_fields: field_map.dropped_names(),
            seed,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Input files matching the configured pattern, sorted
    pub fn discover_inputs(&self) -> Result<Vec<PathBuf>> {
        let inputs = self.storage.glob(&self.config.input_glob)?;
        if inputs.is_empty() {
            return Err(Error::Config(format!(
                "no input files match '{}'",
                self.config.input_glob
            )));
        }
        info!("Found {} input files matching '{}'", inputs.len(), self.config.input_glob);
        Ok(inputs)
    }

    /// Explicit schema if configured, else the header schema of the first input
    pub fn resolve_schema(&self, inputs: &[PathBuf]) -> Result<RecordProjector> {
        let schema = match &self.config.schema {
            Some(source) => {
                info!("Using schema from {}", source.path().display());
                source.load(self.storage.as_ref())?
            }
            None => {
                let first = inputs
                    .first()
                    .ok_or_else(|| Error::Config("no input files to take a schema from".to_string()))?;
                info!("Using schema embedded in {}", first.display());
                schema_from_data_file(self.storage.as_ref(), first)?
            }
        };

        let projector = RecordProjector::new(schema)?;
        let field_map = projector.field_map();
        info!(
            "Using {} of {} fields; {} non-numeric fields dropped",
            field_map.len(),
            field_map.len() + field_map.dropped().len(),
            field_map.dropped().len()
        );
        debug!("Retained fields: {:?}", field_map.retained_names());
        debug!("Dropped fields: {:?}", field_map.dropped_names());
        if field_map.is_empty() {
            warn!("No field survives projection; every vector will be empty");
        }
        Ok(projector)
    }

    pub fn prepare_output(&self) -> Result<PathBuf> {
        let dir = self.storage.create_dir_all(&self.config.output_dir)?;
        debug!("Output directory ready at {}", dir.display());
        Ok(dir)
    }

    fn convert_all(&self, projector: &RecordProjector, inputs: &[PathBuf]) -> Result<Vec<ConvertedFile>> {
        if self.config.parallel {
            inputs
                .par_iter()
                .map(|input| self.convert_file(projector, input))
                .collect()
        } else {
            inputs
                .iter()
                .map(|input| self.convert_file(projector, input))
                .collect()
        }
    }

    /// Convert one input into `<output>/<token>-<basename>.vec`.
    /// Once the target has been created, a failure removes it; an existing
    /// target is untouched when the input cannot be opened.
    pub fn convert_file(&self, projector: &RecordProjector, input: &Path) -> Result<ConvertedFile> {
        let target = self.config.output_dir.join(output_name(self.storage.as_ref(), input)?);
        info!("Converting {} => {}", input.display(), target.display());

        let stream = RecordStream::open(projector, self.storage.open(input)?)?;
        let output = self.storage.create(&target)?;
        match self.write_container(projector, input, stream, output) {
            Ok(records) => {
                debug!("Wrote {} records to {}", records, target.display());
                Ok(ConvertedFile {
                    input: input.to_path_buf(),
                    output: target,
                    records,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.remove_all(&target) {
                    warn!("Unable to remove partial output {}: {}", target.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    fn write_container<R: Read>(
        &self,
        projector: &RecordProjector,
        input: &Path,
        mut stream: RecordStream<'_, R>,
        output: Box<dyn Write + Send>,
    ) -> Result<u64> {
        let header = ContainerHeader::new(projector.field_map().retained_names())
            .compressed(self.config.compress)
            .with_metadata("source", self.storage.qualify(input));

        let mut writer = VectorFileWriter::new(output, header)?;
        let records = writer.append_all(&mut stream)?;
        stream.close();
        writer.finish()?;
        Ok(records)
    }

    fn resolve_measure(&self, seed: &SeedConfig) -> Result<Arc<dyn DistanceMeasure>> {
        match seed.distance_measure.as_deref() {
            Some(name) => self.registry.resolve(name).map_err(|e| {
                if matches!(e, Error::UnknownDistance(_)) {
                    error!("Known distance measures: {}", self.registry.qualified_names().join(", "));
                }
                e
            }),
            None => Ok(Arc::new(Distance::default())),
        }
    }

    fn sample_seed(&self, seed: &SeedConfig) -> Result<PathBuf> {
        let measure = self.resolve_measure(seed)?;
        info!(
            "Generating initial cluster using {} samples and distance measure {}",
            seed.sample_size,
            measure.name()
        );

        let path = match &self.sampler {
            Some(sampler) => {
                sampler.sample(&self.config.output_dir, &seed.seed_path, seed.sample_size, measure)?
            }
            None => {
                let mut sampler = RandomSeedGenerator::new(self.storage.clone());
                if let Some(rng_seed) = seed.rng_seed {
                    sampler = sampler.with_rng_seed(rng_seed);
                }
                sampler.sample(&self.config.output_dir, &seed.seed_path, seed.sample_size, measure)?
            }
        };
        info!("Seed written to {}", path.display());
        Ok(path)
    }
}
