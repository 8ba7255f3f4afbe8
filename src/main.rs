use avrovec::{
    ConversionPipeline, LocalStorage, PipelineConfig, SchemaSource, SeedConfig, Storage,
};
use avrovec_seed::DEFAULT_SAMPLE_SIZE;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Convert Avro data files into clustering vectors
#[derive(Parser, Debug)]
#[command(name = "avrovec")]
#[command(about = "Convert Avro records into numeric vectors", long_about = None)]
struct Args {
    /// Glob selecting the input Avro data files
    #[arg(short, long)]
    input: String,

    /// Directory receiving the vector containers
    #[arg(short, long)]
    output: PathBuf,

    /// Reader schema file
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Read the --schema file from the local filesystem instead of storage
    #[arg(short, long, requires = "schema")]
    local_schema: bool,

    /// Directory to write an initial cluster seed to
    #[arg(short = 'z', long)]
    seed: Option<PathBuf>,

    /// Number of seed samples
    #[arg(short = 'k', long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    seed_size: usize,

    /// Distance measure recorded with the seed (alias or qualified name)
    #[arg(short = 'd', long)]
    seed_distance_measure: Option<String>,

    /// Fixed RNG seed for a reproducible sample
    #[arg(long)]
    seed_rng: Option<u64>,

    /// Gzip the container bodies
    #[arg(long)]
    compress: bool,

    /// Convert input files in parallel
    #[arg(long)]
    parallel: bool,

    /// Resolve relative storage paths against this directory
    #[arg(long)]
    storage_root: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let schema = self.schema.as_ref().map(|path| {
            if self.local_schema {
                SchemaSource::Local(path.clone())
            } else {
                SchemaSource::Storage(path.clone())
            }
        });

        let seed = self.seed.as_ref().map(|path| SeedConfig {
            seed_path: path.clone(),
            sample_size: self.seed_size,
            distance_measure: self.seed_distance_measure.clone(),
            rng_seed: self.seed_rng,
        });

        PipelineConfig {
            input_glob: self.input.clone(),
            output_dir: self.output.clone(),
            schema,
            compress: self.compress,
            parallel: self.parallel,
            seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting avrovec v{}", env!("CARGO_PKG_VERSION"));
    info!("Input: {}", args.input);
    info!("Output directory: {:?}", args.output);

    let storage: Arc<dyn Storage> = match &args.storage_root {
        Some(root) => Arc::new(LocalStorage::rooted(root)),
        None => Arc::new(LocalStorage::new()),
    };

    let report = ConversionPipeline::new(args.pipeline_config(), storage).run()?;

    if let Some(path) = &args.report {
        report.write_json(path)?;
        info!("Report written to {:?}", path);
    }
    if let Some(seed) = &report.seed {
        info!("Seed: {}", seed.display());
    }

    info!(
        "Done: {} files, {} records, dimension {}",
        report.files.len(),
        report.total_records(),
        report.dimension()
    );
    Ok(())
}
