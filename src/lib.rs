//! # avrovec
//!
//! Converts directories of Avro data files into numeric vector containers, ready
//! for clustering, and optionally samples an initial set of cluster centers.
//!
//! Each record becomes one `f64` vector. Only `int`, `long`, `float`, `double`,
//! `boolean` and `null` fields survive the projection; everything else is dropped
//! and reported. Every input file produces its own container named
//! `<parent-token>-<basename>.vec`, so files with the same name in different
//! directories never collide.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! avrovec --input 'data/*.avro' --output vectors \
//!     --seed seed --seed-size 20 --seed-distance-measure Cosine
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use avrovec::prelude::*;
//! use std::sync::Arc;
//!
//! let mut config = PipelineConfig::new("data/*.avro", "vectors");
//! config.seed = Some(SeedConfig::new("seed"));
//!
//! let storage = Arc::new(LocalStorage::new());
//! let report = ConversionPipeline::new(config, storage).run()?;
//! println!("{} records in {} dimensions", report.total_records(), report.dimension());
//! # Ok::<(), avrovec::Error>(())
//! ```
//!
//! ## Crate Structure
//!
//! - `avrovec-core` - schema projection, record streams, vectors, distance measures
//! - `avrovec-storage` - storage abstraction, output naming, the vector container format
//! - `avrovec-seed` - random seed sampling and seed loading

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{PipelineConfig, SeedConfig};
pub use pipeline::{ConversionPipeline, PipelineStage};
pub use report::{ConversionReport, ConvertedFile};

// Re-export core types
pub use avrovec_core::{
    Distance, DistanceMeasure, DistanceRegistry,
    FieldKind, FieldMap, RecordProjector, RecordStream,
    Vector,
    Error, Result,
};

// Re-export storage
pub use avrovec_storage::{
    ContainerHeader, LocalStorage, SchemaSource, Storage,
    VectorFileReader, VectorFileWriter,
};

// Re-export seeding
pub use avrovec_seed::{RandomSeedGenerator, SeedSampler, SeedSet};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ConversionPipeline, ConversionReport, PipelineConfig, SeedConfig,
        Distance, DistanceMeasure, DistanceRegistry,
        RecordProjector, Vector,
        Error, Result,
        LocalStorage, SchemaSource, Storage,
        VectorFileReader, SeedSet,
    };
}
