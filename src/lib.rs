//! Batch pipeline for daily Brent oil prices: load a delimited price file,
//! repair data-quality defects, and derive the feature table (returns,
//! rolling volatility, calendar attributes, moving averages, momentum)
//! consumed by the downstream change-point model and dashboards.
//!
//! Data flows strictly Loader -> Cleaner -> FeatureEngineer; the
//! [`pipeline::Pipeline`] orchestrator folds the stages in that order and
//! returns the feature table plus run diagnostics.
//!
//! ```no_run
//! use brent_pipeline::{Pipeline, PipelineConfig};
//! use std::path::Path;
//!
//! let run = Pipeline::new(PipelineConfig::default())
//!     .run(Path::new("data/raw/BrentOilPrices.csv"))?;
//! println!("{}", run.quality().summary());
//! run.features.write_csv(std::io::stdout())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cleaner;
pub mod config;
pub mod errors;
pub mod features;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod stats;

pub use config::{MissingPriceStrategy, OutlierStrategy, PipelineConfig, SourceSchema};
pub use errors::PipelineError;
pub use models::{
    FeatureRecord, FeatureTable, PriceRecord, QualityReport, RawRecord, RunDiagnostics,
};
pub use pipeline::{Pipeline, PipelineRun};
