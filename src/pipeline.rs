use std::path::Path;

use tracing::info;

use crate::cleaner;
use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::features;
use crate::loader;
use crate::models::{FeatureTable, QualityReport, RawRecord, RunDiagnostics};

/// Result of one pipeline invocation: the feature table plus everything the
/// caller needs to judge input quality and repair volume.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub features: FeatureTable,
    pub diagnostics: RunDiagnostics,
}

impl PipelineRun {
    pub fn quality(&self) -> &QualityReport {
        &self.diagnostics.quality
    }
}

/// Three-stage batch pipeline: Load -> Clean -> Engineer-Features.
///
/// Each stage is a pure function of (table, config); the pipeline owns the
/// working table exclusively through the run and hands it off at each stage
/// boundary, so no consumer ever sees a partially transformed table. A fresh
/// table is created per invocation; concurrent runs over different sources
/// need no coordination.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline against a source file.
    pub fn run(&self, path: &Path) -> Result<PipelineRun, PipelineError> {
        let (raw, quality) = loader::load(path, &self.config)?;
        self.run_records(raw, quality)
    }

    /// Run the cleaning and feature stages against an already-loaded table,
    /// e.g. one assembled in memory by tests or another ingestion path.
    pub fn run_records(
        &self,
        raw: Vec<RawRecord>,
        quality: QualityReport,
    ) -> Result<PipelineRun, PipelineError> {
        let mut diagnostics = RunDiagnostics::new(quality);
        let clean = cleaner::clean(raw, &self.config, &mut diagnostics)?;
        let features = features::engineer(&clean, &self.config)?;
        info!(
            "Pipeline complete: {} raw rows -> {} feature rows",
            diagnostics.rows_loaded,
            features.len()
        );
        Ok(PipelineRun {
            features,
            diagnostics,
        })
    }
}
