use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Terminal pipeline failures. Every variant indicates malformed input rather
/// than a transient condition, so none of them is retried.
///
/// Recoverable defects (unparseable individual dates, missing prices,
/// statistical outliers) never surface here; they are repaired or dropped in
/// place and counted in [`crate::models::RunDiagnostics`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// The file exists but no usable table came out of it: unreadable as
    /// UTF-8 text, or no supported delimiter produced consistent rows.
    #[error("could not parse {path}: {reason}")]
    UnparseableSource { path: PathBuf, reason: String },

    #[error("missing required columns: {missing:?}. Found: {found:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("no rows left after cleaning")]
    EmptyDataset,

    #[error("non-positive price {price} on {date}: log transform is undefined")]
    NonPositivePrice { date: NaiveDate, price: f64 },
}
