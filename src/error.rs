//! Analysis error types

use thiserror::Error;

/// Contract errors raised when the input sweep is structurally broken.
///
/// Data-quality conditions (NaN metrics, missing optional columns,
/// degenerate distributions) are never errors; they are the findings the
/// analyzer exists to surface.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("sweep contains no trials")]
    EmptySweep,

    #[error("required column '{0}' missing from input rows")]
    MissingColumn(String),

    #[error("duplicate trial id: {0}")]
    DuplicateTrialId(String),
}

/// Result type for sweep analysis operations
pub type Result<T> = std::result::Result<T, AnalyzeError>;
