//! Error types for fmcat-engine
//!
//! Stage failures abort the run; libraries persisted by earlier stages are
//! left intact so the run can be retried.

use fmcat_common::events::PipelineStage;
use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Unexpected failure inside a stage (aborts the run)
    #[error("Stage {stage} failed: {message}")]
    StageFailure {
        stage: PipelineStage,
        message: String,
    },

    /// Downstream stages requested while conflicts are unresolved
    #[error("Stage {stage} is waiting on {count} unresolved conflict(s)")]
    ConflictPending { stage: PipelineStage, count: usize },

    /// Resolution does not match a pending conflict or library entry
    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    /// Persistence or configuration error
    #[error(transparent)]
    Store(#[from] fmcat_common::Error),
}

impl CatalogError {
    pub fn stage(stage: PipelineStage, message: impl Into<String>) -> Self {
        CatalogError::StageFailure {
            stage,
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations
pub type CatalogResult<T> = Result<T, CatalogError>;
