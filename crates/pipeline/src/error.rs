use thiserror::Error;

use cadence_store::StoreError;

/// Errors raised before any step is called.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("pipeline has no steps")]
    Empty,

    #[error("duplicate step name: {0}")]
    DuplicateStep(String),

    #[error("invalid subject: {0:?}")]
    InvalidSubject(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
