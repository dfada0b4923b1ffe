use thiserror::Error;

use cadence_core::DomainError;
use cadence_store::StoreError;

use crate::generation::GenerationError;

/// Error raised while executing or bookkeeping a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
