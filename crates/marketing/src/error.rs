use std::time::Duration;

use thiserror::Error;

use cadence_core::DomainError;
use cadence_store::StoreError;

#[derive(Debug, Clone, Error)]
pub enum MarketingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Failure of the publish collaborator itself (not a rejected post).
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("publish transport error: {0}")]
    Transport(String),
}
