use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use cadence_core::DomainError;
use cadence_marketing::MarketingError;
use cadence_pipeline::PipelineError;
use cadence_runs::RunError;
use cadence_store::StoreError;

/// Handler error, rendered as `{"error": code, "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Marketing(#[from] MarketingError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvalidTransition(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition", msg)
        }
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Precondition(msg) => json_error(StatusCode::CONFLICT, "precondition_failed", msg),
    }
}

fn store_error_to_response(err: StoreError) -> Response {
    tracing::error!(error = %err, "store error");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Domain(e) => domain_error_to_response(e),
            ApiError::Store(e) => store_error_to_response(e),
            ApiError::Run(RunError::Domain(e)) => domain_error_to_response(e),
            ApiError::Run(RunError::Store(e)) => store_error_to_response(e),
            ApiError::Run(RunError::Generation(e)) => {
                json_error(StatusCode::BAD_GATEWAY, "generation_error", e.to_string())
            }
            ApiError::Marketing(MarketingError::Domain(e)) => domain_error_to_response(e),
            ApiError::Marketing(MarketingError::Store(e)) => store_error_to_response(e),
            ApiError::Marketing(MarketingError::Publish(e)) => {
                json_error(StatusCode::BAD_GATEWAY, "publish_error", e.to_string())
            }
            ApiError::Pipeline(PipelineError::Store(e)) => store_error_to_response(e),
            ApiError::Pipeline(e) => json_error(StatusCode::BAD_REQUEST, "pipeline_error", e.to_string()),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
