use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use cadence_core::{DomainError, PipelineJobId};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/:subject", post(run_pipeline).get(get_job))
}

#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    pub job_id: Option<String>,
}

/// Run every step for `subject`. The step log is returned on failure too;
/// `ok` tells the caller which it was.
pub async fn run_pipeline(
    Extension(services): Extension<Arc<AppServices>>,
    Path(subject): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = services.pipeline.run(&subject).await?;
    Ok(Json(report))
}

/// A stored job by `?job_id=`, else the subject's most recent one.
pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(subject): Path<String>,
    Query(query): Query<JobQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let subject = subject.trim();
    let jobs = services.pipeline.jobs();

    let job = match query.job_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(raw) => {
            let id: PipelineJobId = dto::parse_id(raw)?;
            jobs.get(id)?
                .filter(|job| job.subject == subject)
                .ok_or_else(|| DomainError::not_found(format!("pipeline job {id}")))?
        }
        None => jobs
            .last_for(subject)?
            .ok_or_else(|| DomainError::not_found(format!("no pipeline job recorded for {subject}")))?,
    };
    Ok(Json(job))
}
