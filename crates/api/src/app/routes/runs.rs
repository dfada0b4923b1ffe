use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use cadence_core::{DomainError, RunId};
use cadence_runs::store::{DEFAULT_LOG_LIMIT, DEFAULT_RECENT_LIMIT};
use cadence_runs::RunKind;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_run).get(list_runs))
        .route("/:id", get(get_run))
}

pub async fn create_run(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateRunRequest>,
) -> Result<axum::response::Response, ApiError> {
    if body.kind.trim().is_empty() {
        return Err(DomainError::validation("kind is required").into());
    }
    let title = if body.title.trim().is_empty() {
        body.kind.clone()
    } else {
        body.title
    };

    let run = services
        .processor
        .submit(RunKind::new(body.kind.trim()), title, body.input)?;
    Ok((StatusCode::CREATED, Json(run)).into_response())
}

pub async fn list_runs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(services.processor.runs().list_recent(limit)?))
}

pub async fn get_run(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id: RunId = dto::parse_id(&id)?;
    let run = services
        .processor
        .runs()
        .get(id)?
        .ok_or_else(|| DomainError::not_found(format!("run {id}")))?;
    let logs = services
        .processor
        .runs()
        .logs(id, query.limit.unwrap_or(DEFAULT_LOG_LIMIT))?;

    Ok(Json(dto::RunWithLogs { run, logs }))
}
