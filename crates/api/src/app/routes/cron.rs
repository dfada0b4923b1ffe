//! Tick endpoints hit by the external scheduler.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/runs/tick", post(runs_tick))
        .route("/marketing/tick", get(marketing_tick).post(marketing_tick))
}

pub async fn runs_tick(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<JsonValue>, ApiError> {
    let report = services.processor.tick().await?;
    Ok(Json(json!({ "ok": true, "report": report })))
}

pub async fn marketing_tick(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<JsonValue>, ApiError> {
    let report = services.dispatcher.tick(Utc::now()).await?;
    Ok(Json(json!({ "ok": true, "report": report })))
}
