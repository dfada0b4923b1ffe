use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use cadence_core::{CampaignId, ContentId, DomainError};
use cadence_marketing::{
    export_ics, regenerate_content, BulkRequest, CampaignPatch, ComplianceChecker, ContentDraft,
    ContentGenerator, ContentItem, ContentPatch, NewCampaign,
};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/campaigns", post(create_campaign).get(list_campaigns))
        .route("/campaigns/:id", get(get_campaign).patch(update_campaign))
        .route("/campaigns/:id/content", post(create_content).get(list_content))
        .route("/campaigns/:id/generate", post(generate_content))
        .route("/content/:id", get(get_content).patch(update_content))
        .route("/content/:id/approve", post(approve_content))
        .route("/content/:id/reject", post(reject_content))
        .route("/content/:id/schedule", post(schedule_content))
        .route("/content/:id/regenerate", post(regenerate))
        .route("/bulk", post(bulk))
        .route("/schedules", get(list_schedules))
        .route("/posts", get(list_posts))
        .route("/calendar.ics", get(calendar))
}

#[derive(Debug, Default, Deserialize)]
pub struct OverrideQuery {
    #[serde(default)]
    pub override_compliance: bool,
}

fn gate_compliance(
    services: &AppServices,
    item: &ContentItem,
    override_compliance: bool,
) -> Result<(), ApiError> {
    if override_compliance {
        return Ok(());
    }
    let report = services.checker.check(item);
    if !report.ok {
        return Err(DomainError::precondition(format!("compliance: {}", report.reason())).into());
    }
    Ok(())
}

// campaigns

pub async fn create_campaign(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewCampaign>,
) -> Result<axum::response::Response, ApiError> {
    let campaign = services.marketing.create_campaign(body)?;
    Ok((StatusCode::CREATED, Json(campaign)).into_response())
}

pub async fn list_campaigns(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.marketing.list_campaigns()?))
}

pub async fn get_campaign(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CampaignId = dto::parse_id(&id)?;
    let campaign = services
        .marketing
        .get_campaign(id)?
        .ok_or_else(|| DomainError::not_found(format!("campaign {id}")))?;
    Ok(Json(campaign))
}

pub async fn update_campaign(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<CampaignPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CampaignId = dto::parse_id(&id)?;
    Ok(Json(services.marketing.update_campaign(id, patch)?))
}

// content

pub async fn create_content(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(draft): Json<ContentDraft>,
) -> Result<axum::response::Response, ApiError> {
    let id: CampaignId = dto::parse_id(&id)?;
    let item = services.marketing.create_content(id, draft)?;
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

/// Create a draft from the built-in template for one platform.
pub async fn generate_content(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::GenerateContentRequest>,
) -> Result<axum::response::Response, ApiError> {
    let id: CampaignId = dto::parse_id(&id)?;
    let campaign = services
        .marketing
        .get_campaign(id)?
        .ok_or_else(|| DomainError::not_found(format!("campaign {id}")))?;
    let draft = services.content_generator.generate(&campaign, body.platform);
    let item = services.marketing.create_content(id, draft)?;
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

pub async fn list_content(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: CampaignId = dto::parse_id(&id)?;
    Ok(Json(services.marketing.list_content(id)?))
}

pub async fn get_content(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ContentId = dto::parse_id(&id)?;
    Ok(Json(services.marketing.require_content(id)?))
}

pub async fn update_content(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<ContentPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ContentId = dto::parse_id(&id)?;
    Ok(Json(services.marketing.update_content(id, patch)?))
}

pub async fn approve_content(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<OverrideQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ContentId = dto::parse_id(&id)?;
    let item = services.marketing.require_content(id)?;
    gate_compliance(&services, &item, query.override_compliance)?;
    Ok(Json(services.marketing.approve_content(id)?))
}

pub async fn reject_content(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Option<Json<dto::RejectRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ContentId = dto::parse_id(&id)?;
    let reason = body.and_then(|Json(b)| b.reason).unwrap_or_default();
    Ok(Json(services.marketing.reject_content(id, &reason)?))
}

pub async fn schedule_content(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<OverrideQuery>,
    Json(body): Json<dto::ScheduleRequest>,
) -> Result<axum::response::Response, ApiError> {
    let id: ContentId = dto::parse_id(&id)?;
    let at = dto::parse_timestamp(&body.scheduled_for)?;
    let item = services.marketing.require_content(id)?;
    gate_compliance(&services, &item, query.override_compliance)?;

    let (content, schedule) = services.bulk.schedule_content(id, at)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "content": content, "schedule": schedule })),
    )
        .into_response())
}

pub async fn regenerate(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::RegenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ContentId = dto::parse_id(&id)?;
    let out = regenerate_content(
        &services.marketing,
        &services.content_generator,
        &services.checker,
        id,
        body.mode,
    )?;
    Ok(Json(out))
}

// bulk + schedule views

pub async fn bulk(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<BulkRequest>,
) -> impl IntoResponse {
    Json(services.bulk.run(&body))
}

pub async fn list_schedules(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.marketing.list_schedules_with_content()?))
}

pub async fn list_posts(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.marketing.list_post_logs()?))
}

pub async fn calendar(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = services.marketing.list_schedules_with_content()?;
    let body = export_ics(&entries, Utc::now());
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"cadence-schedule.ics\"",
            ),
        ],
        body,
    ))
}
