use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::CronConfig;

/// Header accepted as an alternative to `Authorization: Bearer`.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Enable switch and shared-secret check for cron ticks.
///
/// Disabled ticks answer `200 {"ok": true}` without running so the external
/// scheduler does not treat them as failures.
pub async fn cron_gate(
    State(cron): State<CronConfig>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !cron.enabled {
        debug!(path = %req.uri().path(), "cron disabled; tick skipped");
        return Json(json!({
            "ok": true,
            "message": "Cron disabled (set CRON_ENABLED=true)",
        }))
        .into_response();
    }

    if let Some(secret) = cron.secret.as_deref() {
        if presented_secret(req.headers()) != Some(secret) {
            warn!(path = %req.uri().path(), "cron call rejected");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "ok": false, "error": "Unauthorized" })),
            )
                .into_response();
        }
    }

    next.run(req).await
}

fn presented_secret(headers: &HeaderMap) -> Option<&str> {
    extract_bearer(headers).or_else(|| {
        headers
            .get(CRON_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("xyz"));
        assert_eq!(presented_secret(&headers), Some("abc"));
    }

    #[test]
    fn falls_back_to_secret_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static(" xyz "));
        assert_eq!(presented_secret(&headers), Some("xyz"));
    }

    #[test]
    fn nothing_presented() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(presented_secret(&headers), None);
    }
}
