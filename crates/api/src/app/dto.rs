use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use cadence_core::DomainError;
use cadence_marketing::{Platform, RegenerateMode};
use cadence_runs::Run;

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub input: Map<String, JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentRequest {
    pub platform: Platform,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// RFC 3339
    pub scheduled_for: String,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateRequest {
    #[serde(default = "default_regenerate_mode")]
    pub mode: RegenerateMode,
}

fn default_regenerate_mode() -> RegenerateMode {
    RegenerateMode::All
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct RunWithLogs {
    pub run: Run,
    pub logs: Vec<String>,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.trim().parse::<T>().map_err(ApiError::from)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DomainError::validation(format!("invalid timestamp {raw:?}: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::RunId;

    #[test]
    fn regenerate_defaults_to_all() {
        let req: RegenerateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.mode, RegenerateMode::All);
        let req: RegenerateRequest = serde_json::from_str(r#"{"mode":"hooks"}"#).unwrap();
        assert_eq!(req.mode, RegenerateMode::Hooks);
    }

    #[test]
    fn timestamps_are_normalised_to_utc() {
        let at = parse_timestamp("2026-03-01T10:00:00+02:00").unwrap();
        assert_eq!(at.to_rfc3339(), "2026-03-01T08:00:00+00:00");
        assert!(parse_timestamp("tomorrow").is_err());
    }

    #[test]
    fn bad_ids_are_rejected() {
        assert!(parse_id::<RunId>("not-a-uuid").is_err());
        let id = RunId::new();
        assert_eq!(parse_id::<RunId>(&id.to_string()).unwrap(), id);
    }
}
