//! Process configuration loaded from environment variables.

use std::time::Duration;

use tracing::warn;

use cadence_pipeline::DEFAULT_STEP_TIMEOUT;
use cadence_runs::HttpGeneratorConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PIPELINE_BASE_URL: &str = "http://127.0.0.1:3000";
const MIN_STEP_TIMEOUT_MS: u64 = 3_000;
const MAX_STEP_TIMEOUT_MS: u64 = 120_000;

/// Gate in front of the cron tick endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CronConfig {
    /// Ticks do nothing unless enabled.
    pub enabled: bool,
    /// Shared secret; when unset every caller is accepted.
    pub secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub cron: CronConfig,
    pub redis_url: Option<String>,
    pub runs_max_per_tick: usize,
    pub runs_max_attempts: u32,
    pub dispatch_batch_size: usize,
    pub approval_required: bool,
    pub pipeline_base_url: String,
    pub pipeline_dry_run: bool,
    pub pipeline_optional_steps: bool,
    pub pipeline_step_timeout: Duration,
    pub generation: HttpGeneratorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cron: CronConfig::default(),
            redis_url: None,
            runs_max_per_tick: 2,
            runs_max_attempts: 2,
            dispatch_batch_size: 25,
            approval_required: true,
            pipeline_base_url: DEFAULT_PIPELINE_BASE_URL.to_string(),
            pipeline_dry_run: false,
            pipeline_optional_steps: true,
            pipeline_step_timeout: DEFAULT_STEP_TIMEOUT,
            generation: HttpGeneratorConfig::default(),
        }
    }
}

fn flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| {
            get(key).and_then(|v| match v.trim().parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(key, value = %v, "ignoring non-numeric setting");
                    None
                }
            })
        };
        let boolean = |key: &str| get(key).and_then(|v| flag(&v));

        let mut config = Self::default();

        if let Some(addr) = get("CADENCE_BIND_ADDR") {
            config.bind_addr = addr;
        }

        // Only the literal "true" turns ticks on.
        config.cron.enabled = get("CRON_ENABLED")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        config.cron.secret = get("CRON_SECRET");
        if config.cron.enabled && config.cron.secret.is_none() {
            warn!("CRON_SECRET not set; cron endpoints accept unauthenticated calls");
        }

        config.redis_url = get("REDIS_URL");
        if config.redis_url.is_none() {
            warn!("REDIS_URL not set; using in-memory store (state is lost on restart)");
        }

        if let Some(n) = number("RUNS_MAX_PER_TICK") {
            config.runs_max_per_tick = n as usize;
        }
        if let Some(n) = number("RUNS_MAX_ATTEMPTS") {
            config.runs_max_attempts = (n as u32).max(1);
        }
        if let Some(n) = number("DISPATCH_BATCH_SIZE") {
            config.dispatch_batch_size = n as usize;
        }
        if let Some(b) = boolean("MARKETING_APPROVAL_REQUIRED") {
            config.approval_required = b;
        }

        match get("PIPELINE_BASE_URL") {
            Some(url) => config.pipeline_base_url = url,
            None => warn!(
                default = DEFAULT_PIPELINE_BASE_URL,
                "PIPELINE_BASE_URL not set; using local default"
            ),
        }
        if let Some(b) = boolean("PIPELINE_DRY_RUN") {
            config.pipeline_dry_run = b;
        }
        if let Some(b) = boolean("PIPELINE_OPTIONAL_STEPS") {
            config.pipeline_optional_steps = b;
        }
        if let Some(ms) = number("PIPELINE_STEP_TIMEOUT_MS") {
            config.pipeline_step_timeout =
                Duration::from_millis(ms.clamp(MIN_STEP_TIMEOUT_MS, MAX_STEP_TIMEOUT_MS));
        }

        if let Some(url) = get("GENERATION_API_URL") {
            config.generation.base_url = url;
        }
        match get("GENERATION_API_KEY") {
            Some(key) => config.generation.api_key = key,
            None => warn!("GENERATION_API_KEY not set; runs will fail until it is configured"),
        }
        if let Some(model) = get("GENERATION_MODEL") {
            config.generation.model = model;
        }

        config
    }
}
