use std::sync::Arc;

use anyhow::Context;

use cadence_api::app::{build_app, services::AppServices};
use cadence_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cadence_observability::init();

    let config = AppConfig::from_env();
    let services = Arc::new(AppServices::from_config(&config).context("failed to wire services")?);
    let app = build_app(services, config.cron.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        cron_enabled = config.cron.enabled,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
