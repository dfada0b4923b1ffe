//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: record store and component wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and parsing helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::CronConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<services::AppServices>, cron: CronConfig) -> Router {
    // Tick endpoints: enable switch + shared secret.
    let cron_routes = routes::cron::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(cron, middleware::cron_gate));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/cron", cron_routes)
        .merge(routes::router().layer(Extension(services)))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
