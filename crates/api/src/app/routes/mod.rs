use axum::Router;

pub mod cron;
pub mod marketing;
pub mod pipeline;
pub mod runs;
pub mod system;

/// Router for the operator-facing endpoints (runs, marketing, pipeline).
pub fn router() -> Router {
    Router::new()
        .nest("/runs", runs::router())
        .nest("/marketing", marketing::router())
        .nest("/pipeline", pipeline::router())
}
