//! HTTP trigger surface for the job and schedule engine.
//!
//! An external scheduler calls the `/cron/*` tick endpoints; operators drive
//! runs, campaign content and pipelines through the rest.

pub mod app;
pub mod config;
pub mod middleware;
