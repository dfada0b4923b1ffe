//! `cadence-core` — shared primitives for the job and schedule engine.
//!
//! Identifiers, the domain error model and small text helpers. No storage or
//! runtime concerns live here.

pub mod error;
pub mod id;
pub mod text;

pub use error::{DomainError, DomainResult};
pub use id::{CampaignId, ContentId, PipelineJobId, PostLogId, ProjectId, RunId, ScheduleId};
pub use text::truncate_chars;
