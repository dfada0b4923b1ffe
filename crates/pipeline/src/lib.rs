//! Ordered remote steps run for one subject, with a one-shot self-heal.
//!
//! ## Design
//!
//! - A [`Pipeline`] is an ordered list of named [`StepSpec`]s
//! - [`PipelineExecutor::run`] calls each step through a [`StepRunner`],
//!   stopping at the first failure
//! - A step with a remediation that fails with
//!   [`StepErrorCode::MissingPrerequisite`] runs its remediation once and is
//!   retried once
//! - The ordered step log is returned whether the pipeline passed or not,
//!   and is stored as a job record after every step ([`JobStore`])

pub mod error;
pub mod executor;
pub mod http;
pub mod job;
pub mod runner;
pub mod step;

pub use error::PipelineError;
pub use executor::{
    DEFAULT_STEP_TIMEOUT, JobState, PipelineConfig, PipelineExecutor, PipelineReport, StepLog,
    StepOutcome,
};
pub use http::HttpStepRunner;
pub use job::JobStore;
pub use runner::{StepCallError, StepErrorCode, StepResponse, StepRunner};
pub use step::{Pipeline, StepKind, StepSpec};
