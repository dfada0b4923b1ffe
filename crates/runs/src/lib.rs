//! Queued agent runs with whole-run retry.
//!
//! ## Design
//!
//! - Runs are pushed onto a FIFO queue held in the record store
//! - An external trigger calls [`RunProcessor::tick`], which drains a small
//!   bounded batch and returns; there is no background worker
//! - A failed run is retried from scratch until `max_attempts`, then it is
//!   terminally `failed`
//! - Runs that share a project accumulate notes/state in [`ProjectMemory`]
//!
//! ## Components
//!
//! - `Run`: record with status, [`RetryState`] and output
//! - `RunQueue` / `RunStore`: queue of ids and the records themselves
//! - `ProjectMemoryStore`: per-project notes and state
//! - `Generator`: the text-generation collaborator
//! - `RunProcessor`: the tick handler

pub mod error;
pub mod generation;
pub mod keys;
pub mod memory;
pub mod processor;
pub mod queue;
pub mod store;
pub mod types;

pub use error::RunError;
pub use generation::{
    Generation, GenerationError, Generator, HttpGenerator, HttpGeneratorConfig, StructuredResult,
};
pub use memory::{MemoryPatch, ProjectMemory, ProjectMemoryStore};
pub use processor::{RunProcessor, RunProcessorConfig, TickReport};
pub use queue::RunQueue;
pub use store::RunStore;
pub use types::{RetryDecision, RetryState, Run, RunKind, RunOutput, RunStatus};
