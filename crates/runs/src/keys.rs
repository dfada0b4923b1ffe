//! Record store keys owned by the runs subsystem.

use cadence_core::{ProjectId, RunId};

/// FIFO list of queued run ids.
pub const QUEUE: &str = "runs:queue";

/// Most-recent-first index of run ids.
pub const RUN_INDEX: &str = "runs:index";

pub fn run(id: RunId) -> String {
    format!("run:{id}")
}

pub fn run_logs(id: RunId) -> String {
    format!("run:{id}:logs")
}

pub fn project_memory(project: &ProjectId) -> String {
    format!("memory:project:{project}")
}
