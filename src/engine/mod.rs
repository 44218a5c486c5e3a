// src/engine/mod.rs

//! Parent-side orchestration engine.
//!
//! - [`orchestrator`] owns the scheduling loop: it reaps exited processes,
//!   dispatches runnable tasks and applies their output.
//! - [`task_data`] and [`output_handler`] turn raw output chunks into
//!   per-task progress records.
//! - [`report`] holds the reporting collaborators the loop notifies.

use std::time::Duration;

use crate::task::{EXIT_ERROR, EXIT_SKIP, EXIT_SUCCESS};

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Which pipe of a task process a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Raw text read from a task process, newline terminated unless the stream
/// closed mid-line.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    pub task: TaskName,
    pub stream: StreamKind,
    pub chunk: String,
}

/// How a task process ended, derived from its exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Skipped,
    Failed(i32),
    /// Killed by a signal or never started.
    Aborted,
}

impl TaskOutcome {
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(EXIT_SUCCESS) => TaskOutcome::Success,
            Some(EXIT_SKIP) => TaskOutcome::Skipped,
            Some(code) => TaskOutcome::Failed(code),
            None => TaskOutcome::Aborted,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed(_) | TaskOutcome::Aborted)
    }

    /// Exit code the outcome corresponds to.
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskOutcome::Success => EXIT_SUCCESS,
            TaskOutcome::Skipped => EXIT_SKIP,
            TaskOutcome::Failed(code) => *code,
            TaskOutcome::Aborted => EXIT_ERROR,
        }
    }
}

/// Knobs of the orchestrator loop.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Maximum number of task processes alive at once.
    pub concurrent: usize,
    /// Sleep between scheduling iterations.
    pub poll_interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrent: 3,
            poll_interval: Duration::from_secs(1),
        }
    }
}

pub mod orchestrator;
pub mod output_handler;
pub mod report;
pub mod task_data;

pub use orchestrator::{Orchestrator, RunSummary};
pub use output_handler::{apply_chunk, ChunkOutcome};
pub use report::{format_bytes, format_time, NullOutput, Output, PlainOutput, TaskStats, TasksSnapshot};
pub use task_data::TaskData;
