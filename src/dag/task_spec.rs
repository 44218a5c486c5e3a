// src/dag/task_spec.rs

//! Static task description handed to the scheduler at build time.

use crate::engine::TaskName;

/// A task as registered: its name, `run_after` dependencies and optional
/// concurrency cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: TaskName,
    pub run_after: Vec<TaskName>,
    /// At most this many tasks may be running while this one runs.
    pub max_concurrent: Option<usize>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            run_after: Vec::new(),
            max_concurrent: None,
        }
    }

    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.run_after.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn max_concurrent(mut self, cap: usize) -> Self {
        self.max_concurrent = Some(cap);
        self
    }
}
