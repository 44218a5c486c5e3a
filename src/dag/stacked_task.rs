// src/dag/stacked_task.rs

//! Scheduler-side node: one task plus its dependency and concurrency state.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::engine::TaskName;

/// Lifecycle status of a [`StackedTask`].
///
/// Runnable tasks still report `Stacked`; "runnable" is a partition of the
/// [`TaskStack`](crate::dag::TaskStack), not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Stacked,
    Running,
    Done,
}

/// Wall-clock interval during which two tasks were running together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub from: DateTime<Local>,
    pub to: Option<DateTime<Local>>,
}

#[derive(Debug, Clone)]
pub struct StackedTask {
    name: TaskName,
    /// Dependencies as declared (after subnet pruning). Never mutated.
    run_after: Vec<TaskName>,
    /// Dependencies that have not reached `Done` yet.
    current_run_after: BTreeSet<TaskName>,
    max_concurrent: Option<usize>,
    status: TaskStatus,
    start_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    running_with: BTreeMap<TaskName, Interval>,
}

impl StackedTask {
    pub fn new(name: impl Into<TaskName>, run_after: Vec<TaskName>, max_concurrent: Option<usize>) -> Self {
        let current_run_after = run_after.iter().cloned().collect();
        Self {
            name: name.into(),
            run_after,
            current_run_after,
            max_concurrent,
            status: TaskStatus::Stacked,
            start_at: None,
            finished_at: None,
            running_with: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_after(&self) -> &[TaskName] {
        &self.run_after
    }

    pub fn current_run_after(&self) -> impl Iterator<Item = &str> {
        self.current_run_after.iter().map(|s| s.as_str())
    }

    pub fn max_concurrent(&self) -> Option<usize> {
        self.max_concurrent
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn start_at(&self) -> Option<DateTime<Local>> {
        self.start_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    pub fn running_with(&self) -> &BTreeMap<TaskName, Interval> {
        &self.running_with
    }

    /// A dependency reached `Done`; drop it from the pending set.
    pub fn task_done(&mut self, name: &str) {
        self.current_run_after.remove(name);
    }

    pub fn is_runnable(&self) -> bool {
        self.current_run_after.is_empty()
    }

    pub(crate) fn mark_running(&mut self, now: DateTime<Local>) {
        self.status = TaskStatus::Running;
        self.start_at = Some(now);
    }

    pub(crate) fn mark_done(&mut self, now: DateTime<Local>) {
        self.status = TaskStatus::Done;
        self.finished_at = Some(now);
    }

    /// Start recording an overlap with `other`. An already open or closed
    /// interval is kept: a task runs at most once per plan.
    pub fn running_with_start(&mut self, other: &str, now: DateTime<Local>) {
        self.running_with
            .entry(other.to_string())
            .or_insert(Interval { from: now, to: None });
    }

    /// Close the overlap interval with `other`, if one is open.
    pub fn running_with_stop(&mut self, other: &str, now: DateTime<Local>) {
        if let Some(interval) = self.running_with.get_mut(other) {
            if interval.to.is_none() {
                interval.to = Some(now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runnable_once_all_dependencies_are_done() {
        let mut task = StackedTask::new("c", vec!["a".into(), "b".into()], None);
        assert!(!task.is_runnable());

        task.task_done("a");
        assert!(!task.is_runnable());
        task.task_done("unrelated");
        assert!(!task.is_runnable());

        task.task_done("b");
        assert!(task.is_runnable());
        assert_eq!(task.run_after(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn running_with_interval_is_opened_once_and_closed_once() {
        let mut task = StackedTask::new("a", vec![], None);
        let t0 = Local::now();
        let t1 = t0 + chrono::Duration::seconds(5);
        let t2 = t0 + chrono::Duration::seconds(9);

        task.running_with_start("b", t0);
        task.running_with_start("b", t1);
        assert_eq!(task.running_with()["b"].from, t0);

        task.running_with_stop("b", t1);
        task.running_with_stop("b", t2);
        assert_eq!(task.running_with()["b"].to, Some(t1));

        task.running_with_stop("missing", t2);
        assert!(!task.running_with().contains_key("missing"));
    }
}
