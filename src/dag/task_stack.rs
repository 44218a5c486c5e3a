// src/dag/task_stack.rs

use chrono::Local;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::dag::filter::SubnetFilter;
use crate::dag::graph::DagGraph;
use crate::dag::stacked_task::StackedTask;
use crate::dag::validate::validate_specs;
use crate::dag::TaskSpec;
use crate::engine::TaskName;
use crate::errors::{Result, TaskstackError};

/// Which partition of the stack a task currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for at least one dependency.
    Stacked,
    /// Dependencies satisfied, not dispatched yet.
    Runnable,
    Running,
    Done,
}

/// A task the stack wants the orchestrator to start now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub max_concurrent: Option<usize>,
}

/// Dependency-graph scheduler.
///
/// Every task lives in exactly one partition and only ever moves forward:
/// `stacked -> runnable -> running -> done`. The plan is finished once all
/// tasks are done.
#[derive(Debug)]
pub struct TaskStack {
    graph: DagGraph,
    prepared: bool,
    tasks_count: usize,
    stacked: IndexMap<TaskName, StackedTask>,
    /// FIFO in the order tasks became runnable.
    runnable: IndexMap<TaskName, StackedTask>,
    running: IndexMap<TaskName, StackedTask>,
    done: IndexMap<TaskName, StackedTask>,
}

impl TaskStack {
    /// Validate the registered tasks, apply the subnet filter and put every
    /// surviving task into the stacked partition.
    ///
    /// Validation runs against the full registered set, so a `run_after`
    /// naming an unknown task fails even when the filter would drop it.
    pub fn build<S: AsRef<str>>(specs: &[TaskSpec], subnets: &[S]) -> Result<Self> {
        validate_specs(specs)?;

        let filter = SubnetFilter::new(subnets)?;
        let specs = filter.apply(specs);

        let graph = DagGraph::from_specs(&specs);
        let stacked: IndexMap<TaskName, StackedTask> = specs
            .into_iter()
            .map(|s| {
                let task = StackedTask::new(s.name.clone(), s.run_after, s.max_concurrent);
                (s.name, task)
            })
            .collect();

        info!(
            tasks = stacked.len(),
            filtered = !filter.is_empty(),
            "task stack built"
        );

        Ok(Self {
            graph,
            prepared: false,
            tasks_count: stacked.len(),
            stacked,
            runnable: IndexMap::new(),
            running: IndexMap::new(),
            done: IndexMap::new(),
        })
    }

    /// Promote every task without pending dependencies to runnable.
    ///
    /// Must be called once before the first [`get_runnable_tasks`](Self::get_runnable_tasks).
    pub fn prepare(&mut self) {
        self.move_from_stack_to_runnable();
        self.prepared = true;
    }

    /// Select up to `max_to_return` runnable tasks and mark them running.
    ///
    /// Admission control, per candidate in FIFO order:
    /// 1. if any running task has a cap `<= running + selected`, stop
    ///    selecting for this call;
    /// 2. if the candidate's own cap is `> running + selected`, skip it;
    /// 3. otherwise admit it.
    ///
    /// When nothing is running and rule 2 skipped every candidate, the first
    /// runnable task is admitted anyway; otherwise the plan could never
    /// finish.
    pub fn get_runnable_tasks(
        &mut self,
        max_to_return: usize,
        currently_running: usize,
    ) -> Vec<ScheduledTask> {
        if !self.prepared {
            warn!("get_runnable_tasks called before prepare; preparing now");
            self.prepare();
        }

        let mut selected: Vec<TaskName> = Vec::new();

        for (name, candidate) in self.runnable.iter() {
            if selected.len() >= max_to_return {
                break;
            }

            let occupied = currently_running + selected.len();

            if let Some(blocker) = self
                .running
                .values()
                .find(|t| t.max_concurrent().is_some_and(|cap| cap <= occupied))
            {
                debug!(
                    blocker = %blocker.name(),
                    occupied,
                    "running task holds its concurrency cap; no further dispatch"
                );
                break;
            }

            if candidate
                .max_concurrent()
                .is_some_and(|cap| cap > occupied)
            {
                debug!(task = %name, occupied, "concurrency cap not reachable yet; skipping");
                continue;
            }

            selected.push(name.clone());
        }

        if selected.is_empty() && currently_running == 0 && max_to_return > 0 {
            if let Some(name) = self.runnable.keys().next() {
                debug!(task = %name, "nothing running; admitting capped task alone");
                selected.push(name.clone());
            }
        }

        let now = Local::now();
        let mut scheduled = Vec::with_capacity(selected.len());
        for name in selected {
            if let Some(mut task) = self.runnable.shift_remove(&name) {
                task.mark_running(now);
                scheduled.push(ScheduledTask {
                    name: name.clone(),
                    max_concurrent: task.max_concurrent(),
                });
                self.running.insert(name, task);
            }
        }

        scheduled
    }

    /// Mark a running task done and promote dependents that became runnable.
    pub fn mark_done(&mut self, name: &str) -> Result<()> {
        let mut task = self
            .running
            .shift_remove(name)
            .ok_or_else(|| TaskstackError::NotRunning(name.to_string()))?;

        for stacked in self.stacked.values_mut() {
            stacked.task_done(name);
        }

        task.mark_done(Local::now());
        self.done.insert(name.to_string(), task);
        debug!(task = %name, done = self.done.len(), total = self.tasks_count, "task done");

        self.move_from_stack_to_runnable();
        Ok(())
    }

    /// `true` once every task has reached done.
    pub fn is_empty(&self) -> bool {
        self.done.len() == self.tasks_count
    }

    pub fn tasks_count(&self) -> usize {
        self.tasks_count
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        if self.stacked.contains_key(name) {
            Some(TaskState::Stacked)
        } else if self.runnable.contains_key(name) {
            Some(TaskState::Runnable)
        } else if self.running.contains_key(name) {
            Some(TaskState::Running)
        } else if self.done.contains_key(name) {
            Some(TaskState::Done)
        } else {
            None
        }
    }

    pub fn get(&self, name: &str) -> Option<&StackedTask> {
        self.stacked
            .get(name)
            .or_else(|| self.runnable.get(name))
            .or_else(|| self.running.get(name))
            .or_else(|| self.done.get(name))
    }

    /// All tasks, in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &StackedTask> {
        self.graph.tasks().filter_map(|name| self.get(name))
    }

    /// Record that `a` and `b` started running together (both directions).
    pub fn running_with_start(&mut self, a: &str, b: &str) {
        let now = Local::now();
        if let Some(task) = self.running.get_mut(a) {
            task.running_with_start(b, now);
        }
        if let Some(task) = self.running.get_mut(b) {
            task.running_with_start(a, now);
        }
    }

    /// Close the overlap between `a` and `b` (both directions).
    pub fn running_with_stop(&mut self, a: &str, b: &str) {
        let now = Local::now();
        for name in [a, b] {
            let other = if name == a { b } else { a };
            if let Some(task) = self.running.get_mut(name).or_else(|| self.done.get_mut(name)) {
                task.running_with_stop(other, now);
            }
        }
    }

    fn move_from_stack_to_runnable(&mut self) {
        let ready: Vec<TaskName> = self
            .stacked
            .values()
            .filter(|t| t.is_runnable())
            .map(|t| t.name().to_string())
            .collect();

        for name in ready {
            if let Some(task) = self.stacked.shift_remove(&name) {
                debug!(task = %name, "dependencies satisfied; runnable");
                self.runnable.insert(name, task);
            }
        }
    }
}
