// src/engine/orchestrator.rs

use std::fmt;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::{ScheduledTask, TaskStack};
use crate::errors::Result;
use crate::exec::{ProcessHandle, ProcessSpawner};

use super::output_handler::apply_chunk;
use super::report::{Output, TaskStats, TasksSnapshot};
use super::task_data::TaskData;
use super::{OutputChunk, RunOptions, TaskName, TaskOutcome};

const OUTPUT_CHANNEL_CAPACITY: usize = 256;

struct RunningProcess {
    name: TaskName,
    handle: Box<dyn ProcessHandle>,
}

/// Result of a completed plan.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Final progress records; finished tasks in completion order.
    pub tasks: TasksSnapshot,
    pub outcomes: IndexMap<TaskName, TaskOutcome>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_failure()).count()
    }
}

/// Runs a [`TaskStack`] to completion, one process per task.
///
/// The orchestrator is the single owner of the stack and of every task's
/// [`TaskData`]. Stream readers only forward chunks over a channel; the
/// chunks are applied here, between scheduling steps and while sleeping.
pub struct Orchestrator<S: ProcessSpawner, O: Output> {
    stack: TaskStack,
    data: TasksSnapshot,
    outcomes: IndexMap<TaskName, TaskOutcome>,
    processes: Vec<RunningProcess>,
    spawner: S,
    output: O,
    options: RunOptions,
    output_tx: mpsc::Sender<OutputChunk>,
    output_rx: mpsc::Receiver<OutputChunk>,
    started: Instant,
}

impl<S: ProcessSpawner, O: Output> fmt::Debug for Orchestrator<S, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stack", &self.stack)
            .field("running", &self.processes.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S: ProcessSpawner, O: Output> Orchestrator<S, O> {
    pub fn new(stack: TaskStack, spawner: S, output: O, options: RunOptions) -> Self {
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let concurrent = options.concurrent.max(1);
        if concurrent != options.concurrent {
            warn!("concurrent must be at least 1; using 1");
        }

        Self {
            stack,
            data: IndexMap::new(),
            outcomes: IndexMap::new(),
            processes: Vec::new(),
            spawner,
            output,
            options: RunOptions {
                concurrent,
                ..options
            },
            output_tx,
            output_rx,
            started: Instant::now(),
        }
    }

    /// Run every task of the stack and return the final report.
    ///
    /// Task failures do not abort the run; dependents of a failed task are
    /// still started once it has exited.
    pub async fn run(mut self) -> Result<RunSummary> {
        self.started = Instant::now();
        self.output.start_message();

        self.stack.prepare();
        for task in self.stack.tasks() {
            let mut data = TaskData::new(task.name());
            data.sync(task);
            self.data.insert(task.name().to_string(), data);
        }

        info!(
            tasks = self.stack.tasks_count(),
            concurrent = self.options.concurrent,
            "orchestrator started"
        );

        while !self.stack.is_empty() {
            self.drain_output();
            self.reap_finished()?;

            if self.stack.is_empty() {
                break;
            }

            let live = self.processes.len();
            if live >= self.options.concurrent {
                self.sleep_tick().await;
                continue;
            }

            let batch = self
                .stack
                .get_runnable_tasks(self.options.concurrent - live, live);
            if !batch.is_empty() {
                debug!(
                    tasks = ?batch.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                    "dispatching runnable tasks"
                );
            }
            for task in &batch {
                self.dispatch(task)?;
            }

            self.sleep_tick().await;
        }

        // Every reader finished before its process was reaped, so whatever
        // output is left is already queued.
        self.drain_output();

        let duration = self.started.elapsed();
        self.output.print_to_output(&self.data, duration);
        self.output.finish_message(&self.data, duration);

        let summary = RunSummary {
            tasks: self.data,
            outcomes: self.outcomes,
            duration,
        };
        info!(
            tasks = summary.tasks.len(),
            failed = summary.failed(),
            elapsed_ms = duration.as_millis() as u64,
            "orchestrator finished"
        );
        Ok(summary)
    }

    fn dispatch(&mut self, task: &ScheduledTask) -> Result<()> {
        for other in &self.processes {
            self.stack.running_with_start(&task.name, &other.name);
        }
        self.sync_data(&task.name);

        match self.spawner.spawn(task, self.output_tx.clone()) {
            Ok(handle) => {
                info!(task = %task.name, "task started");
                self.processes.push(RunningProcess {
                    name: task.name.clone(),
                    handle,
                });
                self.notify();
                Ok(())
            }
            Err(err) => {
                error!(task = %task.name, error = %err, "failed to start task");
                self.output
                    .error_message(&format!("task '{}' could not be started: {err}", task.name));
                if let Some(data) = self.data.get_mut(&task.name) {
                    data.add_code_errors(1);
                }
                self.finish(task.name.clone(), None)
            }
        }
    }

    fn reap_finished(&mut self) -> Result<()> {
        let mut i = 0;
        while i < self.processes.len() {
            let exited = match self.processes[i].handle.try_exit() {
                Ok(Some(code)) => Some(code),
                Ok(None) => None,
                Err(err) => {
                    error!(task = %self.processes[i].name, error = %err, "lost track of task process");
                    Some(None)
                }
            };

            match exited {
                Some(code) => {
                    let process = self.processes.remove(i);
                    self.finish(process.name, code)?;
                }
                None => i += 1,
            }
        }
        Ok(())
    }

    fn finish(&mut self, name: TaskName, code: Option<i32>) -> Result<()> {
        self.stack.mark_done(&name)?;
        for other in &self.processes {
            self.stack.running_with_stop(&name, &other.name);
        }

        let outcome = TaskOutcome::from_exit_code(code);
        match outcome {
            TaskOutcome::Success | TaskOutcome::Skipped => {
                info!(task = %name, ?outcome, "task finished")
            }
            _ => warn!(task = %name, ?outcome, "task failed"),
        }
        self.outcomes.insert(name.clone(), outcome);

        self.sync_data(&name);
        if let Some(data) = self.data.shift_remove(&name) {
            self.data.insert(name.clone(), data);
        }

        self.log_stats(&name);
        self.notify();
        Ok(())
    }

    fn log_stats(&self, name: &str) {
        let (Some(task), Some(data)) = (self.stack.get(name), self.data.get(name)) else {
            return;
        };
        let stats = TaskStats::new(task, data, self.stack.tasks_count(), self.stack.is_empty());
        match serde_json::to_string(&stats) {
            Ok(json) => info!(target: "task_stats", "{json}"),
            Err(err) => warn!(task = %name, error = %err, "failed to serialize task stats"),
        }
    }

    fn sync_data(&mut self, name: &str) {
        if let (Some(task), Some(data)) = (self.stack.get(name), self.data.get_mut(name)) {
            data.sync(task);
        }
    }

    fn drain_output(&mut self) {
        while let Ok(chunk) = self.output_rx.try_recv() {
            self.handle_chunk(chunk);
        }
    }

    /// Sleep for one poll interval, applying output as it arrives.
    async fn sleep_tick(&mut self) {
        let sleep = tokio::time::sleep(self.options.poll_interval);
        tokio::pin!(sleep);

        loop {
            let chunk = tokio::select! {
                _ = &mut sleep => None,
                chunk = self.output_rx.recv() => chunk,
            };
            match chunk {
                Some(chunk) => self.handle_chunk(chunk),
                None => break,
            }
        }
    }

    fn handle_chunk(&mut self, chunk: OutputChunk) {
        let Some(data) = self.data.get_mut(&chunk.task) else {
            warn!(task = %chunk.task, "output for unknown task; ignored");
            return;
        };

        if apply_chunk(data, chunk.stream, &chunk.chunk).changed() {
            self.notify();
        }
    }

    fn notify(&mut self) {
        self.output
            .print_to_output(&self.data, self.started.elapsed());
    }
}
