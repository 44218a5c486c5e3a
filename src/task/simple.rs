// src/task/simple.rs

use tracing::debug;

use crate::task::result::guarded;
use crate::task::{Notifier, ResultCounters, Task, TaskResult};

/// One unit of work with no granular progress.
pub trait SimpleTask: Send {
    fn run(&mut self) -> anyhow::Result<TaskResult>;
}

/// Runs a [`SimpleTask`] between `notify_start` and `notify_end`.
pub struct Simple<T>(pub T);

impl<T: SimpleTask> Task for Simple<T> {
    fn process(&mut self, notifier: &mut Notifier) -> TaskResult {
        notifier.notify_start();

        let result = guarded(|| self.0.run()).unwrap_or_else(TaskResult::failed);
        debug!(result = %result, "simple task finished");

        let mut counters = ResultCounters::default();
        counters.record(&result);
        notifier.notify_end(counters.fields());
        result
    }
}
