// src/task/runner.rs

//! Child-mode entry: run one registered task and map its result to an exit
//! code.

use anyhow::anyhow;
use tracing::{error, info};

use crate::task::result::guarded;
use crate::task::{Notifier, Parallel, TaskResult};

/// Run `name` with progress lines on stdout. Returns the exit code.
pub fn run_child(registry: &Parallel, name: &str) -> i32 {
    run_child_with(registry, name, Notifier::stdout())
}

/// Same as [`run_child`] with an explicit progress sink.
pub fn run_child_with(registry: &Parallel, name: &str, mut notifier: Notifier) -> i32 {
    let result = match registry.build_task(name) {
        Ok(mut task) => {
            notifier.restart();
            guarded(|| Ok(task.process(&mut notifier))).unwrap_or_else(TaskResult::failed)
        }
        Err(err) => TaskResult::failed(anyhow!(err)),
    };

    match &result {
        TaskResult::Error { message, cause, .. } => {
            let cause = cause.as_ref().map(|c| format!("{c:?}"));
            error!(task = %name, result = result.short_name(), cause = ?cause, "{message}");
        }
        _ => info!(task = %name, result = result.short_name(), "{}", result.message()),
    }

    result.code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_line;
    use crate::task::notifier::capture::Captured;
    use crate::task::{Simple, SimpleTask, Task, TaskInstance, EXIT_ERROR, EXIT_SKIP};

    struct Says(&'static str);

    impl SimpleTask for Says {
        fn run(&mut self) -> anyhow::Result<TaskResult> {
            match self.0 {
                "skip" => Ok(TaskResult::skip("nothing new")),
                "panic" => panic!("unexpected state"),
                _ => Ok(TaskResult::success()),
            }
        }
    }

    struct Explodes;

    impl Task for Explodes {
        fn process(&mut self, _notifier: &mut Notifier) -> TaskResult {
            panic!("outside any strategy")
        }
    }

    fn registry() -> Parallel {
        let none: [&str; 0] = [];
        let mut registry = Parallel::new();
        registry
            .add_task("ok", |_: &TaskInstance| Box::new(Simple(Says("ok"))) as Box<dyn Task>, none, None)
            .unwrap()
            .add_task("skip", |_: &TaskInstance| Box::new(Simple(Says("skip"))) as Box<dyn Task>, none, None)
            .unwrap()
            .add_task("panic", |_: &TaskInstance| Box::new(Simple(Says("panic"))) as Box<dyn Task>, none, None)
            .unwrap()
            .add_task("explodes", |_: &TaskInstance| Box::new(Explodes) as Box<dyn Task>, none, None)
            .unwrap();
        registry
    }

    #[test]
    fn exit_codes_follow_results() {
        let registry = registry();
        let out = Captured::default();
        assert_eq!(run_child_with(&registry, "ok", Notifier::new(out.clone())), 0);
        assert_eq!(out.lines().len(), 2);
        assert_eq!(run_child_with(&registry, "skip", Notifier::new(Captured::default())), EXIT_SKIP);
    }

    #[test]
    fn panics_and_unknown_tasks_exit_with_error() {
        let registry = registry();

        let out = Captured::default();
        assert_eq!(run_child_with(&registry, "panic", Notifier::new(out.clone())), EXIT_ERROR);
        let end = parse_line(&out.lines()[1]).unwrap();
        assert_eq!(end["error"], "1");

        assert_eq!(run_child_with(&registry, "explodes", Notifier::new(Captured::default())), EXIT_ERROR);
        assert_eq!(run_child_with(&registry, "missing", Notifier::new(Captured::default())), EXIT_ERROR);
    }
}
