// src/task/progress.rs

use anyhow::Context;
use tracing::debug;

use crate::task::result::guarded;
use crate::task::{Notifier, ResultCounters, Task, TaskResult};

/// Per-item iteration over a finite sequence.
pub trait ProgressTask: Send {
    type Item;
    type Items: IntoIterator<Item = Self::Item>;

    fn items_count(&mut self) -> anyhow::Result<u64>;

    fn items(&mut self) -> anyhow::Result<Self::Items>;

    fn process_item(&mut self, item: Self::Item) -> anyhow::Result<TaskResult>;
}

/// Runs a [`ProgressTask`], notifying after every item.
///
/// Item failures are counted and the loop goes on; only failing to count
/// or fetch the items (including a panicking iterator) turns the whole task
/// into an error.
pub struct Progress<T>(pub T);

impl<T: ProgressTask> Task for Progress<T> {
    fn process(&mut self, notifier: &mut Notifier) -> TaskResult {
        let mut counters = ResultCounters::default();

        let prepared = guarded(|| {
            let count = self.0.items_count().context("counting items")?;
            let items = self.0.items().context("fetching items")?;
            Ok((count, items.into_iter()))
        });
        let (count, mut items) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return abort(notifier, &mut counters, 0, 0, err),
        };

        let mut current = 0;
        loop {
            let item = match guarded(|| Ok(items.next())).context("fetching items") {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(err) => return abort(notifier, &mut counters, count, current, err),
            };
            let result = guarded(|| self.0.process_item(item)).unwrap_or_else(TaskResult::failed);
            debug!(result = %result, "item processed");
            counters.record(&result);

            current += 1;
            notifier.notify(count, current, counters.fields());
        }

        TaskResult::success()
    }
}

/// Final notify carrying the error, then the task-level failure.
fn abort(
    notifier: &mut Notifier,
    counters: &mut ResultCounters,
    count: u64,
    current: u64,
    err: anyhow::Error,
) -> TaskResult {
    counters.error += 1;
    let mut fields = counters.fields();
    fields.insert("message".into(), format!("{err:#}"));
    notifier.notify(count, current, fields);
    TaskResult::failed(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_line;
    use crate::task::notifier::capture::Captured;

    struct Numbers {
        fail_fetch: bool,
    }

    impl ProgressTask for Numbers {
        type Item = u32;
        type Items = Vec<u32>;

        fn items_count(&mut self) -> anyhow::Result<u64> {
            Ok(4)
        }

        fn items(&mut self) -> anyhow::Result<Vec<u32>> {
            if self.fail_fetch {
                anyhow::bail!("source unavailable");
            }
            Ok(vec![1, 2, 3, 4])
        }

        fn process_item(&mut self, item: u32) -> anyhow::Result<TaskResult> {
            match item {
                2 => Ok(TaskResult::skip("even")),
                3 => anyhow::bail!("cannot import {item}"),
                4 => panic!("corrupt row"),
                _ => Ok(TaskResult::success()),
            }
        }
    }

    #[test]
    fn notifies_after_every_item_with_tallies() {
        let out = Captured::default();
        let mut notifier = Notifier::new(out.clone());
        let result = Progress(Numbers { fail_fetch: false }).process(&mut notifier);

        assert_eq!(result.code(), 0);
        let lines = out.lines();
        assert_eq!(lines.len(), 4);
        let last = parse_line(&lines[3]).unwrap();
        assert_eq!(last["count"], "4");
        assert_eq!(last["current"], "4");
        assert_eq!(last["success"], "1");
        assert_eq!(last["skip"], "1");
        assert_eq!(last["error"], "2");
    }

    #[test]
    fn fetch_failure_is_an_error_before_any_item() {
        let out = Captured::default();
        let mut notifier = Notifier::new(out.clone());
        let result = Progress(Numbers { fail_fetch: true }).process(&mut notifier);

        assert_eq!(result.code(), 100);
        assert!(result.message().contains("fetching items"));
        let lines = out.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(parse_line(&lines[0]).unwrap()["error"], "1");
    }

    struct Flaky;

    impl ProgressTask for Flaky {
        type Item = u32;
        type Items = Box<dyn Iterator<Item = u32>>;

        fn items_count(&mut self) -> anyhow::Result<u64> {
            Ok(3)
        }

        fn items(&mut self) -> anyhow::Result<Self::Items> {
            let mut next = 0;
            Ok(Box::new(std::iter::from_fn(move || {
                next += 1;
                if next == 3 {
                    panic!("cursor lost");
                }
                Some(next)
            })))
        }

        fn process_item(&mut self, _item: u32) -> anyhow::Result<TaskResult> {
            Ok(TaskResult::success())
        }
    }

    #[test]
    fn panicking_iterator_ends_with_a_final_tally() {
        let out = Captured::default();
        let mut notifier = Notifier::new(out.clone());
        let result = Progress(Flaky).process(&mut notifier);

        assert_eq!(result.code(), 100);
        assert!(result.message().contains("cursor lost"));
        let lines = out.lines();
        assert_eq!(lines.len(), 3);
        let last = parse_line(&lines[2]).unwrap();
        assert_eq!(last["current"], "2");
        assert_eq!(last["success"], "2");
        assert_eq!(last["error"], "1");
        assert!(last["message"].contains("cursor lost"));
    }
}
