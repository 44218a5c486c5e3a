// src/task/batch.rs

use anyhow::Context;
use tracing::{debug, warn};

use crate::task::result::guarded;
use crate::task::{Notifier, ResultCounters, Task, TaskResult};

/// What `process_item` decided for one item.
#[derive(Debug)]
pub enum BatchItem<P> {
    /// Payload deferred to the next `batch` call.
    Pending(P),
    /// Final per-item result; the item is not batched.
    Done(TaskResult),
}

/// Chunked processing with lifecycle hooks.
///
/// `items(processed)` returns the next chunk given how many items were
/// processed so far, and an empty chunk once everything is fetched.
pub trait BatchTask: Send {
    type Item;
    type Payload;
    type Items: IntoIterator<Item = Self::Item>;

    fn startup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn items_count(&mut self) -> anyhow::Result<u64>;

    fn items(&mut self, processed: u64) -> anyhow::Result<Self::Items>;

    fn process_item(&mut self, item: Self::Item) -> anyhow::Result<BatchItem<Self::Payload>>;

    fn batch(&mut self, payloads: Vec<Self::Payload>) -> anyhow::Result<()>;
}

/// Runs a [`BatchTask`].
///
/// A failing `batch` call counts its whole chunk as errors. Failing hooks,
/// counting or fetching abort the rest of the task as an error, after one
/// final notify.
pub struct Batched<T>(pub T);

#[derive(Debug, Default)]
struct BatchState {
    count: u64,
    processed: u64,
    counters: ResultCounters,
}

impl<T: BatchTask> Batched<T> {
    fn run(&mut self, notifier: &mut Notifier, state: &mut BatchState) -> anyhow::Result<()> {
        guarded(|| self.0.startup()).context("startup failed")?;
        state.count = guarded(|| self.0.items_count()).context("counting items")?;

        loop {
            let processed = state.processed;
            let chunk: Vec<T::Item> =
                guarded(|| Ok(self.0.items(processed)?.into_iter().collect()))
                    .context("fetching items")?;
            if chunk.is_empty() {
                break;
            }
            if state.processed >= state.count {
                warn!(
                    processed = state.processed,
                    count = state.count,
                    "items() keeps returning items beyond items_count(); stopping"
                );
                break;
            }

            let mut pending = Vec::new();
            for item in chunk {
                match guarded(|| self.0.process_item(item)) {
                    Ok(BatchItem::Pending(payload)) => pending.push(payload),
                    Ok(BatchItem::Done(result)) => {
                        debug!(result = %result, "item processed");
                        state.counters.record(&result);
                        state.processed += 1;
                    }
                    Err(err) => {
                        debug!(error = %format!("{err:#}"), "item failed");
                        state.counters.error += 1;
                        state.processed += 1;
                    }
                }
                notify(notifier, state);
            }

            let batched = pending.len() as u64;
            if batched > 0 {
                match guarded(|| self.0.batch(pending)) {
                    Ok(()) => state.counters.success += batched,
                    Err(err) => {
                        debug!(error = %format!("{err:#}"), items = batched, "batch failed");
                        state.counters.error += batched;
                    }
                }
                state.processed += batched;
                notify(notifier, state);
            }
        }

        guarded(|| self.0.shutdown()).context("shutdown failed")?;
        Ok(())
    }
}

impl<T: BatchTask> Task for Batched<T> {
    fn process(&mut self, notifier: &mut Notifier) -> TaskResult {
        let mut state = BatchState::default();
        match self.run(notifier, &mut state) {
            Ok(()) => TaskResult::success(),
            Err(err) => {
                let mut fields = state.counters.fields();
                fields.insert("message".into(), format!("{err:#}"));
                notifier.notify(state.count, state.processed, fields);
                TaskResult::failed(err)
            }
        }
    }
}

fn notify(notifier: &mut Notifier, state: &BatchState) {
    notifier.notify(state.count, state.processed, state.counters.fields());
}
