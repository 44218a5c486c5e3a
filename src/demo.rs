// src/demo.rs

//! Demo tasks registered by the `taskstack` binary.
//!
//! They simulate a small import: users and categories first, then articles
//! in batches, then article/category links split over a task group, and a
//! final exclusive report.

use std::thread;
use std::time::Duration;

use anyhow::bail;

use crate::errors::Result;
use crate::task::{
    BatchItem, BatchTask, Batched, Instances, Parallel, Progress, ProgressTask, Simple,
    SimpleTask, Task, TaskInstance, TaskResult,
};

const WORK: Duration = Duration::from_millis(40);

/// Registry with every demo task.
pub fn registry() -> Result<Parallel> {
    let none: [&str; 0] = [];
    let mut registry = Parallel::new();

    registry
        .add_task("import:users", |_: &TaskInstance| boxed(Progress(Users::default())), none, None)?
        .add_task("import:categories", |_: &TaskInstance| boxed(Simple(Categories)), none, None)?
        .add_task(
            "import:articles",
            |_: &TaskInstance| boxed(Batched(Articles::new(120, 25))),
            ["import:users", "import:categories"],
            None,
        )?
        .add_multiple(
            "import:article-categories",
            Instances::Count(3),
            |instance: &TaskInstance| boxed(Progress(ArticleCategories::new(instance, 90))),
            ["import:articles"],
            None,
        )?
        .add_task(
            "report:summary",
            |_: &TaskInstance| boxed(Simple(Summary)),
            ["import:article-categories"],
            Some(1),
        )?;

    Ok(registry)
}

fn boxed(task: impl Task + 'static) -> Box<dyn Task> {
    Box::new(task)
}

#[derive(Default)]
struct Users;

impl ProgressTask for Users {
    type Item = u32;
    type Items = std::ops::Range<u32>;

    fn items_count(&mut self) -> anyhow::Result<u64> {
        Ok(40)
    }

    fn items(&mut self) -> anyhow::Result<Self::Items> {
        Ok(0..40)
    }

    fn process_item(&mut self, id: u32) -> anyhow::Result<TaskResult> {
        thread::sleep(WORK);
        if id % 9 == 0 {
            return Ok(TaskResult::skip("already imported").with_key(format!("user-{id}")));
        }
        Ok(TaskResult::success().with_key(format!("user-{id}")))
    }
}

struct Categories;

impl SimpleTask for Categories {
    fn run(&mut self) -> anyhow::Result<TaskResult> {
        thread::sleep(WORK * 10);
        Ok(TaskResult::success().with_message("12 categories"))
    }
}

struct Articles {
    total: u64,
    chunk: u64,
}

impl Articles {
    fn new(total: u64, chunk: u64) -> Self {
        Self { total, chunk }
    }
}

impl BatchTask for Articles {
    type Item = u64;
    type Payload = u64;
    type Items = Vec<u64>;

    fn startup(&mut self) -> anyhow::Result<()> {
        thread::sleep(WORK);
        Ok(())
    }

    fn items_count(&mut self) -> anyhow::Result<u64> {
        Ok(self.total)
    }

    fn items(&mut self, processed: u64) -> anyhow::Result<Vec<u64>> {
        Ok((processed..self.total.min(processed + self.chunk)).collect())
    }

    fn process_item(&mut self, id: u64) -> anyhow::Result<BatchItem<u64>> {
        if id % 17 == 0 {
            return Ok(BatchItem::Done(TaskResult::skip("draft").with_key(id.to_string())));
        }
        if id % 31 == 0 {
            bail!("article {id} has no author");
        }
        Ok(BatchItem::Pending(id))
    }

    fn batch(&mut self, ids: Vec<u64>) -> anyhow::Result<()> {
        thread::sleep(WORK * ids.len() as u32 / 4);
        Ok(())
    }
}

/// One slice of the link table; the slice comes from the instance position.
struct ArticleCategories {
    from: u64,
    to: u64,
}

impl ArticleCategories {
    fn new(instance: &TaskInstance, total: u64) -> Self {
        let parts = instance.total.max(1) as u64;
        let size = total.div_ceil(parts);
        let from = instance.index as u64 * size;
        Self {
            from,
            to: total.min(from + size),
        }
    }
}

impl ProgressTask for ArticleCategories {
    type Item = u64;
    type Items = std::ops::Range<u64>;

    fn items_count(&mut self) -> anyhow::Result<u64> {
        Ok(self.to.saturating_sub(self.from))
    }

    fn items(&mut self) -> anyhow::Result<Self::Items> {
        Ok(self.from..self.to)
    }

    fn process_item(&mut self, _link: u64) -> anyhow::Result<TaskResult> {
        thread::sleep(WORK);
        Ok(TaskResult::success())
    }
}

struct Summary;

impl SimpleTask for Summary {
    fn run(&mut self) -> anyhow::Result<TaskResult> {
        thread::sleep(WORK * 5);
        Ok(TaskResult::success().with_message("report written"))
    }
}
