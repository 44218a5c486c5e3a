// src/task/mod.rs

//! Child-side task model.
//!
//! A task is anything implementing [`Task`]. The strategies [`Simple`],
//! [`Progress`] and [`Batched`] wrap user code and take care of progress
//! lines and result tallies; [`Parallel`] is the registry the parent builds
//! its plan from and the child looks its task up in.

pub mod batch;
pub mod counters;
pub mod notifier;
pub mod progress;
pub mod registry;
pub mod result;
pub mod runner;
pub mod simple;

pub use batch::{BatchItem, BatchTask, Batched};
pub use counters::ResultCounters;
pub use notifier::Notifier;
pub use progress::{Progress, ProgressTask};
pub use registry::{Instances, Parallel, TaskFactory, TaskInstance};
pub use result::{TaskResult, EXIT_ERROR, EXIT_SKIP, EXIT_SUCCESS};
pub use runner::{run_child, run_child_with};
pub use simple::{Simple, SimpleTask};

/// A unit of work run in its own process.
///
/// Implementations report progress through the notifier and return exactly
/// one result, which becomes the process exit code.
pub trait Task: Send {
    fn process(&mut self, notifier: &mut Notifier) -> TaskResult;
}
