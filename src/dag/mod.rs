// src/dag/mod.rs

//! Dependency graph and scheduling.
//!
//! - [`task_spec`] is the static task description registered by callers.
//! - [`validate`] rejects unknown dependencies, duplicates and cycles.
//! - [`filter`] restricts a plan to a subnet of task names.
//! - [`graph`] keeps adjacency information for diagnostics and export.
//! - [`stacked_task`] is the per-task scheduler node.
//! - [`task_stack`] owns the partitions and decides what may run next.

pub mod filter;
pub mod graph;
pub mod stacked_task;
pub mod task_spec;
pub mod task_stack;
pub mod validate;

pub use filter::SubnetFilter;
pub use graph::DagGraph;
pub use stacked_task::{Interval, StackedTask, TaskStatus};
pub use task_spec::TaskSpec;
pub use task_stack::{ScheduledTask, TaskStack, TaskState};
