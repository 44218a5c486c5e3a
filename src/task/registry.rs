// src/task/registry.rs

//! Task registry shared by the parent (to build the plan) and the child (to
//! find the task it was started for).

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::cli::is_reserved_task_name;
use crate::dag::TaskSpec;
use crate::engine::TaskName;
use crate::errors::{Result, TaskstackError};
use crate::task::Task;

/// Identity handed to a factory when it builds a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInstance {
    pub name: TaskName,
    /// Identifier of a templated instance; `None` for plain tasks.
    pub identifier: Option<String>,
    /// Zero-based position within the group.
    pub index: usize,
    /// Group size; 1 for plain tasks.
    pub total: usize,
}

pub type TaskFactory = Arc<dyn Fn(&TaskInstance) -> Box<dyn Task> + Send + Sync>;

/// How many instances a templated task gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instances {
    /// Identifiers `1..=n`.
    Count(usize),
    Identifiers(Vec<String>),
}

impl Instances {
    fn identifiers(&self) -> Vec<String> {
        match self {
            Instances::Count(n) => (1..=*n).map(|i| i.to_string()).collect(),
            Instances::Identifiers(ids) => ids.clone(),
        }
    }
}

struct Registered {
    spec: TaskSpec,
    instance: TaskInstance,
    factory: TaskFactory,
}

/// Ordered set of registered tasks and task groups.
#[derive(Default)]
pub struct Parallel {
    tasks: IndexMap<TaskName, Registered>,
    groups: IndexMap<String, Vec<TaskName>>,
}

impl fmt::Debug for Parallel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parallel")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .field("groups", &self.groups)
            .finish()
    }
}

impl Parallel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one task.
    ///
    /// Names in `run_after` that refer to an already registered group expand
    /// to every instance of that group.
    pub fn add_task<F, I, S>(
        &mut self,
        name: impl Into<TaskName>,
        factory: F,
        run_after: I,
        max_concurrent: Option<usize>,
    ) -> Result<&mut Self>
    where
        F: Fn(&TaskInstance) -> Box<dyn Task> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let run_after = self.expand_run_after(run_after);
        let instance = TaskInstance {
            name: name.clone(),
            identifier: None,
            index: 0,
            total: 1,
        };
        self.check_name(&name)?;
        self.insert(name, run_after, max_concurrent, instance, Arc::new(factory));
        Ok(self)
    }

    /// Register a task template instantiated once per identifier.
    ///
    /// Instances are named `<group>:<identifier>`, or `group` with every `%`
    /// replaced by the identifier when it contains one. `group` itself can
    /// then be used in later `run_after` lists.
    pub fn add_multiple<F, I, S>(
        &mut self,
        group: impl Into<String>,
        instances: Instances,
        factory: F,
        run_after: I,
        max_concurrent: Option<usize>,
    ) -> Result<&mut Self>
    where
        F: Fn(&TaskInstance) -> Box<dyn Task> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = group.into();
        self.check_name(&group)?;

        let identifiers = instances.identifiers();
        let total = identifiers.len();
        let names: Vec<TaskName> = identifiers
            .iter()
            .map(|identifier| instance_name(&group, identifier))
            .collect();

        // Validate every instance before registering any of them.
        let mut seen = HashSet::with_capacity(total);
        for name in &names {
            self.check_name(name)?;
            if name == &group || !seen.insert(name.as_str()) {
                return Err(TaskstackError::DuplicateTask(name.clone()));
            }
        }

        let run_after = self.expand_run_after(run_after);
        let factory: TaskFactory = Arc::new(factory);

        for (index, (name, identifier)) in names.iter().zip(identifiers).enumerate() {
            let instance = TaskInstance {
                name: name.clone(),
                identifier: Some(identifier),
                index,
                total,
            };
            self.insert(
                name.clone(),
                run_after.clone(),
                max_concurrent,
                instance,
                factory.clone(),
            );
        }

        debug!(group = %group, instances = total, "task group registered");
        self.groups.insert(group, names);
        Ok(self)
    }

    /// Scheduler view of every registered task, in registration order.
    pub fn specs(&self) -> Vec<TaskSpec> {
        self.tasks.values().map(|r| r.spec.clone()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn group(&self, group: &str) -> Option<&[TaskName]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn instance(&self, name: &str) -> Option<&TaskInstance> {
        self.tasks.get(name).map(|r| &r.instance)
    }

    /// Build a fresh task object for `name`.
    pub fn build_task(&self, name: &str) -> Result<Box<dyn Task>> {
        let registered = self
            .tasks
            .get(name)
            .ok_or_else(|| TaskstackError::UnknownTask(name.to_string()))?;
        Ok((registered.factory)(&registered.instance))
    }

    /// A task name must be free and must reach child mode when passed as
    /// the task argument of a child process.
    fn check_name(&self, name: &str) -> Result<()> {
        if is_reserved_task_name(name) {
            return Err(TaskstackError::ReservedTaskName(name.to_string()));
        }
        if self.tasks.contains_key(name) || self.groups.contains_key(name) {
            return Err(TaskstackError::DuplicateTask(name.to_string()));
        }
        Ok(())
    }

    fn insert(
        &mut self,
        name: TaskName,
        run_after: Vec<String>,
        max_concurrent: Option<usize>,
        instance: TaskInstance,
        factory: TaskFactory,
    ) {
        let mut spec = TaskSpec::new(name.clone()).after(run_after);
        spec.max_concurrent = max_concurrent;
        self.tasks.insert(
            name,
            Registered {
                spec,
                instance,
                factory,
            },
        );
    }

    fn expand_run_after<I, S>(&self, run_after: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut expanded = Vec::new();
        for dep in run_after {
            let dep = dep.into();
            match self.groups.get(&dep) {
                Some(members) => expanded.extend(members.iter().cloned()),
                None => expanded.push(dep),
            }
        }
        expanded
    }
}

fn instance_name(group: &str, identifier: &str) -> String {
    if group.contains('%') {
        group.replace('%', identifier)
    } else {
        format!("{group}:{identifier}")
    }
}
