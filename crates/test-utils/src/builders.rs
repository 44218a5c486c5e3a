#![allow(dead_code)]

use std::path::PathBuf;

use taskstack::config::{ConfigFile, RawConfigFile, RawConfigSection};
use taskstack::dag::{TaskSpec, TaskStack};

/// Builder for a list of `TaskSpec`s.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    specs: Vec<TaskSpec>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, name: &str) -> Self {
        self.specs.push(TaskSpec::new(name));
        self
    }

    pub fn task_after(mut self, name: &str, deps: &[&str]) -> Self {
        self.specs
            .push(TaskSpec::new(name).after(deps.iter().copied()));
        self
    }

    pub fn capped(mut self, name: &str, cap: usize, deps: &[&str]) -> Self {
        self.specs.push(
            TaskSpec::new(name)
                .after(deps.iter().copied())
                .max_concurrent(cap),
        );
        self
    }

    pub fn build(self) -> Vec<TaskSpec> {
        self.specs
    }

    /// Build a prepared stack without subnet filters.
    pub fn stack(self) -> TaskStack {
        let none: [&str; 0] = [];
        let mut stack =
            TaskStack::build(&self.specs, &none).expect("Failed to build task stack from builder");
        stack.prepare();
        stack
    }
}

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Debug, Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn concurrent(mut self, n: usize) -> Self {
        self.config.config.concurrent = Some(n);
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.config.poll_interval = Some(interval.to_string());
        self
    }

    pub fn program(mut self, program: &str, args: &[&str]) -> Self {
        self.config.config.program = Some(PathBuf::from(program));
        self.config.config.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.config.bin_dir = Some(dir.into());
        self
    }

    pub fn raw(self) -> RawConfigSection {
        self.config.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
