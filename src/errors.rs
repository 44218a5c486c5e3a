// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskstackError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task '{task}' depends on missing task '{dependency}'")]
    MissingDependency { task: String, dependency: String },

    #[error("Task '{0}' cannot depend on itself")]
    SelfDependency(String),

    #[error("Task '{0}' is registered more than once")]
    DuplicateTask(String),

    #[error("Task name '{0}' clashes with the command line and cannot be started as a task")]
    ReservedTaskName(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Invalid subnet filter '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Task {0} is not running")]
    NotRunning(String),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskstackError>;
