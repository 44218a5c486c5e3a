// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_CONCURRENT: usize = 3;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// [config]
/// concurrent = 3
/// poll_interval = "500ms"
/// bin_dir = "."
/// program = "./target/release/taskstack"
/// args = []
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: RawConfigSection,
}

/// Raw `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigSection {
    /// Maximum number of task processes alive at once.
    pub concurrent: Option<usize>,

    /// Sleep between scheduler iterations, e.g. `"1s"` or `"250ms"`.
    pub poll_interval: Option<String>,

    /// Working directory of task processes.
    pub bin_dir: Option<PathBuf>,

    /// Executable started for every task; defaults to the running binary.
    pub program: Option<PathBuf>,

    /// Arguments passed before the task name.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` or [`Default`].
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub config: ConfigSection,
}

#[derive(Debug, Clone)]
pub struct ConfigSection {
    pub concurrent: usize,
    pub poll_interval: Duration,
    pub bin_dir: PathBuf,
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            concurrent: DEFAULT_CONCURRENT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            bin_dir: PathBuf::from("."),
            program: None,
            args: Vec::new(),
        }
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection) -> Self {
        Self { config }
    }
}
