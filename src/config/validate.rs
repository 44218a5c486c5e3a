// src/config/validate.rs

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, RawConfigSection};
use crate::errors::{Result, TaskstackError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskstackError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let config = validate_section(raw.config)?;
        Ok(ConfigFile::new_unchecked(config))
    }
}

fn validate_section(raw: RawConfigSection) -> Result<ConfigSection> {
    let defaults = ConfigSection::default();

    let concurrent = validate_concurrent(raw.concurrent.unwrap_or(defaults.concurrent))?;

    let poll_interval = match raw.poll_interval.as_deref() {
        Some(s) => validate_poll_interval(s)?,
        None => defaults.poll_interval,
    };

    if let Some(program) = &raw.program {
        if program.as_os_str().is_empty() {
            return Err(TaskstackError::ConfigError(
                "[config].program must not be empty".to_string(),
            ));
        }
    }

    Ok(ConfigSection {
        concurrent,
        poll_interval,
        bin_dir: raw.bin_dir.unwrap_or(defaults.bin_dir),
        program: raw.program,
        args: raw.args,
    })
}

/// `concurrent` must be at least 1.
pub fn validate_concurrent(concurrent: usize) -> Result<usize> {
    if concurrent == 0 {
        return Err(TaskstackError::ConfigError(
            "[config].concurrent must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(concurrent)
}

/// `poll_interval` must parse and be non-zero.
pub fn validate_poll_interval(s: &str) -> Result<std::time::Duration> {
    let interval = parse_duration(s).map_err(|e| {
        TaskstackError::ConfigError(format!("[config].poll_interval '{s}': {e}"))
    })?;
    if interval.is_zero() {
        return Err(TaskstackError::ConfigError(
            "[config].poll_interval must be greater than zero".to_string(),
        ));
    }
    Ok(interval)
}
