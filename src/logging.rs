// src/logging.rs

//! Logging setup for `taskstack` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `TASKSTACK_LOG` environment variable (e.g. "info", "debug")
//! 3. default: `info` for the orchestrator, `error` for task processes
//!
//! Logs are sent to STDERR so that stdout carries only the progress
//! protocol (task processes) or the report (orchestrator). The orchestrator
//! counts every stderr line of a task process as an error line, hence the
//! quieter default there.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "TASKSTACK_LOG";

/// Which side of the process boundary is logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Orchestrator,
    Task,
}

impl LogMode {
    fn default_level(self) -> tracing::Level {
        match self {
            LogMode::Orchestrator => tracing::Level::INFO,
            LogMode::Task => tracing::Level::ERROR,
        }
    }
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, mode: LogMode) -> Result<()> {
    let level = resolve_level(cli_level, std::env::var(LOG_ENV).ok().as_deref(), mode);

    fmt()
        .with_max_level(level)
        .with_target(mode == LogMode::Orchestrator)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(mode == LogMode::Orchestrator)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn resolve_level(cli_level: Option<LogLevel>, env: Option<&str>, mode: LogMode) -> tracing::Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => env
            .and_then(parse_level_str)
            .unwrap_or_else(|| mode.default_level()),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
