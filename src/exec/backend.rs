// src/exec/backend.rs

//! Pluggable process backend.
//!
//! The orchestrator talks to a [`ProcessSpawner`] instead of
//! `tokio::process` directly, so tests can drive it with scripted fake
//! processes. [`CommandSpawner`] is the production implementation.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::dag::ScheduledTask;
use crate::engine::{OutputChunk, StreamKind};
use crate::errors::Result;
use crate::exec::stream::spawn_chunk_reader;

/// A started task process.
pub trait ProcessHandle: Send {
    /// Non-blocking exit check.
    ///
    /// Returns `Some(exit_code)` once the process has exited and all of its
    /// output has been forwarded; the code is `None` when the process was
    /// killed by a signal.
    fn try_exit(&mut self) -> Result<Option<Option<i32>>>;
}

/// Starts one process per scheduled task.
pub trait ProcessSpawner: Send {
    /// Start the task. Output chunks must be sent to `output_tx`.
    fn spawn(
        &mut self,
        task: &ScheduledTask,
        output_tx: mpsc::Sender<OutputChunk>,
    ) -> Result<Box<dyn ProcessHandle>>;
}

/// Runs `<program> <args...> <task name>` in `bin_dir`.
#[derive(Debug, Clone)]
pub struct CommandSpawner {
    program: PathBuf,
    args: Vec<String>,
    bin_dir: PathBuf,
}

impl CommandSpawner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            bin_dir: bin_dir.into(),
        }
    }
}

impl ProcessSpawner for CommandSpawner {
    fn spawn(
        &mut self,
        task: &ScheduledTask,
        output_tx: mpsc::Sender<OutputChunk>,
    ) -> Result<Box<dyn ProcessHandle>> {
        info!(
            task = %task.name,
            program = %self.program.display(),
            bin_dir = %self.bin_dir.display(),
            "starting task process"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&task.name)
            .current_dir(&self.bin_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", task.name))?;

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_chunk_reader(
                task.name.clone(),
                StreamKind::Stdout,
                stdout,
                output_tx.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_chunk_reader(
                task.name.clone(),
                StreamKind::Stderr,
                stderr,
                output_tx,
            ));
        }

        Ok(Box::new(ChildProcess { child, readers }))
    }
}

struct ChildProcess {
    child: Child,
    readers: Vec<JoinHandle<()>>,
}

impl ProcessHandle for ChildProcess {
    fn try_exit(&mut self) -> Result<Option<Option<i32>>> {
        let status = self
            .child
            .try_wait()
            .context("polling task process")?;

        match status {
            Some(status) if self.readers.iter().all(|r| r.is_finished()) => {
                Ok(Some(status.code()))
            }
            _ => Ok(None),
        }
    }
}
