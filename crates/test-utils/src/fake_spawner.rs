use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use taskstack::dag::ScheduledTask;
use taskstack::engine::{OutputChunk, StreamKind};
use taskstack::errors::{Result, TaskstackError};
use taskstack::exec::{ProcessHandle, ProcessSpawner};

/// What a fake task process does.
#[derive(Debug, Clone)]
pub struct Script {
    /// Chunks sent right after spawning, in order.
    pub chunks: Vec<(StreamKind, String)>,
    pub exit_code: i32,
    /// Number of `try_exit` polls answered with "still running".
    pub polls_alive: usize,
    pub fail_spawn: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            exit_code: 0,
            polls_alive: 1,
            fail_spawn: false,
        }
    }
}

impl Script {
    pub fn stdout(mut self, chunk: &str) -> Self {
        self.chunks.push((StreamKind::Stdout, chunk.to_string()));
        self
    }

    pub fn stderr(mut self, chunk: &str) -> Self {
        self.chunks.push((StreamKind::Stderr, chunk.to_string()));
        self
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn alive_for(mut self, polls: usize) -> Self {
        self.polls_alive = polls;
        self
    }

    pub fn fail_spawn(mut self) -> Self {
        self.fail_spawn = true;
        self
    }
}

/// Lifecycle event recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Started(String),
    Exited(String),
}

/// Shared event log of a [`FakeSpawner`].
#[derive(Debug, Clone, Default)]
pub struct ProcessLog(Arc<Mutex<Vec<ProcessEvent>>>);

impl ProcessLog {
    fn push(&self, event: ProcessEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<ProcessEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProcessEvent::Started(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn index_of(&self, event: &ProcessEvent) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Highest number of processes alive at the same time.
    pub fn max_alive(&self) -> usize {
        let mut alive = 0usize;
        let mut max = 0;
        for event in self.events() {
            match event {
                ProcessEvent::Started(_) => {
                    alive += 1;
                    max = max.max(alive);
                }
                ProcessEvent::Exited(_) => alive = alive.saturating_sub(1),
            }
        }
        max
    }
}

/// Spawner that plays back scripted processes instead of running commands.
///
/// Tasks without a script exit with 0 after one poll.
#[derive(Debug, Default)]
pub struct FakeSpawner {
    scripts: HashMap<String, Script>,
    log: ProcessLog,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, task: &str, script: Script) -> Self {
        self.scripts.insert(task.to_string(), script);
        self
    }

    pub fn log(&self) -> ProcessLog {
        self.log.clone()
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(
        &mut self,
        task: &ScheduledTask,
        output_tx: mpsc::Sender<OutputChunk>,
    ) -> Result<Box<dyn ProcessHandle>> {
        let script = self.scripts.get(&task.name).cloned().unwrap_or_default();
        if script.fail_spawn {
            return Err(TaskstackError::Other(anyhow::anyhow!(
                "no such program for {}",
                task.name
            )));
        }

        self.log.push(ProcessEvent::Started(task.name.clone()));
        for (stream, chunk) in script.chunks {
            output_tx
                .try_send(OutputChunk {
                    task: task.name.clone(),
                    stream,
                    chunk,
                })
                .map_err(|e| TaskstackError::Other(anyhow::anyhow!("output channel: {e}")))?;
        }

        Ok(Box::new(FakeProcess {
            name: task.name.clone(),
            polls_left: script.polls_alive,
            exit_code: script.exit_code,
            log: self.log.clone(),
        }))
    }
}

struct FakeProcess {
    name: String,
    polls_left: usize,
    exit_code: i32,
    log: ProcessLog,
}

impl ProcessHandle for FakeProcess {
    fn try_exit(&mut self) -> Result<Option<Option<i32>>> {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return Ok(None);
        }
        self.log.push(ProcessEvent::Exited(self.name.clone()));
        Ok(Some(Some(self.exit_code)))
    }
}
