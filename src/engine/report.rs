// src/engine/report.rs

//! Reporting collaborators fed by the orchestrator.
//!
//! The orchestrator calls an [`Output`] on every state change; rate limiting
//! is the output's business. [`PlainOutput`] is a minimal text renderer and
//! [`NullOutput`] discards everything.

use std::io::Write;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;

use crate::dag::{StackedTask, TaskStatus};
use crate::engine::task_data::TaskData;
use crate::engine::TaskName;

/// Ordered report rows; finished tasks are moved to the end.
pub type TasksSnapshot = IndexMap<TaskName, TaskData>;

pub trait Output: Send {
    fn start_message(&mut self);
    fn print_to_output(&mut self, tasks: &TasksSnapshot, elapsed: Duration);
    fn finish_message(&mut self, tasks: &TasksSnapshot, duration: Duration);
    fn error_message(&mut self, error: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl Output for NullOutput {
    fn start_message(&mut self) {}
    fn print_to_output(&mut self, _tasks: &TasksSnapshot, _elapsed: Duration) {}
    fn finish_message(&mut self, _tasks: &TasksSnapshot, _duration: Duration) {}
    fn error_message(&mut self, _error: &str) {}
}

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Plain-text report, one line per task.
pub struct PlainOutput<W: Write + Send> {
    writer: W,
    last_draw: Option<Instant>,
}

impl PlainOutput<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> PlainOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            last_draw: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&mut self, tasks: &TasksSnapshot, elapsed: Duration) -> std::io::Result<()> {
        let width = tasks.keys().map(|k| k.len()).max().unwrap_or(4).max(4);
        let done = tasks
            .values()
            .filter(|t| t.status() == TaskStatus::Done)
            .count();

        writeln!(
            self.writer,
            "--- {}/{} done, elapsed {} ---",
            done,
            tasks.len(),
            format_time(elapsed.as_secs_f64())
        )?;

        for task in tasks.values() {
            writeln!(
                self.writer,
                "{mark} {name:<width$} {status:<7} {progress:>5.1}% ok {ok:>5} all {all:>5} skip {skip:>4} err {err:>4} wrn {wrn:>4} {time:>8} {mem:>7}",
                mark = task_mark(task),
                name = task.name(),
                status = status_label(task.status()),
                progress = task.progress().min(100.0),
                ok = task.extra_count("success"),
                all = task.count(),
                skip = task.extra_count("skip"),
                err = task.extra_count("error"),
                wrn = task.code_errors_count(),
                time = format_time(task.duration()),
                mem = format_bytes(task.memory_peak()),
            )?;

            if task.extra_count("error") > 0 {
                if let Some(message) = task.extra("message").filter(|m| !m.is_empty()) {
                    writeln!(self.writer, "    {message}")?;
                }
            }
        }

        self.writer.flush()
    }
}

impl<W: Write + Send> Output for PlainOutput<W> {
    fn start_message(&mut self) {
        let _ = writeln!(self.writer, "Starting tasks");
    }

    fn print_to_output(&mut self, tasks: &TasksSnapshot, elapsed: Duration) {
        if self
            .last_draw
            .is_some_and(|at| at.elapsed() < REDRAW_INTERVAL)
        {
            return;
        }
        let _ = self.render(tasks, elapsed);
        self.last_draw = Some(Instant::now());
    }

    fn finish_message(&mut self, tasks: &TasksSnapshot, duration: Duration) {
        let _ = self.render(tasks, duration);
        let _ = writeln!(
            self.writer,
            "Finished in {}",
            format_time(duration.as_secs_f64())
        );
        let _ = self.writer.flush();
    }

    fn error_message(&mut self, error: &str) {
        let _ = writeln!(self.writer, "[ERROR] {error}");
        let _ = self.writer.flush();
    }
}

fn task_mark(task: &TaskData) -> char {
    if task.extra_count("error") > 0 {
        'x'
    } else if task.extra_count("skip") > 0 || task.code_errors_count() > 0 {
        '!'
    } else if task.count() > 0 && task.current() == task.count() {
        '+'
    } else {
        ' '
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Stacked => "stacked",
        TaskStatus::Running => "running",
        TaskStatus::Done => "done",
    }
}

/// `MM:SS`, or `HH:MM:SS` from one hour up.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Human readable byte size in MB, GB or TB.
pub fn format_bytes(bytes: u64) -> String {
    let megabytes = bytes as f64 / 1024.0 / 1024.0;
    if megabytes < 1024.0 {
        return format!("{megabytes:.0}MB");
    }

    let gigabytes = megabytes / 1024.0;
    if gigabytes < 1024.0 {
        return format!("{gigabytes:.1}GB");
    }

    format!("{:.1}TB", gigabytes / 1024.0)
}

/// Per-task statistics logged once a task finishes.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStats<'a> {
    pub tasks_count: usize,
    pub finished: bool,
    pub task: &'a str,
    pub start_at: Option<DateTime<Local>>,
    pub end_at: Option<DateTime<Local>>,
    pub duration: f64,
    pub count: u64,
    pub memory_peak: u64,
    pub extra: &'a IndexMap<String, String>,
    pub with_tasks: IndexMap<&'a str, WithTask>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithTask {
    pub from: DateTime<Local>,
    pub to: Option<DateTime<Local>>,
}

impl<'a> TaskStats<'a> {
    pub fn new(
        task: &'a StackedTask,
        data: &'a TaskData,
        tasks_count: usize,
        finished: bool,
    ) -> Self {
        let with_tasks = task
            .running_with()
            .iter()
            .map(|(name, interval)| {
                (
                    name.as_str(),
                    WithTask {
                        from: interval.from,
                        to: interval.to,
                    },
                )
            })
            .collect();

        Self {
            tasks_count,
            finished,
            task: task.name(),
            start_at: task.start_at(),
            end_at: task.finished_at(),
            duration: data.duration(),
            count: data.count(),
            memory_peak: data.memory_peak(),
            extra: data.all_extra(),
            with_tasks,
        }
    }
}
