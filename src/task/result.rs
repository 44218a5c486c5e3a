// src/task/result.rs

//! Outcome of one unit of work and the process exit codes derived from it.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_SKIP: i32 = 50;
pub const EXIT_ERROR: i32 = 100;

/// Success, Skip or Error.
///
/// `key` identifies the item a result belongs to (batch strategies match
/// results back to items with it). `data` is the success payload.
#[derive(Debug)]
pub enum TaskResult<T = ()> {
    Success {
        data: T,
        key: Option<String>,
        message: String,
    },
    Skip {
        key: Option<String>,
        message: String,
    },
    Error {
        key: Option<String>,
        message: String,
        cause: Option<anyhow::Error>,
    },
}

impl TaskResult<()> {
    pub fn success() -> Self {
        TaskResult::success_with(())
    }
}

impl<T> TaskResult<T> {
    pub fn success_with(data: T) -> Self {
        TaskResult::Success {
            data,
            key: None,
            message: String::new(),
        }
    }

    pub fn skip(message: impl Into<String>) -> Self {
        TaskResult::Skip {
            key: None,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        TaskResult::Error {
            key: None,
            message: message.into(),
            cause: None,
        }
    }

    /// Error result carrying the original cause for logging.
    pub fn failed(cause: anyhow::Error) -> Self {
        TaskResult::Error {
            key: None,
            message: format!("{cause:#}"),
            cause: Some(cause),
        }
    }

    pub fn with_key(mut self, new_key: impl Into<String>) -> Self {
        match &mut self {
            TaskResult::Success { key, .. }
            | TaskResult::Skip { key, .. }
            | TaskResult::Error { key, .. } => *key = Some(new_key.into()),
        }
        self
    }

    pub fn with_message(mut self, new_message: impl Into<String>) -> Self {
        match &mut self {
            TaskResult::Success { message, .. }
            | TaskResult::Skip { message, .. }
            | TaskResult::Error { message, .. } => *message = new_message.into(),
        }
        self
    }

    /// Process exit code: 0, 50 or 100.
    pub fn code(&self) -> i32 {
        match self {
            TaskResult::Success { .. } => EXIT_SUCCESS,
            TaskResult::Skip { .. } => EXIT_SKIP,
            TaskResult::Error { .. } => EXIT_ERROR,
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            TaskResult::Success { .. } => "success",
            TaskResult::Skip { .. } => "skip",
            TaskResult::Error { .. } => "error",
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            TaskResult::Success { key, .. }
            | TaskResult::Skip { key, .. }
            | TaskResult::Error { key, .. } => key.as_deref(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TaskResult::Success { message, .. }
            | TaskResult::Skip { message, .. }
            | TaskResult::Error { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TaskResult::Error { .. })
    }

    /// Drop the success payload, keeping key and message.
    pub fn without_data(self) -> TaskResult {
        match self {
            TaskResult::Success { key, message, .. } => TaskResult::Success {
                data: (),
                key,
                message,
            },
            TaskResult::Skip { key, message } => TaskResult::Skip { key, message },
            TaskResult::Error {
                key,
                message,
                cause,
            } => TaskResult::Error {
                key,
                message,
                cause,
            },
        }
    }
}

impl<T> From<anyhow::Error> for TaskResult<T> {
    fn from(err: anyhow::Error) -> Self {
        TaskResult::failed(err)
    }
}

impl<T> fmt::Display for TaskResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())?;
        if let Some(key) = self.key() {
            write!(f, " [{key}]")?;
        }
        if !self.message().is_empty() {
            write!(f, ": {}", self.message())?;
        }
        Ok(())
    }
}

/// Run user code, turning a panic into an error.
pub(crate) fn guarded<R>(f: impl FnOnce() -> anyhow::Result<R>) -> anyhow::Result<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("task panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
