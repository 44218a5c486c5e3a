// src/engine/output_handler.rs

//! Interpretation of one chunk read from a task process.

use tracing::error;

use crate::engine::task_data::TaskData;
use crate::engine::StreamKind;
use crate::protocol::{self, ProtocolError};

/// What a chunk did to the task's [`TaskData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The newest stdout line was merged.
    Progress,
    /// The newest stdout line was not a valid protocol line.
    Malformed(ProtocolError),
    /// This many stderr lines were counted as errors.
    ErrorLines(usize),
    /// Only whitespace; nothing changed.
    Empty,
}

impl ChunkOutcome {
    /// Whether the report changed and collaborators should be notified.
    pub fn changed(&self) -> bool {
        !matches!(self, ChunkOutcome::Empty)
    }
}

/// Apply one chunk to `data`.
///
/// - stderr: every line is an error line, counted and logged.
/// - stdout: only the last line counts; earlier lines in the same chunk are
///   superseded snapshots. A malformed line is logged and counted as one
///   error, and the update is discarded.
pub fn apply_chunk(data: &mut TaskData, stream: StreamKind, chunk: &str) -> ChunkOutcome {
    match stream {
        StreamKind::Stderr => {
            let lines = protocol::chunk_lines(chunk);
            if lines.is_empty() {
                return ChunkOutcome::Empty;
            }

            data.add_code_errors(lines.len() as u64);
            for line in &lines {
                error!(task = %data.name(), "{}", protocol::sanitize(line));
            }
            ChunkOutcome::ErrorLines(lines.len())
        }
        StreamKind::Stdout => {
            let Some(line) = protocol::last_line(chunk) else {
                return ChunkOutcome::Empty;
            };

            match protocol::parse_line(line) {
                Ok(fields) => {
                    data.fill(&fields);
                    ChunkOutcome::Progress
                }
                Err(err) => {
                    error!(task = %data.name(), statement = %err.statement, "malformed progress line");
                    data.add_code_errors(1);
                    ChunkOutcome::Malformed(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_newest_stdout_line_is_applied() {
        let mut data = TaskData::new("a");
        let outcome = apply_chunk(
            &mut data,
            StreamKind::Stdout,
            "count:5;current:1\ncount:5;current:2",
        );
        assert_eq!(outcome, ChunkOutcome::Progress);
        assert_eq!(data.count(), 5);
        assert_eq!(data.current(), 2);
    }

    #[test]
    fn malformed_line_counts_one_error_and_keeps_counters() {
        let mut data = TaskData::new("a");
        apply_chunk(&mut data, StreamKind::Stdout, "count:4;current:1\n");

        let outcome = apply_chunk(&mut data, StreamKind::Stdout, "foo");
        assert!(matches!(outcome, ChunkOutcome::Malformed(ref e) if e.statement == "foo"));
        assert_eq!(data.code_errors_count(), 1);
        assert_eq!(data.count(), 4);
        assert_eq!(data.current(), 1);
    }

    #[test]
    fn stderr_lines_are_counted() {
        let mut data = TaskData::new("a");
        let outcome = apply_chunk(&mut data, StreamKind::Stderr, "boom\nstack line\n");
        assert_eq!(outcome, ChunkOutcome::ErrorLines(2));
        assert_eq!(data.code_errors_count(), 2);

        assert_eq!(apply_chunk(&mut data, StreamKind::Stderr, "\n"), ChunkOutcome::Empty);
        assert_eq!(data.code_errors_count(), 2);
    }
}
