// src/protocol.rs

//! Progress wire protocol shared by the orchestrator and task processes.
//!
//! A child reports progress by writing one line per update to stdout:
//!
//! ```text
//! success:3;skip:0;error:1;count:10;current:4;duration:1.52;estimated:3.80;memory_usage:10485760;memory_peak:12582912
//! ```
//!
//! Values never contain `;` or newlines. The encoder enforces this for the
//! values it writes; the parser does not unescape anything.

use indexmap::IndexMap;
use thiserror::Error;

pub const COUNT: &str = "count";
pub const CURRENT: &str = "current";
pub const DURATION: &str = "duration";
pub const ESTIMATED: &str = "estimated";
pub const MEMORY_USAGE: &str = "memory_usage";
pub const MEMORY_PEAK: &str = "memory_peak";
pub const CODE_ERRORS_COUNT: &str = "code_errors_count";

/// Ordered `key -> value` pairs of a single protocol line.
pub type Fields = IndexMap<String, String>;

/// A statement inside a line that is not a `key:value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed progress statement '{statement}'")]
pub struct ProtocolError {
    pub statement: String,
}

/// Encode fields into a single protocol line (without trailing newline).
pub fn encode(fields: &Fields) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}:{}", encode_value(value)))
        .collect::<Vec<_>>()
        .join(";")
}

/// Parse one protocol line.
///
/// Every `;`-separated statement must contain a `:`; the first `:` splits
/// key from value, so values may themselves contain `:`.
pub fn parse_line(line: &str) -> Result<Fields, ProtocolError> {
    let mut fields = Fields::new();

    for statement in line.trim().split(';') {
        match statement.split_once(':') {
            Some((key, value)) => {
                fields.insert(key.to_string(), value.to_string());
            }
            None => {
                return Err(ProtocolError {
                    statement: statement.to_string(),
                });
            }
        }
    }

    Ok(fields)
}

/// Split a stream chunk into its non-empty lines.
///
/// One flush from a child can carry several lines when the child wrote
/// faster than the parent read.
pub fn chunk_lines(chunk: &str) -> Vec<&str> {
    let trimmed = chunk.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('\n').map(|l| l.trim_end_matches('\r')).collect()
}

/// Newest line of a chunk; earlier lines are superseded snapshots.
pub fn last_line(chunk: &str) -> Option<&str> {
    chunk_lines(chunk).pop()
}

/// Fold every whitespace run (including newlines) into one space and trim.
pub fn sanitize(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn encode_value(value: &str) -> String {
    sanitize(value).replace(';', ",")
}
