// src/exec/stream.rs

//! Readers that forward a child's stdout/stderr to the orchestrator.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{OutputChunk, StreamKind, TaskName};

const READ_BUFFER: usize = 8 * 1024;

/// Spawn a reader that sends every newline-terminated chunk it reads.
///
/// A single chunk may contain several lines, exactly as the child flushed
/// them. A trailing partial line is held back until its newline arrives or
/// the stream closes.
pub fn spawn_chunk_reader<R>(
    task: TaskName,
    stream: StreamKind,
    mut reader: R,
    tx: mpsc::Sender<OutputChunk>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUFFER];
        let mut pending: Vec<u8> = Vec::new();

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    if let Some(idx) = pending.iter().rposition(|b| *b == b'\n') {
                        let complete: Vec<u8> = pending.drain(..=idx).collect();
                        if !send(&tx, &task, stream, &complete).await {
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(task = %task, ?stream, error = %e, "failed reading task stream");
                    break;
                }
            }
        }

        if !pending.is_empty() {
            send(&tx, &task, stream, &pending).await;
        }

        debug!(task = %task, ?stream, "task stream closed");
    })
}

async fn send(
    tx: &mpsc::Sender<OutputChunk>,
    task: &str,
    stream: StreamKind,
    bytes: &[u8],
) -> bool {
    let chunk = OutputChunk {
        task: task.to_string(),
        stream,
        chunk: String::from_utf8_lossy(bytes).into_owned(),
    };
    if tx.send(chunk).await.is_err() {
        debug!(task = %task, ?stream, "orchestrator gone; dropping task output");
        return false;
    }
    true
}
