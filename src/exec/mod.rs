// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `ProcessSpawner`/`ProcessHandle` seam and the
//!   production `CommandSpawner` built on `tokio::process::Command`. Tests
//!   replace the spawner with scripted fakes.
//! - [`stream`] forwards a child's stdout/stderr to the orchestrator as
//!   newline-terminated chunks.

pub mod backend;
pub mod stream;

pub use backend::{CommandSpawner, ProcessHandle, ProcessSpawner};
pub use stream::spawn_chunk_reader;
