// src/task/notifier.rs

//! Child-side emitter of progress lines.

use std::io::{self, Write};
use std::time::Instant;

use sysinfo::{Pid, System};
use tracing::warn;

use crate::protocol::{self, Fields};

/// Writes one flushed protocol line per update.
///
/// Every line carries `count`, `current`, `duration`, `estimated`,
/// `memory_usage` and `memory_peak`; caller fields come first and never
/// override those.
pub struct Notifier {
    sink: Box<dyn Write + Send>,
    started: Instant,
    memory: MemoryProbe,
}

impl Notifier {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            started: Instant::now(),
            memory: MemoryProbe::current_process(),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Restart the clock used for `duration` and `estimated`.
    pub fn restart(&mut self) {
        self.started = Instant::now();
    }

    pub fn notify(&mut self, count: u64, current: u64, extra: Fields) {
        let line = self.compose(count, current, extra);
        if let Err(e) = writeln!(self.sink, "{line}").and_then(|_| self.sink.flush()) {
            warn!(error = %e, "failed to write progress line");
        }
    }

    /// Task without granular progress: `count:1;current:0`.
    pub fn notify_start(&mut self) {
        self.notify(1, 0, Fields::new());
    }

    /// Task without granular progress: `count:1;current:1`.
    pub fn notify_end(&mut self, extra: Fields) {
        self.notify(1, 1, extra);
    }

    fn compose(&mut self, count: u64, current: u64, extra: Fields) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        let estimated = if current > 0 {
            elapsed / current as f64 * count as f64
        } else {
            0.0
        };
        let (usage, peak) = self.memory.sample();

        let mut fields = extra;
        fields.insert(protocol::COUNT.into(), count.to_string());
        fields.insert(protocol::CURRENT.into(), current.to_string());
        fields.insert(protocol::DURATION.into(), format!("{elapsed:.2}"));
        fields.insert(protocol::ESTIMATED.into(), format!("{estimated:.2}"));
        fields.insert(protocol::MEMORY_USAGE.into(), usage.to_string());
        fields.insert(protocol::MEMORY_PEAK.into(), peak.to_string());

        protocol::encode(&fields)
    }
}

/// Resident memory of the current process, with the highest value seen.
struct MemoryProbe {
    system: System,
    pid: Option<Pid>,
    peak: u64,
}

impl MemoryProbe {
    fn current_process() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            peak: 0,
        }
    }

    fn sample(&mut self) -> (u64, u64) {
        let usage = match self.pid {
            Some(pid) if self.system.refresh_process(pid) => self
                .system
                .process(pid)
                .map(|p| p.memory())
                .unwrap_or(0),
            _ => 0,
        };
        self.peak = self.peak.max(usage);
        (usage, self.peak)
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// Clonable in-memory sink for asserting on emitted lines.
    #[derive(Clone, Default)]
    pub struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        pub fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
