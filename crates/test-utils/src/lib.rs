//! Shared helpers for the `taskstack` integration tests: plan and config
//! builders, a scripted process spawner, and tracing/timeout wrappers.

pub mod builders;
pub mod fake_spawner;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound for a single orchestrator run in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Route orchestrator logs to the test harness writer.
///
/// Honors `TASKSTACK_LOG` like the binary does, defaulting to `debug` so a
/// failing scheduling test shows every dispatch decision.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(taskstack::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Fail the test instead of hanging when a plan never drains.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("plan did not finish within {TEST_TIMEOUT:?}"),
    }
}
