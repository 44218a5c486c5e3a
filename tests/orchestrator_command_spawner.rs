// tests/orchestrator_command_spawner.rs

#![cfg(unix)]

use std::time::Duration;

use taskstack::dag::TaskStack;
use taskstack::engine::{NullOutput, Orchestrator, RunOptions, RunSummary, TaskOutcome};
use taskstack::exec::CommandSpawner;
use taskstack_test_utils::builders::PlanBuilder;
use taskstack_test_utils::{init_tracing, with_timeout};

/// `sh -c SCRIPT <task>` runs the script with the task name as `$0`.
const SCRIPT: &str = r#"
case "$0" in
  progress)
    printf 'count:2;current:1\ncount:2;current:2\n'
    echo oops >&2
    ;;
  cwd)
    if [ -f marker.txt ]; then printf 'count:1;current:1\n'; else exit 3; fi
    ;;
  detached)
    (sleep 0.3; printf 'count:3;current:3\n') &
    ;;
  failing)
    printf 'count:1;current:0\n'
    exit 100
    ;;
esac
"#;

async fn run_plan(plan: PlanBuilder, bin_dir: &std::path::Path) -> RunSummary {
    let none: [&str; 0] = [];
    let stack = TaskStack::build(&plan.build(), &none).unwrap();
    let spawner = CommandSpawner::new("sh", vec!["-c".into(), SCRIPT.into()], bin_dir);
    let options = RunOptions {
        concurrent: 2,
        poll_interval: Duration::from_millis(10),
    };

    with_timeout(Orchestrator::new(stack, spawner, NullOutput, options).run())
        .await
        .unwrap()
}

#[tokio::test]
async fn real_process_output_is_aggregated() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let summary = run_plan(PlanBuilder::new().task("progress"), dir.path()).await;

    let data = &summary.tasks["progress"];
    assert_eq!(data.count(), 2);
    assert_eq!(data.current(), 2);
    assert_eq!(data.code_errors_count(), 1);
    assert_eq!(summary.outcomes["progress"], TaskOutcome::Success);
}

#[tokio::test]
async fn tasks_run_inside_bin_dir() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "").unwrap();

    let summary = run_plan(PlanBuilder::new().task("cwd"), dir.path()).await;

    assert_eq!(summary.outcomes["cwd"], TaskOutcome::Success);
    assert_eq!(summary.tasks["cwd"].current(), 1);
}

#[tokio::test]
async fn exit_waits_for_output_streams_to_close() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    // The shell exits at once; a background job keeps stdout open and
    // writes the final line later.
    let summary = run_plan(PlanBuilder::new().task("detached"), dir.path()).await;

    let data = &summary.tasks["detached"];
    assert_eq!(data.current(), 3);
    assert_eq!(data.code_errors_count(), 0);
    assert_eq!(summary.outcomes["detached"], TaskOutcome::Success);
}

#[tokio::test]
async fn error_exit_code_and_dependents_still_run() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let plan = PlanBuilder::new()
        .task("failing")
        .task_after("progress", &["failing"]);

    let summary = run_plan(plan, dir.path()).await;

    assert_eq!(summary.outcomes["failing"], TaskOutcome::Failed(100));
    assert_eq!(summary.outcomes["progress"], TaskOutcome::Success);
    assert_eq!(summary.failed(), 1);
}
