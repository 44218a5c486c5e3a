// tests/orchestrator_fake_spawner.rs

use std::time::Duration;

use taskstack::dag::{TaskStack, TaskStatus};
use taskstack::engine::{NullOutput, Orchestrator, RunOptions, RunSummary, TaskOutcome};
use taskstack::task::EXIT_ERROR;
use taskstack_test_utils::builders::PlanBuilder;
use taskstack_test_utils::fake_spawner::{FakeSpawner, ProcessEvent, ProcessLog, Script};
use taskstack_test_utils::{init_tracing, with_timeout};

fn stack(builder: PlanBuilder) -> TaskStack {
    let none: [&str; 0] = [];
    TaskStack::build(&builder.build(), &none).unwrap()
}

async fn run(stack: TaskStack, spawner: FakeSpawner, concurrent: usize) -> (RunSummary, ProcessLog) {
    let log = spawner.log();
    let options = RunOptions {
        concurrent,
        poll_interval: Duration::from_millis(2),
    };
    let summary = with_timeout(Orchestrator::new(stack, spawner, NullOutput, options).run())
        .await
        .unwrap();
    (summary, log)
}

#[tokio::test]
async fn dependent_starts_after_both_dependencies_exit() {
    init_tracing();
    let plan = PlanBuilder::new()
        .task("A")
        .task("B")
        .task_after("C", &["A", "B"]);
    let spawner = FakeSpawner::new()
        .script("A", Script::default().alive_for(2))
        .script("B", Script::default().alive_for(3));

    let (summary, log) = run(stack(plan), spawner, 2).await;

    assert_eq!(log.started()[..2], ["A".to_string(), "B".to_string()]);
    let c_started = log.index_of(&ProcessEvent::Started("C".into())).unwrap();
    assert!(log.index_of(&ProcessEvent::Exited("A".into())).unwrap() < c_started);
    assert!(log.index_of(&ProcessEvent::Exited("B".into())).unwrap() < c_started);
    assert!(log.max_alive() <= 2);

    let order: Vec<_> = summary.tasks.keys().map(String::as_str).collect();
    assert_eq!(order, vec!["A", "B", "C"]);
    assert!(summary.tasks.values().all(|t| t.status() == TaskStatus::Done));
    assert_eq!(summary.failed(), 0);
}

#[tokio::test]
async fn concurrency_budget_is_never_exceeded() {
    init_tracing();
    let mut plan = PlanBuilder::new();
    for i in 0..8 {
        plan = plan.task(&format!("t{i}"));
    }
    let mut spawner = FakeSpawner::new();
    for i in 0..8 {
        spawner = spawner.script(&format!("t{i}"), Script::default().alive_for(1 + i % 3));
    }

    let (summary, log) = run(stack(plan), spawner, 3).await;

    assert_eq!(log.started().len(), 8);
    assert!(log.max_alive() <= 3);
    assert_eq!(summary.tasks.len(), 8);
}

#[tokio::test]
async fn only_last_line_of_a_chunk_is_applied() {
    init_tracing();
    let spawner = FakeSpawner::new().script(
        "a",
        Script::default().stdout("count:5;current:1\ncount:5;current:2"),
    );

    let (summary, _) = run(stack(PlanBuilder::new().task("a")), spawner, 1).await;

    let data = &summary.tasks["a"];
    assert_eq!(data.count(), 5);
    assert_eq!(data.current(), 2);
    assert_eq!(data.code_errors_count(), 0);
}

#[tokio::test]
async fn malformed_lines_and_stderr_count_as_code_errors() {
    init_tracing();
    let spawner = FakeSpawner::new().script(
        "a",
        Script::default()
            .stdout("count:3;current:1;message:first\n")
            .stdout("foo\n")
            .stderr("PHP Warning: something\nin file.php\n"),
    );

    let (summary, _) = run(stack(PlanBuilder::new().task("a")), spawner, 1).await;

    let data = &summary.tasks["a"];
    assert_eq!(data.current(), 1);
    assert_eq!(data.extra("message"), Some("first"));
    assert_eq!(data.code_errors_count(), 3);
}

#[tokio::test]
async fn failures_do_not_stop_dependents() {
    init_tracing();
    let plan = PlanBuilder::new()
        .task("broken")
        .task("unstartable")
        .task_after("after", &["broken", "unstartable"]);
    let spawner = FakeSpawner::new()
        .script("broken", Script::default().exit(EXIT_ERROR))
        .script("unstartable", Script::default().fail_spawn());

    let (summary, log) = run(stack(plan), spawner, 2).await;

    assert_eq!(summary.outcomes["broken"], TaskOutcome::Failed(EXIT_ERROR));
    assert_eq!(summary.outcomes["unstartable"], TaskOutcome::Aborted);
    assert_eq!(summary.outcomes["after"], TaskOutcome::Success);
    assert_eq!(summary.failed(), 2);
    assert_eq!(summary.tasks["unstartable"].code_errors_count(), 1);
    assert!(log.started().contains(&"after".to_string()));
}
