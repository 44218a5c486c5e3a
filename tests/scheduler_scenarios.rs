// tests/scheduler_scenarios.rs

use taskstack::dag::{ScheduledTask, TaskStack, TaskState, TaskStatus};
use taskstack::errors::TaskstackError;
use taskstack_test_utils::builders::PlanBuilder;
use taskstack_test_utils::init_tracing;

fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
    tasks.iter().map(|t| t.name.as_str()).collect()
}

#[test]
fn two_independent_tasks_then_their_dependent() {
    init_tracing();
    let mut stack = PlanBuilder::new()
        .task("A")
        .task("B")
        .task_after("C", &["A", "B"])
        .stack();

    // Cycle 1: A and B together, C waits.
    assert_eq!(names(&stack.get_runnable_tasks(2, 0)), vec!["A", "B"]);
    assert_eq!(stack.state_of("C"), Some(TaskState::Stacked));

    stack.mark_done("A").unwrap();
    assert!(stack.get_runnable_tasks(1, 1).is_empty());
    assert_eq!(stack.state_of("C"), Some(TaskState::Stacked));

    stack.mark_done("B").unwrap();
    assert_eq!(names(&stack.get_runnable_tasks(2, 0)), vec!["C"]);

    stack.mark_done("C").unwrap();
    assert!(stack.is_empty());
    for name in ["A", "B", "C"] {
        assert_eq!(stack.get(name).unwrap().status(), TaskStatus::Done);
    }
}

#[test]
fn missing_dependency_fails_build() {
    let specs = PlanBuilder::new().task_after("x", &["y"]).build();
    let none: [&str; 0] = [];

    let err = TaskStack::build(&specs, &none).unwrap_err();
    match err {
        TaskstackError::MissingDependency { task, dependency } => {
            assert_eq!(task, "x");
            assert_eq!(dependency, "y");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_dependency_fails_even_outside_subnet() {
    let specs = PlanBuilder::new()
        .task("report")
        .task_after("import", &["nowhere"])
        .build();

    assert!(TaskStack::build(&specs, &["^report$"]).is_err());
}

#[test]
fn cycles_fail_build() {
    let specs = PlanBuilder::new()
        .task_after("a", &["c"])
        .task_after("b", &["a"])
        .task_after("c", &["b"])
        .build();
    let none: [&str; 0] = [];

    let err = TaskStack::build(&specs, &none).unwrap_err();
    assert!(matches!(err, TaskstackError::DagCycle(_)));
}

#[test]
fn running_capped_task_at_its_cap_blocks_everything() {
    let mut stack = PlanBuilder::new()
        .capped("capped", 2, &[])
        .task("a")
        .task("b")
        .task("c")
        .stack();

    assert_eq!(names(&stack.get_runnable_tasks(2, 0)), vec!["a", "b"]);
    assert_eq!(names(&stack.get_runnable_tasks(1, 2)), vec!["capped"]);

    stack.mark_done("a").unwrap();
    // capped and b are running: 2 <= 2, so c must wait.
    assert!(stack.get_runnable_tasks(5, 2).is_empty());
    assert_eq!(stack.state_of("c"), Some(TaskState::Runnable));

    stack.mark_done("b").unwrap();
    assert_eq!(names(&stack.get_runnable_tasks(5, 1)), vec!["c"]);
}

#[test]
fn subnet_keeps_matching_tasks_and_treats_outside_dependencies_as_done() {
    let specs = PlanBuilder::new()
        .task("import:users")
        .task_after("import:articles", &["import:users"])
        .task_after("export:feed", &["import:articles"])
        .build();

    let mut stack = TaskStack::build(&specs, &["^export:"]).unwrap();
    stack.prepare();

    assert_eq!(stack.tasks_count(), 1);
    assert_eq!(names(&stack.get_runnable_tasks(3, 0)), vec!["export:feed"]);
    stack.mark_done("export:feed").unwrap();
    assert!(stack.is_empty());
}

#[test]
fn running_with_records_overlaps() {
    let mut stack = PlanBuilder::new().task("a").task("b").stack();
    stack.get_runnable_tasks(2, 0);
    stack.running_with_start("b", "a");

    stack.mark_done("b").unwrap();
    stack.running_with_stop("b", "a");
    stack.mark_done("a").unwrap();

    let a = stack.get("a").unwrap();
    let interval = &a.running_with()["b"];
    assert!(interval.to.is_some());
    assert!(interval.to.unwrap() >= interval.from);
}
