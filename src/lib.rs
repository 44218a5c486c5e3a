// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod demo;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod protocol;
pub mod task;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, GraphArgs, RunArgs};
use crate::config::{load_or_default, validate_concurrent, validate_poll_interval, ConfigFile};
use crate::dag::TaskStack;
use crate::engine::{Orchestrator, PlainOutput, RunOptions};
use crate::exec::CommandSpawner;
use crate::task::{run_child, Parallel};

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// - `run`: load config, build the task stack and drive it with the
///   orchestrator, one child process per task.
/// - `graph`: print the dependency graph.
/// - anything else: run that task in this process (child mode).
pub async fn run(args: CliArgs, registry: Parallel) -> Result<i32> {
    match args.command {
        Command::Run(run_args) => run_orchestrator(run_args, &registry).await,
        Command::Graph(graph_args) => print_graph(graph_args, &registry),
        Command::Task(argv) => {
            let Some((name, rest)) = argv.split_first() else {
                anyhow::bail!("missing task name");
            };
            if !rest.is_empty() {
                warn!(task = %name, ignored = ?rest, "extra task arguments ignored");
            }
            Ok(run_child(&registry, name))
        }
    }
}

async fn run_orchestrator(args: RunArgs, registry: &Parallel) -> Result<i32> {
    let cfg = effective_config(&args)?;
    let stack = TaskStack::build(&registry.specs(), &args.subnet)?;

    if args.dry_run {
        print_dry_run(&cfg, &stack);
        return Ok(0);
    }

    let program = match cfg.config.program.clone() {
        Some(program) => program,
        None => std::env::current_exe().context("locating the taskstack executable")?,
    };
    let spawner = CommandSpawner::new(program, cfg.config.args.clone(), cfg.config.bin_dir.clone());

    let options = RunOptions {
        concurrent: cfg.config.concurrent,
        poll_interval: cfg.config.poll_interval,
    };
    info!(?options, tasks = stack.tasks_count(), "starting run");

    let summary = Orchestrator::new(stack, spawner, PlainOutput::stdout(), options)
        .run()
        .await?;

    if summary.failed() > 0 {
        warn!(failed = summary.failed(), "some tasks did not succeed");
    }
    Ok(0)
}

/// Config file values with CLI overrides applied.
fn effective_config(args: &RunArgs) -> Result<ConfigFile> {
    let mut cfg = load_or_default(PathBuf::from(&args.config))?;

    if let Some(concurrent) = args.concurrent {
        cfg.config.concurrent = validate_concurrent(concurrent)?;
    }
    if let Some(ref interval) = args.poll_interval {
        cfg.config.poll_interval = validate_poll_interval(interval)?;
    }

    debug!(config = ?cfg.config, "effective configuration");
    Ok(cfg)
}

fn print_graph(args: GraphArgs, registry: &Parallel) -> Result<i32> {
    let stack = TaskStack::build(&registry.specs(), &args.subnet)?;
    print!("{}", stack.graph().to_dot());
    Ok(0)
}

/// Print the plan: config, then every task with its dependencies and cap.
fn print_dry_run(cfg: &ConfigFile, stack: &TaskStack) {
    println!("taskstack dry-run");
    println!("  config.concurrent = {}", cfg.config.concurrent);
    println!("  config.poll_interval = {:?}", cfg.config.poll_interval);
    println!("  config.bin_dir = {}", cfg.config.bin_dir.display());
    if let Some(ref program) = cfg.config.program {
        println!("  config.program = {}", program.display());
    }
    println!();

    println!("tasks ({}):", stack.tasks_count());
    for task in stack.tasks() {
        println!("  - {}", task.name());
        if !task.run_after().is_empty() {
            println!("      after: {:?}", task.run_after());
        }
        if let Some(cap) = task.max_concurrent() {
            println!("      max_concurrent: {cap}");
        }
    }

    debug!("dry-run complete (no execution)");
}
