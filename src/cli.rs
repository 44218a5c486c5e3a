// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `taskstack`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskstack",
    version,
    about = "Run registered tasks as parallel processes, honoring their dependencies.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKSTACK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run all registered tasks (or a subnet of them).
    Run(RunArgs),

    /// Print the dependency graph in Graphviz DOT format.
    Graph(GraphArgs),

    /// Run a single task in child mode; used by `run` for every task.
    #[command(external_subcommand)]
    Task(Vec<String>),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Only run tasks whose name matches one of these regexes.
    #[arg(long, value_name = "REGEX")]
    pub subnet: Vec<String>,

    /// Path to the config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "Taskstack.toml")]
    pub config: String,

    /// Override `[config].concurrent`.
    #[arg(long, value_name = "N")]
    pub concurrent: Option<usize>,

    /// Override `[config].poll_interval`, e.g. `500ms`.
    #[arg(long, value_name = "DURATION")]
    pub poll_interval: Option<String>,

    /// Build and validate the plan, print it, but don't start any task.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct GraphArgs {
    /// Only include tasks whose name matches one of these regexes.
    #[arg(long, value_name = "REGEX")]
    pub subnet: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Child processes log less; see [`crate::logging`].
    pub fn is_child(&self) -> bool {
        matches!(self.command, Command::Task(_))
    }
}

/// Whether `<program> <name>` would be parsed as something other than child
/// mode for task `name`.
///
/// Builtin subcommands, their aliases, `help` and anything clap treats as a
/// flag win over the external subcommand.
pub fn is_reserved_task_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('-') || name == "help" {
        return true;
    }

    CliArgs::command()
        .get_subcommands()
        .any(|sub| sub.get_name() == name || sub.get_all_aliases().any(|alias| alias == name))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
