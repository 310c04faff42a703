// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::dag::ExportFormat;

/// Command-line arguments for `taskdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskdag",
    version,
    about = "Run a task dependency graph defined in a TOML workflow file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workflow file (TOML).
    ///
    /// Default: `Workflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Workflow.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Execute the workflow once and print the results.
    Run {
        /// Set or override a run input, e.g. `--set A.value=5`.
        ///
        /// May be given several times; these win over `[inputs]` in the file.
        #[arg(long = "set", value_name = "TASK.ARG=NUM", value_parser = parse_assignment)]
        set: Vec<Assignment>,

        /// Print only the results of terminal tasks.
        #[arg(long)]
        outputs_only: bool,

        /// Print results as a JSON object instead of `name = value` lines.
        #[arg(long)]
        json: bool,
    },

    /// Print the execution order.
    Order,

    /// Print the number of upstream tasks of every task.
    Indegree,

    /// Export the dependency graph for visualisation.
    Graph {
        #[arg(long, value_enum, default_value_t = GraphFormat::Dot)]
        format: GraphFormat,

        /// Write to this file instead of stdout.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Parse and validate the workflow file without running anything.
    Check,
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

/// Graph export format as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Dot,
    Json,
}

impl From<GraphFormat> for ExportFormat {
    fn from(format: GraphFormat) -> Self {
        match format {
            GraphFormat::Dot => ExportFormat::Dot,
            GraphFormat::Json => ExportFormat::Json,
        }
    }
}

/// One `--set TASK.ARG=NUM` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub task: String,
    pub arg: String,
    pub value: f64,
}

/// Parse `TASK.ARG=NUM`. The task name may itself contain dots; the argument
/// name is whatever follows the last one.
pub fn parse_assignment(s: &str) -> Result<Assignment, String> {
    let (lhs, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TASK.ARG=NUM, got '{s}'"))?;
    let (task, arg) = lhs
        .trim()
        .rsplit_once('.')
        .ok_or_else(|| format!("expected TASK.ARG before '=', got '{lhs}'"))?;

    if task.is_empty() || arg.is_empty() {
        return Err(format!("expected TASK.ARG before '=', got '{lhs}'"));
    }

    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid number '{}': {e}", value.trim()))?;

    Ok(Assignment {
        task: task.to_string(),
        arg: arg.to_string(),
        value,
    })
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
