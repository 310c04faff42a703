// src/lib.rs

//! A single-process, deterministic task dependency graph executor.
//!
//! Tasks are declared, wired into a DAG through explicit upstream lists,
//! frozen into a [`Workflow`], and executed one at a time in a reproducible
//! topological order. External inputs are injected at source tasks and each
//! task's result is passed positionally to every task that depends on it.
//!
//! ```
//! use taskdag::{Inputs, Kwargs, TaskResult, Workflow};
//!
//! fn value(_: &[i64], kwargs: &Kwargs<i64>) -> TaskResult<i64> {
//!     Ok(kwargs["value"])
//! }
//!
//! fn multiply(args: &[i64], _: &Kwargs<i64>) -> TaskResult<i64> {
//!     Ok(args.iter().product())
//! }
//!
//! let mut builder = Workflow::<i64>::builder();
//! let a = builder.add_named_task("A", value)?;
//! let b = builder.add_named_task("B", value)?;
//! let m = builder.add_named_task("M", multiply)?;
//! builder.add_dependency(m, &[a, b])?;
//! let workflow = builder.build()?;
//!
//! let inputs = Inputs::new()
//!     .with("A", [("value", 5)])
//!     .with("B", [("value", 3)]);
//! let results = workflow.execute(inputs)?;
//! assert_eq!(results.get("M"), Some(&15));
//! # Ok::<(), taskdag::WorkflowError>(())
//! ```

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod ops;
pub mod task;
pub mod workflow;

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{Assignment, CliArgs, Command};
use crate::config::load_and_validate;

pub use crate::dag::{ExportFormat, Graph, GraphError};
pub use crate::errors::WorkflowError;
pub use crate::ops::{Op, OpKind};
pub use crate::task::{Kwargs, Task, TaskId, TaskRef, TaskResult};
pub use crate::workflow::{
    ExecutionContext, ExecutionFailure, Inputs, TaskState, Workflow, WorkflowBuilder,
};

/// High-level entry point used by `main.rs`: results go to stdout.
pub fn run(args: CliArgs) -> Result<()> {
    let stdout = io::stdout();
    run_to(args, &mut stdout.lock())
}

/// Load and validate the workflow file, then dispatch the subcommand,
/// writing its report to `out`.
pub fn run_to(args: CliArgs, out: &mut impl Write) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let file = load_and_validate(&config_path)
        .with_context(|| format!("loading workflow file {}", config_path.display()))?;
    let workflow = file.workflow()?;

    info!(
        path = %config_path.display(),
        tasks = workflow.len(),
        "loaded workflow"
    );

    match args.command {
        Command::Run {
            set,
            outputs_only,
            json,
        } => {
            let mut inputs = file.inputs();
            apply_assignments(&mut inputs, &set);
            run_workflow(&workflow, inputs, outputs_only, json, out)
        }
        Command::Order => {
            for (position, label) in workflow.topological_order().iter().enumerate() {
                writeln!(out, "{:>3}. {label}", position + 1)?;
            }
            Ok(())
        }
        Command::Indegree => {
            for (label, degree) in workflow.indegrees() {
                writeln!(out, "{label}\t{degree}")?;
            }
            Ok(())
        }
        Command::Graph { format, output } => {
            let format = ExportFormat::from(format);
            match output {
                Some(path) => {
                    let path = export_path(path, format);
                    workflow.write_dependency_graph(&path, format)?;
                    writeln!(out, "wrote {}", path.display())?;
                }
                None => write!(out, "{}", workflow.dependency_graph(format)?)?,
            }
            Ok(())
        }
        Command::Check => {
            writeln!(
                out,
                "ok: {} task(s), order: {}",
                workflow.len(),
                workflow.topological_order().join(" -> ")
            )?;
            Ok(())
        }
    }
}

/// `--output` without an extension gets the format's conventional one.
fn export_path(mut path: PathBuf, format: ExportFormat) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension(format.extension());
    }
    path
}

fn apply_assignments(inputs: &mut Inputs<f64>, assignments: &[Assignment]) {
    for a in assignments {
        debug!(task = %a.task, arg = %a.arg, value = a.value, "input override");
        inputs.set(a.task.as_str(), a.arg.clone(), a.value);
    }
}

fn run_workflow(
    workflow: &Workflow<f64>,
    inputs: Inputs<f64>,
    outputs_only: bool,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let outcome: std::result::Result<Vec<(String, f64)>, ExecutionFailure<f64>> = if outputs_only {
        workflow
            .execute_outputs(inputs)
            .map(|outputs| outputs.into_iter().collect())
    } else {
        workflow.execute(inputs).map(|ctx| {
            ctx.results()
                .map(|(label, v)| (label.to_string(), *v))
                .collect()
        })
    };
    let results = outcome.map_err(report_partial)?;

    if json {
        let map: BTreeMap<String, f64> = results.into_iter().collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&map)?)?;
    } else {
        for (label, v) in results {
            writeln!(out, "{label} = {v}")?;
        }
    }

    Ok(())
}

/// Print what a failed run computed before it stopped, and keep the error.
fn report_partial(failure: ExecutionFailure<f64>) -> anyhow::Error {
    if !failure.context.completed().is_empty() {
        eprintln!("partial results before failure:");
        for (label, v) in failure.context.results() {
            eprintln!("  {label} = {v}");
        }
    }
    failure.into_error().into()
}
