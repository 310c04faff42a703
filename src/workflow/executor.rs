// src/workflow/executor.rs

//! Single-pass, single-threaded execution of a frozen workflow.
//!
//! Tasks run one at a time in the order fixed when the workflow was frozen.
//! For each task the arguments are bound as follows:
//!
//! 1. positional: the results of its declared upstream tasks, in the order
//!    they were declared for that task (a binary task declared with
//!    `[left, right]` receives `(left, right)`);
//! 2. named: the run-time bundle supplied for that task, if any.
//!
//! A source task with no bundle is a configuration error. The first failure
//! stops the run; nothing scheduled after it is invoked, and nothing that
//! already ran is undone.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::errors::WorkflowError;
use crate::task::{Kwargs, TaskId};
use crate::workflow::Workflow;
use crate::workflow::context::{ExecutionContext, Inputs};

/// A failed run: what went wrong, plus everything the run computed before it
/// stopped.
#[derive(Debug)]
pub struct ExecutionFailure<V> {
    pub error: WorkflowError,
    pub context: ExecutionContext<V>,
}

impl<V> ExecutionFailure<V> {
    fn new(error: WorkflowError, context: ExecutionContext<V>) -> Self {
        Self { error, context }
    }

    /// Drop the partial context and keep the error.
    pub fn into_error(self) -> WorkflowError {
        self.error
    }
}

impl<V> fmt::Display for ExecutionFailure<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl<V: fmt::Debug> std::error::Error for ExecutionFailure<V> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<V> From<ExecutionFailure<V>> for WorkflowError {
    fn from(failure: ExecutionFailure<V>) -> Self {
        failure.error
    }
}

impl<V: Clone> Workflow<V> {
    /// Run every task once and return the full context.
    ///
    /// `inputs` may be keyed by handle or identifier. A key that names no task
    /// of this workflow fails the run before any task is invoked.
    pub fn execute(&self, inputs: Inputs<V>) -> Result<ExecutionContext<V>, ExecutionFailure<V>> {
        let mut ctx = ExecutionContext::new(self.graph.tasks().collect(), self.names.labels());

        for (key, args) in inputs.into_entries() {
            match self.names.resolve(&key) {
                Some(task) => ctx.merge_inputs(task, args),
                None => {
                    warn!(task = %key, "input bundle for unknown task");
                    return Err(ExecutionFailure::new(
                        WorkflowError::UnknownTask(key.to_string()),
                        ctx,
                    ));
                }
            }
        }

        info!(tasks = self.order.len(), "starting workflow run");

        for &task in &self.order {
            if let Err(error) = self.run_one(task, &mut ctx) {
                warn!(
                    task = %self.label_of(task),
                    completed = ctx.completed().len(),
                    error = %error,
                    "workflow run aborted"
                );
                return Err(ExecutionFailure::new(error, ctx));
            }
        }

        info!(tasks = self.order.len(), "workflow run finished");
        Ok(ctx)
    }

    /// Run every task once and return only the results of terminal tasks,
    /// keyed by label.
    pub fn execute_outputs(
        &self,
        inputs: Inputs<V>,
    ) -> Result<BTreeMap<String, V>, ExecutionFailure<V>> {
        let ctx = self.execute(inputs)?;
        let terminals = self.terminals();

        Ok(terminals
            .into_iter()
            .filter_map(|t| ctx.get(t).cloned().map(|v| (self.label_of(t), v)))
            .collect())
    }

    fn run_one(&self, task: TaskId, ctx: &mut ExecutionContext<V>) -> Result<(), WorkflowError> {
        let label = self.label_of(task);
        let upstream = self.graph.dependencies_of(task);

        if upstream.is_empty() && ctx.inputs_for(task).is_none() {
            return Err(WorkflowError::MissingInput(label));
        }

        let mut args: Vec<V> = Vec::with_capacity(upstream.len());
        for &up in upstream {
            // Topological order guarantees upstream results are present.
            let value = ctx.get(up).cloned().ok_or_else(|| {
                anyhow::anyhow!(
                    "result of '{}' missing while resolving '{}'",
                    self.label_of(up),
                    label
                )
            })?;
            args.push(value);
        }

        let empty = Kwargs::new();
        let kwargs = ctx.inputs_for(task).unwrap_or(&empty);
        let body = &self.tasks[task.index()];

        debug!(
            task = %label,
            kind = body.describe(),
            args = args.len(),
            kwargs = kwargs.len(),
            "running task"
        );

        match body.run(&args, kwargs) {
            Ok(value) => {
                ctx.record_success(task, value);
                Ok(())
            }
            Err(source) => {
                ctx.record_failure(task, format!("{source:#}"));
                Err(WorkflowError::TaskExecution {
                    task: label,
                    completed: ctx.completed_labels(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskResult};
    use crate::workflow::TaskState;

    fn value(_: &[i64], kwargs: &Kwargs<i64>) -> TaskResult<i64> {
        kwargs
            .get("value")
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing 'value' argument"))
    }

    fn subtract(args: &[i64], _: &Kwargs<i64>) -> TaskResult<i64> {
        match args {
            [left, right] => Ok(left - right),
            _ => anyhow::bail!("subtract takes two arguments, got {}", args.len()),
        }
    }

    fn diff_workflow() -> Workflow<i64> {
        let mut b = Workflow::<i64>::builder();
        let l = b.add_named_task("L", value).unwrap();
        let r = b.add_named_task("R", value).unwrap();
        let d = b.add_named_task("D", subtract).unwrap();
        b.add_dependency(d, &[l, r]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn positional_arguments_follow_declared_order() {
        let wf = diff_workflow();
        let inputs = Inputs::new()
            .with("L", [("value", 10)])
            .with("R", [("value", 4)]);

        let ctx = wf.execute(inputs).unwrap();
        assert_eq!(ctx.get("D"), Some(&6));
        assert!(ctx.is_complete());
    }

    #[test]
    fn keyword_overrides_reach_downstream_tasks() {
        let mut b = Workflow::<i64>::builder();
        let x = b.add_named_task("x", value).unwrap();
        let scaled = b
            .add_named_task("scaled", |args: &[i64], kwargs: &Kwargs<i64>| -> TaskResult<i64> {
                Ok(args[0] * kwargs.get("factor").copied().unwrap_or(1))
            })
            .unwrap();
        b.add_dependency(scaled, &[x]).unwrap();
        let wf = b.build().unwrap();

        let plain = wf.execute(Inputs::new().with("x", [("value", 7)])).unwrap();
        assert_eq!(plain.get("scaled"), Some(&7));

        let boosted = wf
            .execute(
                Inputs::new()
                    .with("x", [("value", 7)])
                    .with("scaled", [("factor", 3)]),
            )
            .unwrap();
        assert_eq!(boosted.get("scaled"), Some(&21));
    }

    #[test]
    fn unknown_input_key_fails_before_running() {
        let wf = diff_workflow();
        let failure = wf
            .execute(Inputs::new().with("nope", [("value", 1)]))
            .unwrap_err();

        assert!(matches!(failure.error, WorkflowError::UnknownTask(ref t) if t == "nope"));
        assert!(failure.context.completed().is_empty());
    }

    #[test]
    fn failure_keeps_partial_results() {
        let wf = diff_workflow();
        // R is a source with a bundle lacking "value": it runs and fails.
        let failure = wf
            .execute(
                Inputs::new()
                    .with("L", [("value", 1)])
                    .with("R", [("other", 1)]),
            )
            .unwrap_err();

        match &failure.error {
            WorkflowError::TaskExecution { task, completed, .. } => {
                assert_eq!(task, "R");
                assert_eq!(completed, &vec!["L".to_string()]);
            }
            other => panic!("expected TaskExecution, got {other:?}"),
        }
        assert_eq!(failure.context.get("L"), Some(&1));
        assert!(matches!(failure.context.state("R"), Some(TaskState::Failed(_))));
        assert_eq!(failure.context.state("D"), Some(&TaskState::Pending));
        assert!(failure.to_string().contains("'R'"));
    }

    #[test]
    fn outputs_are_terminal_tasks_only() {
        let wf = diff_workflow();
        let out = wf
            .execute_outputs(
                Inputs::new()
                    .with("L", [("value", 2)])
                    .with("R", [("value", 5)]),
            )
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out["D"], -3);
    }

    #[test]
    fn boxed_tasks_report_their_kind() {
        let task: Box<dyn Task<i64>> = Box::new(value);
        assert_eq!(task.describe(), "fn");
    }
}
