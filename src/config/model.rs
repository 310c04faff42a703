// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::Result;
use crate::ops::{Op, OpKind};
use crate::workflow::{Inputs, Workflow, WorkflowBuilder};

/// Workflow file as read from TOML, before validation.
///
/// ```toml
/// [[task]]
/// name = "A"
/// kind = "value"
///
/// [[task]]
/// name = "B"
/// kind = "value"
///
/// [[task]]
/// name = "M"
/// kind = "multiply"
/// after = ["A", "B"]
///
/// [inputs.A]
/// value = 5
///
/// [inputs.B]
/// value = 3
/// ```
///
/// Tasks are an array of tables so that their order in the file is the
/// declaration order of the workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowFile {
    #[serde(default)]
    pub task: Vec<TaskConfig>,

    /// Default run inputs from `[inputs.<task>]`, keyed by task name.
    #[serde(default)]
    pub inputs: BTreeMap<String, BTreeMap<String, f64>>,
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Unique identifier of the task.
    pub name: String,

    pub kind: OpKind,

    /// Upstream tasks, in argument order.
    #[serde(default)]
    pub after: Vec<String>,

    /// Only for `kind = "add_constant"`.
    #[serde(default)]
    pub constant: Option<f64>,
}

impl TaskConfig {
    /// The built-in op this entry describes. Assumes a validated entry.
    pub fn op(&self) -> Op {
        match self.kind {
            OpKind::Value => Op::Value,
            OpKind::Multiply => Op::Multiply,
            OpKind::Sum => Op::Sum,
            OpKind::AddConstant => Op::AddConstant(self.constant.unwrap_or(0.0)),
        }
    }
}

/// A validated workflow file. Obtain one with `WorkflowFile::try_from`.
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    tasks: Vec<TaskConfig>,
    inputs: BTreeMap<String, BTreeMap<String, f64>>,
}

impl WorkflowFile {
    pub(crate) fn new_unchecked(
        tasks: Vec<TaskConfig>,
        inputs: BTreeMap<String, BTreeMap<String, f64>>,
    ) -> Self {
        Self { tasks, inputs }
    }

    pub fn tasks(&self) -> &[TaskConfig] {
        &self.tasks
    }

    /// Construct (but do not freeze) the workflow described by this file.
    pub fn to_builder(&self) -> Result<WorkflowBuilder<f64>> {
        to_builder(&self.tasks)
    }

    /// Construct and freeze the workflow described by this file.
    pub fn workflow(&self) -> Result<Workflow<f64>> {
        self.to_builder()?.build()
    }

    /// Run inputs declared in the file.
    pub fn inputs(&self) -> Inputs<f64> {
        self.inputs
            .iter()
            .map(|(task, args)| (task.as_str().into(), args.clone()))
            .collect()
    }
}

/// Register every task first, in file order, then wire dependencies by name,
/// so `after` may reference tasks declared later in the file.
pub(crate) fn to_builder(tasks: &[TaskConfig]) -> Result<WorkflowBuilder<f64>> {
    let mut builder = WorkflowBuilder::new();

    for task in tasks {
        builder.add_named_task(task.name.clone(), task.op())?;
    }

    for task in tasks {
        let upstream: Vec<&str> = task.after.iter().map(String::as_str).collect();
        builder.add_dependency_by_name(&task.name, &upstream)?;
    }

    Ok(builder)
}
