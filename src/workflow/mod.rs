// src/workflow/mod.rs

//! Workflows: a frozen task graph plus the tasks it runs.
//!
//! - [`builder`] is the construction side (`Building` state).
//! - [`Workflow`] is the frozen side: introspection and export here,
//!   execution in [`executor`].
//! - [`context`] holds the per-run inputs and results.
//! - [`names`] maps task handles to optional identifiers.
//!
//! A frozen workflow is never mutated. Every `execute` call works on its own
//! [`ExecutionContext`], so runs are independent of each other. Tasks are
//! expected to be stateless between runs; the workflow does not guard
//! against tasks that keep internal state.

pub mod builder;
pub mod context;
pub mod executor;
pub mod names;

use std::path::Path;

use tracing::info;

use crate::dag::{ExportFormat, Graph, export};
use crate::errors::Result;
use crate::task::{Task, TaskId, TaskRef};

pub use builder::WorkflowBuilder;
pub use context::{ExecutionContext, Inputs, TaskState};
pub use executor::ExecutionFailure;
pub use names::Identifiers;

pub struct Workflow<V> {
    tasks: Vec<Box<dyn Task<V>>>,
    graph: Graph,
    names: Identifiers,
    /// Topological order, computed once when the workflow was frozen.
    order: Vec<TaskId>,
}

impl<V> std::fmt::Debug for Workflow<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("graph", &self.graph)
            .field("names", &self.names)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl<V: 'static> Workflow<V> {
    pub fn builder() -> WorkflowBuilder<V> {
        WorkflowBuilder::new()
    }

    /// Build and freeze a linear chain of tasks.
    pub fn linear<I>(tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = Box<dyn Task<V>>>,
    {
        WorkflowBuilder::linear(tasks)?.build()
    }

    /// Build and freeze a linear chain of named tasks.
    pub fn linear_named<S, I>(tasks: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Box<dyn Task<V>>)>,
    {
        WorkflowBuilder::linear_named(tasks)?.build()
    }
}

impl<V> Workflow<V> {
    pub(crate) fn from_parts(
        tasks: Vec<Box<dyn Task<V>>>,
        graph: Graph,
        names: Identifiers,
        order: Vec<TaskId>,
    ) -> Self {
        Self {
            tasks,
            graph,
            names,
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Handle of the task with the given identifier.
    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.names.id_of(name)
    }

    /// Identifier of `task`, or `#<index>` for anonymous tasks.
    pub fn label_of(&self, task: TaskId) -> String {
        self.names.label(task)
    }

    pub fn resolve(&self, task: impl Into<TaskRef>) -> Option<TaskId> {
        self.names.resolve(&task.into())
    }

    /// Execution order as handles.
    pub fn order(&self) -> &[TaskId] {
        &self.order
    }

    /// Execution order as labels.
    pub fn topological_order(&self) -> Vec<String> {
        self.order.iter().map(|t| self.label_of(*t)).collect()
    }

    /// Number of distinct upstream tasks of `task`.
    pub fn indegree(&self, task: impl Into<TaskRef>) -> Option<usize> {
        self.resolve(task).map(|t| self.graph.indegree(t))
    }

    /// `(label, indegree)` for every task, in declaration order.
    pub fn indegrees(&self) -> Vec<(String, usize)> {
        self.graph
            .tasks()
            .map(|t| (self.label_of(t), self.graph.indegree(t)))
            .collect()
    }

    /// Tasks that need a run-time input bundle.
    pub fn sources(&self) -> Vec<TaskId> {
        self.graph.sources().collect()
    }

    /// Tasks no other task consumes.
    pub fn terminals(&self) -> Vec<TaskId> {
        self.graph.terminals().collect()
    }

    /// Structural export of the graph.
    pub fn dependency_graph(&self, format: ExportFormat) -> Result<String> {
        export(&self.graph, |t| self.label_of(t), format)
    }

    /// Write [`Workflow::dependency_graph`] to `path`.
    pub fn write_dependency_graph(&self, path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
        let path = path.as_ref();
        let rendered = self.dependency_graph(format)?;
        std::fs::write(path, rendered)?;
        info!(path = %path.display(), ?format, "wrote dependency graph");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WorkflowError;
    use crate::task::{Kwargs, TaskResult};

    fn noop(_: &[i64], _: &Kwargs<i64>) -> TaskResult<i64> {
        Ok(0)
    }

    #[test]
    fn linear_chain_wires_predecessors() {
        let tasks: Vec<(&str, Box<dyn Task<i64>>)> = vec![
            ("A", Box::new(noop) as Box<dyn Task<i64>>),
            ("B", Box::new(noop) as Box<dyn Task<i64>>),
            ("C", Box::new(noop) as Box<dyn Task<i64>>),
        ];
        let wf = Workflow::linear_named(tasks).unwrap();

        let a = wf.id_of("A").unwrap();
        let b = wf.id_of("B").unwrap();
        let c = wf.id_of("C").unwrap();
        assert!(wf.graph().dependencies_of(a).is_empty());
        assert_eq!(wf.graph().dependencies_of(b), &[a]);
        assert_eq!(wf.graph().dependencies_of(c), &[b]);
        assert_eq!(wf.topological_order(), vec!["A", "B", "C"]);
        assert_eq!(wf.sources(), vec![a]);
        assert_eq!(wf.terminals(), vec![c]);
    }

    #[test]
    fn build_reports_labelled_cycle() {
        let mut builder = Workflow::<i64>::builder();
        let a = builder.add_named_task("A", noop).unwrap();
        let b = builder.add_named_task("B", noop).unwrap();
        builder.add_dependency(a, &[b]).unwrap();
        builder.add_dependency(b, &[a]).unwrap();

        match builder.build() {
            Err(WorkflowError::Cycle { task, cycle }) => {
                assert_eq!(task, "A");
                assert_eq!(cycle, vec!["A", "B", "A"]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn indegrees_in_declaration_order() {
        let mut builder = Workflow::<i64>::builder();
        let a = builder.add_named_task("A", noop).unwrap();
        let b = builder.add_task(noop);
        let m = builder.add_named_task("M", noop).unwrap();
        builder.add_dependency(m, &[a, b]).unwrap();
        let wf = builder.build().unwrap();

        assert_eq!(
            wf.indegrees(),
            vec![("A".to_string(), 0), ("#1".to_string(), 0), ("M".to_string(), 2)]
        );
        assert_eq!(wf.indegree("M"), Some(2));
        assert_eq!(wf.indegree("nope"), None);
    }

    #[test]
    fn writes_export_to_disk() {
        let wf = Workflow::linear_named(vec![
            ("load", Box::new(noop) as Box<dyn Task<i64>>),
            ("report", Box::new(noop) as Box<dyn Task<i64>>),
        ])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        wf.write_dependency_graph(&path, ExportFormat::Json).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"report\""));
    }
}
