// src/workflow/builder.rs

//! Construction of workflows.
//!
//! [`WorkflowBuilder`] is the mutable, `Building` side of a workflow: tasks
//! are registered, optionally named, and wired together. Calling
//! [`WorkflowBuilder::build`] validates the graph and freezes it into a
//! [`Workflow`], which has no mutating operations left.

use tracing::{debug, warn};

use crate::dag::{Graph, GraphError};
use crate::errors::{Result, WorkflowError};
use crate::task::{Task, TaskId, TaskRef};
use crate::workflow::Workflow;
use crate::workflow::names::Identifiers;

pub struct WorkflowBuilder<V> {
    tasks: Vec<Box<dyn Task<V>>>,
    graph: Graph,
    names: Identifiers,
}

impl<V> Default for WorkflowBuilder<V> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            graph: Graph::new(),
            names: Identifiers::default(),
        }
    }
}

impl<V> std::fmt::Debug for WorkflowBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowBuilder")
            .field("graph", &self.graph)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl<V: 'static> WorkflowBuilder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a strictly linear chain: every task's sole upstream is the one
    /// before it, and the first task is the only source.
    pub fn linear<I>(tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = Box<dyn Task<V>>>,
    {
        Self::linear_inner(tasks.into_iter().map(|task| (None, task)))
    }

    /// Like [`WorkflowBuilder::linear`], naming every task.
    pub fn linear_named<S, I>(tasks: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Box<dyn Task<V>>)>,
    {
        Self::linear_inner(tasks.into_iter().map(|(name, task)| (Some(name.into()), task)))
    }

    fn linear_inner<I>(tasks: I) -> Result<Self>
    where
        I: Iterator<Item = (Option<String>, Box<dyn Task<V>>)>,
    {
        let mut builder = Self::new();
        let mut previous: Option<TaskId> = None;

        for (name, task) in tasks {
            let id = builder.register(name, task)?;
            let upstream: Vec<TaskId> = previous.into_iter().collect();
            builder.add_dependency(id, &upstream)?;
            previous = Some(id);
        }

        Ok(builder)
    }

    /// Register an anonymous task. It starts out as a source task.
    pub fn add_task(&mut self, task: impl Task<V> + 'static) -> TaskId {
        self.add_boxed_task(Box::new(task))
    }

    pub fn add_boxed_task(&mut self, task: Box<dyn Task<V>>) -> TaskId {
        let id = self.graph.next_id();
        // Anonymous registration cannot collide with anything.
        let _ = self.names.register(id, None);
        self.push(id, task)
    }

    /// Register a task under a unique identifier.
    pub fn add_named_task(
        &mut self,
        name: impl Into<String>,
        task: impl Task<V> + 'static,
    ) -> Result<TaskId> {
        self.register(Some(name.into()), Box::new(task))
    }

    fn register(&mut self, name: Option<String>, task: Box<dyn Task<V>>) -> Result<TaskId> {
        let id = self.graph.next_id();
        self.names.register(id, name)?;
        Ok(self.push(id, task))
    }

    fn push(&mut self, id: TaskId, task: Box<dyn Task<V>>) -> TaskId {
        let added = self.graph.add_node();
        debug_assert_eq!(id, added);
        debug!(task = %self.names.label(id), kind = task.describe(), "registered task");
        self.tasks.push(task);
        id
    }

    /// Declare the ordered upstream tasks of `task`. Their results become its
    /// positional arguments, in this order.
    ///
    /// A task's inputs can be declared only once.
    pub fn add_dependency(&mut self, task: TaskId, upstream: &[TaskId]) -> Result<()> {
        self.graph
            .add_dependency(task, upstream)
            .map_err(|e| self.label_error(e))
    }

    /// Declare several dependencies at once, in the given order.
    pub fn with_dependencies<I, U>(mut self, dependencies: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TaskId, U)>,
        U: AsRef<[TaskId]>,
    {
        for (task, upstream) in dependencies {
            self.add_dependency(task, upstream.as_ref())?;
        }
        Ok(self)
    }

    /// [`WorkflowBuilder::add_dependency`] using identifiers or `#<index>`
    /// labels.
    pub fn add_dependency_by_name(&mut self, task: &str, upstream: &[&str]) -> Result<()> {
        let id = self
            .names
            .resolve(&TaskRef::from(task))
            .ok_or_else(|| WorkflowError::UnknownTask(task.to_string()))?;

        let mut resolved = Vec::with_capacity(upstream.len());
        for up in upstream {
            let up_id = self
                .names
                .resolve(&TaskRef::from(*up))
                .ok_or_else(|| WorkflowError::UnknownUpstream {
                    task: task.to_string(),
                    upstream: up.to_string(),
                })?;
            resolved.push(up_id);
        }

        self.add_dependency(id, &resolved)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The graph as declared so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.names.id_of(name)
    }

    /// Freeze the builder into a [`Workflow`].
    ///
    /// The topological order is computed here, once; a cycle is reported
    /// before anything can run.
    pub fn build(self) -> Result<Workflow<V>> {
        let order = match self.graph.topological_order() {
            Ok(order) => order,
            Err(e) => {
                let err = self.label_error(e);
                warn!(error = %err, "refusing to freeze workflow");
                return Err(err);
            }
        };

        debug!(tasks = order.len(), "workflow frozen");
        Ok(Workflow::from_parts(self.tasks, self.graph, self.names, order))
    }

    fn label_error(&self, err: GraphError) -> WorkflowError {
        let label = |t: TaskId| self.names.label(t);
        match err {
            GraphError::DuplicateTask(t) => WorkflowError::DuplicateTask(label(t)),
            GraphError::UnknownTask(t) => WorkflowError::UnknownTask(label(t)),
            GraphError::UnknownUpstream { task, upstream } => WorkflowError::UnknownUpstream {
                task: label(task),
                upstream: label(upstream),
            },
            GraphError::Cycle { task, cycle } => WorkflowError::Cycle {
                task: label(task),
                cycle: cycle.into_iter().map(label).collect(),
            },
        }
    }
}

impl<V: 'static> TryFrom<WorkflowBuilder<V>> for Workflow<V> {
    type Error = WorkflowError;

    fn try_from(builder: WorkflowBuilder<V>) -> std::result::Result<Self, Self::Error> {
        builder.build()
    }
}
