// src/task.rs

//! The task abstraction.
//!
//! A task is an opaque unit of computation with a single entry point,
//! [`Task::run`]. The executor never looks inside a task: it hands it the
//! results of its upstream tasks as positional arguments plus the named
//! argument bundle supplied for it at run time, and stores whatever comes back.
//!
//! Tasks are assumed to be stateless between runs. A frozen workflow may be
//! executed any number of times and each run expects the same task to behave
//! the same way for the same arguments.

use std::collections::BTreeMap;
use std::fmt;

/// Named arguments passed to a task for a single run.
pub type Kwargs<V> = BTreeMap<String, V>;

/// Result of a single task invocation.
pub type TaskResult<V> = anyhow::Result<V>;

/// Something the workflow can run.
///
/// `args` holds the results of the declared upstream tasks, in the order
/// they were declared for this task. `kwargs` holds the run-time bundle for
/// this task, or is empty when none was supplied.
pub trait Task<V>: Send + Sync {
    fn run(&self, args: &[V], kwargs: &Kwargs<V>) -> TaskResult<V>;

    /// Short human-readable description, used only in logs.
    fn describe(&self) -> &str {
        "task"
    }
}

impl<V, F> Task<V> for F
where
    F: Fn(&[V], &Kwargs<V>) -> TaskResult<V> + Send + Sync,
{
    fn run(&self, args: &[V], kwargs: &Kwargs<V>) -> TaskResult<V> {
        (self)(args, kwargs)
    }

    fn describe(&self) -> &str {
        "fn"
    }
}

/// Stable handle of a task inside one workflow.
///
/// Handles are indices into the workflow's task arena and follow the order in
/// which tasks were registered. Each handle is stamped with the graph that
/// issued it, so a handle from another builder is rejected instead of being
/// taken for the local task at the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId {
    graph: u32,
    index: usize,
}

impl TaskId {
    pub(crate) fn new(graph: u32, index: usize) -> Self {
        Self { graph, index }
    }

    /// Position of the task in registration order.
    pub fn index(self) -> usize {
        self.index
    }

    pub(crate) fn graph(self) -> u32 {
        self.graph
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// A reference to a task, either by handle or by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskRef {
    Id(TaskId),
    Name(String),
}

impl From<TaskId> for TaskRef {
    fn from(id: TaskId) -> Self {
        TaskRef::Id(id)
    }
}

impl From<&TaskId> for TaskRef {
    fn from(id: &TaskId) -> Self {
        TaskRef::Id(*id)
    }
}

impl From<&str> for TaskRef {
    fn from(name: &str) -> Self {
        TaskRef::Name(name.to_string())
    }
}

impl From<String> for TaskRef {
    fn from(name: String) -> Self {
        TaskRef::Name(name)
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Id(id) => write!(f, "{id}"),
            TaskRef::Name(name) => f.write_str(name),
        }
    }
}
