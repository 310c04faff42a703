// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Every variant that concerns a single task carries that task's *label*:
//! its identifier when one was given at construction, otherwise `#<index>`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The inputs of a task were declared more than once.
    #[error("duplicate task: inputs of '{0}' are already declared")]
    DuplicateTask(String),

    /// A dependency references an upstream task that is not part of this graph.
    #[error("unknown upstream: task '{task}' depends on '{upstream}', which is not registered")]
    UnknownUpstream { task: String, upstream: String },

    /// A handle or identifier that does not name a task of this workflow.
    #[error("task not found: {0}")]
    UnknownTask(String),

    /// Two tasks were given the same identifier.
    #[error("duplicate identifier: '{0}' is already used by another task")]
    DuplicateIdentifier(String),

    #[error("invalid identifier '{0}': must be non-empty and must not start with '#'")]
    InvalidIdentifier(String),

    /// No topological order exists.
    #[error("cycle detected in task graph involving task '{task}' ({})", .cycle.join(" -> "))]
    Cycle { task: String, cycle: Vec<String> },

    /// A source task had no argument bundle in the run's inputs.
    #[error("missing input: source task '{0}' has no entry in the run inputs")]
    MissingInput(String),

    /// A task's own invocation failed.
    #[error("task '{task}' failed after {} completed task(s): {source}", .completed.len())]
    TaskExecution {
        task: String,
        /// Labels of the tasks that finished before the failure, in run order.
        completed: Vec<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    /// Label of the task this error is about, if it concerns a single task.
    pub fn task(&self) -> Option<&str> {
        match self {
            WorkflowError::DuplicateTask(task)
            | WorkflowError::UnknownTask(task)
            | WorkflowError::MissingInput(task)
            | WorkflowError::UnknownUpstream { task, .. }
            | WorkflowError::Cycle { task, .. }
            | WorkflowError::TaskExecution { task, .. } => Some(task),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WorkflowError>;
