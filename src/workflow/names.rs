// src/workflow/names.rs

//! Bidirectional association between task handles and identifiers.

use std::collections::HashMap;

use crate::errors::{Result, WorkflowError};
use crate::task::{TaskId, TaskRef};

/// Optional human-readable identifiers for tasks.
///
/// Identifiers are for display, error messages and keyed lookups only; they
/// never change how a workflow executes.
#[derive(Debug, Clone, Default)]
pub struct Identifiers {
    by_name: HashMap<String, TaskId>,
    /// Every registered handle with its identifier, indexed by handle.
    by_task: Vec<(TaskId, Option<String>)>,
}

impl Identifiers {
    /// Record the identifier (if any) of a freshly registered task.
    ///
    /// Handles must be registered in order, which the builder guarantees.
    pub fn register(&mut self, task: TaskId, name: Option<String>) -> Result<()> {
        debug_assert_eq!(task.index(), self.by_task.len());

        if let Some(ref name) = name {
            validate_identifier(name)?;
            if self.by_name.contains_key(name) {
                return Err(WorkflowError::DuplicateIdentifier(name.clone()));
            }
            self.by_name.insert(name.clone(), task);
        }
        self.by_task.push((task, name));
        Ok(())
    }

    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, task: TaskId) -> Option<&str> {
        self.entry(task).and_then(|(_, n)| n.as_deref())
    }

    fn entry(&self, task: TaskId) -> Option<&(TaskId, Option<String>)> {
        self.by_task.get(task.index()).filter(|(id, _)| *id == task)
    }

    /// Identifier of `task`, or `#<index>` for anonymous tasks.
    pub fn label(&self, task: TaskId) -> String {
        match self.name_of(task) {
            Some(name) => name.to_string(),
            None => task.to_string(),
        }
    }

    /// Labels of every registered task, indexed by handle.
    pub fn labels(&self) -> Vec<String> {
        self.by_task.iter().map(|(id, _)| self.label(*id)).collect()
    }

    /// Resolve a reference to a registered handle.
    ///
    /// Names resolve through the identifier map; `#<index>` resolves to the
    /// anonymous task it labels. Handles must come from this workflow.
    pub fn resolve(&self, task: &TaskRef) -> Option<TaskId> {
        match task {
            TaskRef::Id(id) => self.entry(*id).map(|(id, _)| *id),
            TaskRef::Name(name) => self.id_of(name).or_else(|| self.anonymous(name)),
        }
    }

    fn anonymous(&self, label: &str) -> Option<TaskId> {
        let index: usize = label.strip_prefix('#')?.parse().ok()?;
        match self.by_task.get(index) {
            Some((id, None)) => Some(*id),
            _ => None,
        }
    }
}

/// Identifiers must be non-empty and must not look like an anonymous label.
fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(WorkflowError::InvalidIdentifier(name.to_string()));
    }
    if name.starts_with('#') {
        return Err(WorkflowError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}
