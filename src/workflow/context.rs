// src/workflow/context.rs

//! Per-run state: the run's input bundles and every task's result.

use std::collections::BTreeMap;

use crate::task::{Kwargs, TaskId, TaskRef};

/// Run-time argument bundles, keyed by task handle or identifier.
///
/// A bundle is required for every source task and optional for the rest.
/// Several bundles for the same task are merged, later values winning.
#[derive(Debug, Clone)]
pub struct Inputs<V> {
    entries: Vec<(TaskRef, Kwargs<V>)>,
}

impl<V> Default for Inputs<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Inputs<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle for `task`.
    pub fn with<K, I>(mut self, task: impl Into<TaskRef>, args: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.insert(task, args.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    /// Add a bundle for `task`.
    pub fn insert(&mut self, task: impl Into<TaskRef>, args: Kwargs<V>) {
        self.entries.push((task.into(), args));
    }

    /// Set a single named argument for `task`.
    pub fn set(&mut self, task: impl Into<TaskRef>, name: impl Into<String>, value: V) {
        let mut args = Kwargs::new();
        args.insert(name.into(), value);
        self.insert(task, args);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(TaskRef, Kwargs<V>)> {
        self.entries
    }
}

impl<V> FromIterator<(TaskRef, Kwargs<V>)> for Inputs<V> {
    fn from_iter<I: IntoIterator<Item = (TaskRef, Kwargs<V>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// State of one task within a run.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState<V> {
    /// Not (yet) invoked in this run.
    Pending,
    Computed(V),
    /// The invocation failed; holds the rendered error.
    Failed(String),
}

impl<V> TaskState<V> {
    pub fn value(&self) -> Option<&V> {
        match self {
            TaskState::Computed(v) => Some(v),
            _ => None,
        }
    }
}

/// Everything a single `execute` call knows about its run.
///
/// A context is created fresh for every run and handed back to the caller,
/// complete on success or partial on failure. It is never reused.
#[derive(Debug, Clone)]
pub struct ExecutionContext<V> {
    ids: Vec<TaskId>,
    labels: Vec<String>,
    inputs: Vec<Option<Kwargs<V>>>,
    states: Vec<TaskState<V>>,
    /// Tasks that produced a result, in the order they ran.
    completed: Vec<TaskId>,
}

impl<V> ExecutionContext<V> {
    /// `ids` and `labels` are both indexed by handle.
    pub(crate) fn new(ids: Vec<TaskId>, labels: Vec<String>) -> Self {
        debug_assert_eq!(ids.len(), labels.len());
        let len = labels.len();
        Self {
            ids,
            labels,
            inputs: (0..len).map(|_| None).collect(),
            states: (0..len).map(|_| TaskState::Pending).collect(),
            completed: Vec::new(),
        }
    }

    pub(crate) fn merge_inputs(&mut self, task: TaskId, args: Kwargs<V>) {
        self.inputs[task.index()]
            .get_or_insert_with(Kwargs::new)
            .extend(args);
    }

    pub(crate) fn record_success(&mut self, task: TaskId, value: V) {
        self.states[task.index()] = TaskState::Computed(value);
        self.completed.push(task);
    }

    pub(crate) fn record_failure(&mut self, task: TaskId, error: String) {
        self.states[task.index()] = TaskState::Failed(error);
    }

    fn position(&self, task: &TaskRef) -> Option<usize> {
        match task {
            TaskRef::Id(id) => (self.ids.get(id.index()) == Some(id)).then_some(id.index()),
            TaskRef::Name(name) => self.labels.iter().position(|l| l == name),
        }
    }

    /// State of a task, by handle or label.
    pub fn state(&self, task: impl Into<TaskRef>) -> Option<&TaskState<V>> {
        let i = self.position(&task.into())?;
        self.states.get(i)
    }

    /// Result of a task, if it was computed in this run.
    pub fn get(&self, task: impl Into<TaskRef>) -> Option<&V> {
        self.state(task).and_then(TaskState::value)
    }

    /// The bundle supplied for a task in this run, after merging.
    pub fn inputs_for(&self, task: impl Into<TaskRef>) -> Option<&Kwargs<V>> {
        let i = self.position(&task.into())?;
        self.inputs.get(i).and_then(Option::as_ref)
    }

    /// Handles of the tasks that completed, in run order.
    pub fn completed(&self) -> &[TaskId] {
        &self.completed
    }

    /// Labels of the tasks that completed, in run order.
    pub fn completed_labels(&self) -> Vec<String> {
        self.completed
            .iter()
            .map(|t| self.labels[t.index()].clone())
            .collect()
    }

    /// Whether every task of the workflow produced a result.
    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.states.len()
    }

    /// `(label, result)` for every completed task, in run order.
    pub fn results(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.completed.iter().filter_map(|t| {
            let value = self.states[t.index()].value()?;
            Some((self.labels[t.index()].as_str(), value))
        })
    }

    /// Consume the context into a `label -> result` map.
    pub fn into_results(self) -> BTreeMap<String, V> {
        self.labels
            .into_iter()
            .zip(self.states)
            .filter_map(|(label, state)| match state {
                TaskState::Computed(v) => Some((label, v)),
                _ => None,
            })
            .collect()
    }
}
