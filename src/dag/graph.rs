// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;
use tracing::trace;

use crate::task::TaskId;

/// Source of per-graph stamps for task handles.
static NEXT_GRAPH: AtomicU32 = AtomicU32::new(0);

/// Structural errors raised by [`Graph`]. They refer to tasks by handle; the
/// workflow layer turns them into labelled [`crate::errors::WorkflowError`]s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("inputs of task {0} are already declared")]
    DuplicateTask(TaskId),

    #[error("task {task} depends on {upstream}, which is not in the graph")]
    UnknownUpstream { task: TaskId, upstream: TaskId },

    #[error("task {0} is not in the graph")]
    UnknownTask(TaskId),

    /// `cycle` lists the tasks on the cycle in edge order, closing back on
    /// its first element.
    #[error("cycle detected involving task {task}")]
    Cycle { task: TaskId, cycle: Vec<TaskId> },
}

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct Node {
    /// Upstream tasks in declared order. May repeat a task when the same
    /// result is wanted in more than one argument position.
    deps: Vec<TaskId>,
    /// Distinct downstream tasks, in the order their edges were added.
    dependents: Vec<TaskId>,
    /// Position of this node's `add_dependency` call among all calls on the
    /// graph, once declared.
    declared: Option<usize>,
}

/// Dependency graph over task handles.
///
/// Nodes are registered with [`Graph::add_node`] and start out as source
/// tasks. Each node may then have its upstream tasks declared once with
/// [`Graph::add_dependency`]. The order of those calls is the declaration
/// order used to break ties in [`Graph::topological_order`]; nodes that were
/// never declared come after all declared ones, in registration order.
#[derive(Debug, Clone)]
pub struct Graph {
    id: u32,
    nodes: Vec<Node>,
    declarations: usize,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            declarations: 0,
        }
    }

    /// Register a new node with no upstream tasks and return its handle.
    pub fn add_node(&mut self) -> TaskId {
        let id = self.next_id();
        self.nodes.push(Node::default());
        id
    }

    /// Handle the next [`Graph::add_node`] call will return.
    pub(crate) fn next_id(&self) -> TaskId {
        TaskId::new(self.id, self.nodes.len())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `task` was issued by this graph.
    pub fn contains(&self, task: TaskId) -> bool {
        self.slot(task).is_some()
    }

    fn slot(&self, task: TaskId) -> Option<usize> {
        (task.graph() == self.id && task.index() < self.nodes.len()).then_some(task.index())
    }

    fn node(&self, task: TaskId) -> Option<&Node> {
        self.slot(task).map(|i| &self.nodes[i])
    }

    /// All nodes in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        let id = self.id;
        (0..self.nodes.len()).map(move |i| TaskId::new(id, i))
    }

    /// Declare the ordered upstream tasks of `task`.
    ///
    /// Fails if `task` is unknown, if its inputs were already declared (even
    /// as an empty list), or if any upstream task is not in the graph. On
    /// failure the graph is left untouched.
    pub fn add_dependency(&mut self, task: TaskId, upstream: &[TaskId]) -> Result<(), GraphError> {
        let Some(slot) = self.slot(task) else {
            return Err(GraphError::UnknownTask(task));
        };
        if self.nodes[slot].declared.is_some() {
            return Err(GraphError::DuplicateTask(task));
        }
        if let Some(&missing) = upstream.iter().find(|up| !self.contains(**up)) {
            return Err(GraphError::UnknownUpstream {
                task,
                upstream: missing,
            });
        }

        for up in distinct(upstream) {
            self.nodes[up.index()].dependents.push(task);
        }

        let node = &mut self.nodes[slot];
        node.deps = upstream.to_vec();
        node.declared = Some(self.declarations);
        self.declarations += 1;

        trace!(%task, upstream = upstream.len(), "declared dependency");
        Ok(())
    }

    /// Whether the inputs of `task` were declared with [`Graph::add_dependency`].
    pub fn is_declared(&self, task: TaskId) -> bool {
        self.node(task).is_some_and(|n| n.declared.is_some())
    }

    /// Immediate dependencies of a task, in declared order.
    pub fn dependencies_of(&self, task: TaskId) -> &[TaskId] {
        self.node(task).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, task: TaskId) -> &[TaskId] {
        self.node(task)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Number of distinct upstream tasks feeding `task`.
    pub fn indegree(&self, task: TaskId) -> usize {
        distinct(self.dependencies_of(task)).len()
    }

    /// Number of distinct downstream tasks consuming `task`.
    pub fn outdegree(&self, task: TaskId) -> usize {
        self.dependents_of(task).len()
    }

    /// Tasks with no upstream, in registration order.
    pub fn sources(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks().filter(|t| self.dependencies_of(*t).is_empty())
    }

    /// Tasks with no downstream consumer, in registration order.
    pub fn terminals(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks().filter(|t| self.dependents_of(*t).is_empty())
    }

    /// Distinct `(upstream, downstream)` edges, grouped by downstream task in
    /// registration order.
    pub fn edges(&self) -> impl Iterator<Item = (TaskId, TaskId)> + '_ {
        self.tasks().flat_map(move |task| {
            distinct(self.dependencies_of(task))
                .into_iter()
                .map(move |up| (up, task))
        })
    }

    /// Tie-break key: declaration position, then registration position.
    fn rank(&self, slot: usize) -> (usize, usize) {
        (self.nodes[slot].declared.unwrap_or(usize::MAX), slot)
    }

    /// Order all tasks so that every task comes after its upstream tasks.
    ///
    /// Kahn's algorithm over distinct edges. Among tasks whose dependencies
    /// are all met, the one whose `add_dependency` call came first runs
    /// first, so the result is reproducible for the same construction
    /// sequence.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, GraphError> {
        let mut remaining: Vec<usize> = self.tasks().map(|t| self.indegree(t)).collect();
        let mut ready: BTreeSet<(usize, usize)> = (0..self.nodes.len())
            .filter(|&i| remaining[i] == 0)
            .map(|i| self.rank(i))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some((_, slot)) = ready.pop_first() {
            let task = TaskId::new(self.id, slot);
            order.push(task);
            for &next in self.dependents_of(task) {
                let n = next.index();
                remaining[n] -= 1;
                if remaining[n] == 0 {
                    ready.insert(self.rank(n));
                }
            }
        }

        if order.len() == self.nodes.len() {
            return Ok(order);
        }

        let cycle = self.find_cycle(&remaining);
        Err(GraphError::Cycle {
            task: cycle[0],
            cycle,
        })
    }

    /// Whether the graph admits a topological order.
    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_ok()
    }

    /// Recover one cycle from the nodes Kahn's algorithm could not emit.
    ///
    /// Every unemitted node still waits on at least one unemitted upstream, so
    /// walking upstream through unemitted nodes must revisit a node.
    fn find_cycle(&self, remaining: &[usize]) -> Vec<TaskId> {
        let stuck = |t: &TaskId| remaining[t.index()] > 0;

        let mut current = match self.tasks().find(stuck) {
            Some(task) => task,
            None => return Vec::new(),
        };
        let mut path: Vec<TaskId> = Vec::new();
        let mut seen: HashMap<TaskId, usize> = HashMap::new();

        loop {
            if let Some(&start) = seen.get(&current) {
                path.drain(..start);
                break;
            }
            seen.insert(current, path.len());
            path.push(current);

            match self.dependencies_of(current).iter().copied().find(stuck) {
                Some(up) => current = up,
                None => break,
            }
        }

        // The walk went downstream -> upstream; report edges in their own
        // direction, starting from the earliest declared task on the cycle.
        path.reverse();
        if let Some(min_pos) = path
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| self.rank(t.index()))
            .map(|(i, _)| i)
        {
            path.rotate_left(min_pos);
        }
        if let Some(&first) = path.first() {
            path.push(first);
        }
        path
    }
}

/// Deduplicate while keeping first-occurrence order.
fn distinct(tasks: &[TaskId]) -> Vec<TaskId> {
    let mut out: Vec<TaskId> = Vec::with_capacity(tasks.len());
    for &t in tasks {
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(n: usize) -> (Graph, Vec<TaskId>) {
        let mut g = Graph::new();
        let ids = (0..n).map(|_| g.add_node()).collect();
        (g, ids)
    }

    #[test]
    fn test_topological_sort_linear() {
        let (mut g, t) = graph_with(3);
        g.add_dependency(t[2], &[t[1]]).unwrap();
        g.add_dependency(t[1], &[t[0]]).unwrap();

        assert_eq!(g.topological_order().unwrap(), vec![t[0], t[1], t[2]]);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        // Diamond: 0 -> {1, 2} -> 3, plus an unrelated source 4. 2 is
        // declared before 1, so it wins the tie once 0 has run.
        let (mut g, t) = graph_with(5);
        g.add_dependency(t[3], &[t[2], t[1]]).unwrap();
        g.add_dependency(t[2], &[t[0]]).unwrap();
        g.add_dependency(t[1], &[t[0]]).unwrap();

        let order = g.topological_order().unwrap();
        assert_eq!(order, vec![t[0], t[2], t[1], t[3], t[4]]);
        assert_eq!(order, g.topological_order().unwrap());
    }

    #[test]
    fn test_declared_sources_follow_call_order() {
        let (mut g, t) = graph_with(2);
        g.add_dependency(t[1], &[]).unwrap();
        g.add_dependency(t[0], &[]).unwrap();

        assert_eq!(g.topological_order().unwrap(), vec![t[1], t[0]]);
    }

    #[test]
    fn test_undeclared_nodes_come_last() {
        let (mut g, t) = graph_with(3);
        g.add_dependency(t[2], &[]).unwrap();

        assert_eq!(g.topological_order().unwrap(), vec![t[2], t[0], t[1]]);
        assert!(g.is_declared(t[2]));
        assert!(!g.is_declared(t[0]));
    }

    #[test]
    fn test_late_source_waits_for_its_turn() {
        // 2 depends on 1; 0 is a later-ready task only by declaration.
        let (mut g, t) = graph_with(3);
        g.add_dependency(t[0], &[t[2]]).unwrap();
        g.add_dependency(t[2], &[t[1]]).unwrap();

        assert_eq!(g.topological_order().unwrap(), vec![t[1], t[2], t[0]]);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let (mut g, t) = graph_with(2);
        g.add_dependency(t[1], &[]).unwrap();

        assert_eq!(
            g.add_dependency(t[1], &[t[0]]),
            Err(GraphError::DuplicateTask(t[1]))
        );
        assert!(g.dependencies_of(t[1]).is_empty());
    }

    #[test]
    fn test_unknown_upstream_rejected() {
        let (mut g, t) = graph_with(1);
        let stranger = TaskId::new(g.id, 7);

        assert_eq!(
            g.add_dependency(t[0], &[stranger]),
            Err(GraphError::UnknownUpstream {
                task: t[0],
                upstream: stranger
            })
        );
        assert!(!g.is_declared(t[0]));
        assert_eq!(
            g.add_dependency(stranger, &[]),
            Err(GraphError::UnknownTask(stranger))
        );
    }

    #[test]
    fn test_handles_from_another_graph_rejected() {
        let (mut g, t) = graph_with(2);
        let (other, o) = graph_with(2);

        assert!(!g.contains(o[1]));
        assert!(other.contains(o[1]));
        assert_eq!(
            g.add_dependency(t[0], &[o[1]]),
            Err(GraphError::UnknownUpstream {
                task: t[0],
                upstream: o[1]
            })
        );
        assert_eq!(
            g.add_dependency(o[0], &[t[1]]),
            Err(GraphError::UnknownTask(o[0]))
        );
        assert!(g.dependents_of(t[1]).is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        let (mut g, t) = graph_with(4);
        g.add_dependency(t[1], &[t[0]]).unwrap();
        g.add_dependency(t[2], &[t[1], t[3]]).unwrap();
        g.add_dependency(t[3], &[t[2]]).unwrap();

        match g.topological_order() {
            Err(GraphError::Cycle { task, cycle }) => {
                assert_eq!(task, t[2]);
                assert_eq!(cycle, vec![t[2], t[3], t[2]]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(!g.is_acyclic());
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let (mut g, t) = graph_with(1);
        g.add_dependency(t[0], &[t[0]]).unwrap();

        assert!(matches!(
            g.topological_order(),
            Err(GraphError::Cycle { task, .. }) if task == t[0]
        ));
    }

    #[test]
    fn test_degrees_count_distinct_neighbours() {
        let (mut g, t) = graph_with(3);
        g.add_dependency(t[1], &[t[0], t[0]]).unwrap();
        g.add_dependency(t[2], &[t[0], t[1]]).unwrap();

        assert_eq!(g.indegree(t[0]), 0);
        assert_eq!(g.indegree(t[1]), 1);
        assert_eq!(g.indegree(t[2]), 2);
        assert_eq!(g.outdegree(t[0]), 2);
        assert_eq!(g.dependencies_of(t[1]), &[t[0], t[0]]);
        assert_eq!(g.sources().collect::<Vec<_>>(), vec![t[0]]);
        assert_eq!(g.terminals().collect::<Vec<_>>(), vec![t[2]]);
        assert_eq!(
            g.edges().collect::<Vec<_>>(),
            vec![(t[0], t[1]), (t[0], t[2]), (t[1], t[2])]
        );
    }
}
