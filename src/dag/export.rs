// src/dag/export.rs

//! Structural export of a [`Graph`] for external visualisation tools.

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::dag::graph::Graph;
use crate::errors::Result;
use crate::task::TaskId;

/// Output format for [`export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Graphviz `digraph`.
    #[default]
    Dot,
    /// `{"nodes": [...], "edges": [...]}`.
    Json,
}

impl ExportFormat {
    /// Conventional file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Dot => "dot",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonGraph {
    nodes: Vec<JsonNode>,
    edges: Vec<JsonEdge>,
}

#[derive(Debug, Serialize)]
struct JsonNode {
    id: usize,
    label: String,
    indegree: usize,
    outdegree: usize,
}

#[derive(Debug, Serialize)]
struct JsonEdge {
    from: usize,
    to: usize,
}

/// Render `graph` in the requested format.
///
/// `label` names each node; edges point from upstream to downstream.
pub fn export<F>(graph: &Graph, label: F, format: ExportFormat) -> Result<String>
where
    F: Fn(TaskId) -> String,
{
    match format {
        ExportFormat::Dot => Ok(to_dot(graph, label)),
        ExportFormat::Json => to_json(graph, label),
    }
}

fn to_dot<F>(graph: &Graph, label: F) -> String
where
    F: Fn(TaskId) -> String,
{
    let mut g: DiGraph<String, &str> = DiGraph::with_capacity(graph.len(), 0);
    let index: Vec<NodeIndex> = graph.tasks().map(|t| g.add_node(label(t))).collect();

    for (from, to) in graph.edges() {
        g.add_edge(index[from.index()], index[to.index()], "");
    }

    format!("{}", Dot::with_config(&g, &[Config::EdgeNoLabel]))
}

fn to_json<F>(graph: &Graph, label: F) -> Result<String>
where
    F: Fn(TaskId) -> String,
{
    let doc = JsonGraph {
        nodes: graph
            .tasks()
            .map(|t| JsonNode {
                id: t.index(),
                label: label(t),
                indegree: graph.indegree(t),
                outdegree: graph.outdegree(t),
            })
            .collect(),
        edges: graph
            .edges()
            .map(|(from, to)| JsonEdge {
                from: from.index(),
                to: to.index(),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&doc)?)
}
