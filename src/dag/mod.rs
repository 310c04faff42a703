// src/dag/mod.rs

//! DAG representation.
//!
//! - [`graph`] holds the dependency edges between task handles and answers
//!   structural queries: degrees, topological order, cycle detection.
//! - [`export`] renders the graph for third-party visualisation tools.

pub mod export;
pub mod graph;

pub use export::{ExportFormat, export};
pub use graph::{Graph, GraphError};
