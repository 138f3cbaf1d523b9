use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::DiagnosticsConfig;
use crate::ir::Graph;

/// Advisory findings about how well a map reads as a hierarchy. Nothing here
/// blocks a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    TooManyRoots { roots: Vec<String>, max: usize },
    HighFanOut { node_id: String, edges: usize, max: usize },
    NodeCountOutOfRange { count: usize, min: usize, max: usize },
    DisconnectedNodes { node_ids: Vec<String> },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::TooManyRoots { roots, max } => write!(
                f,
                "{} root nodes (at most {max} recommended): {}",
                roots.len(),
                roots.join(", ")
            ),
            Diagnostic::HighFanOut {
                node_id,
                edges,
                max,
            } => write!(f, "node {node_id} has {edges} edges (at most {max} recommended)"),
            Diagnostic::NodeCountOutOfRange { count, min, max } => {
                write!(f, "{count} nodes (between {min} and {max} recommended)")
            }
            Diagnostic::DisconnectedNodes { node_ids } => {
                write!(f, "nodes without any edge: {}", node_ids.join(", "))
            }
        }
    }
}

/// Roots are connected nodes with no incoming edge. Fan-out counts every
/// edge touching a node. Edges with a missing endpoint are ignored.
pub fn diagnose(graph: &Graph, config: &DiagnosticsConfig) -> Vec<Diagnostic> {
    let mut findings = Vec::new();
    if graph.is_empty() {
        return findings;
    }

    let count = graph.nodes.len();
    if count < config.min_nodes || count > config.max_nodes {
        findings.push(Diagnostic::NodeCountOutOfRange {
            count,
            min: config.min_nodes,
            max: config.max_nodes,
        });
    }

    let mut incoming: BTreeSet<&str> = BTreeSet::new();
    let mut degree: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in graph.edges.values() {
        if !graph.contains_node(&edge.source) || !graph.contains_node(&edge.target) {
            continue;
        }
        incoming.insert(edge.target.as_str());
        *degree.entry(edge.source.as_str()).or_default() += 1;
        *degree.entry(edge.target.as_str()).or_default() += 1;
    }

    let roots: Vec<String> = graph
        .nodes
        .keys()
        .filter(|id| degree.contains_key(id.as_str()) && !incoming.contains(id.as_str()))
        .cloned()
        .collect();
    if roots.len() > config.max_roots {
        findings.push(Diagnostic::TooManyRoots {
            roots,
            max: config.max_roots,
        });
    }

    for (id, edges) in &degree {
        if *edges > config.max_edges_per_node {
            findings.push(Diagnostic::HighFanOut {
                node_id: id.to_string(),
                edges: *edges,
                max: config.max_edges_per_node,
            });
        }
    }

    let isolated: Vec<String> = graph
        .nodes
        .keys()
        .filter(|id| !degree.contains_key(id.as_str()))
        .cloned()
        .collect();
    if !isolated.is_empty() && count > 1 {
        findings.push(Diagnostic::DisconnectedNodes { node_ids: isolated });
    }

    findings
}
