//! Integration of suggested subgraphs into a live graph.
//!
//! `plan_merge` is pure apart from drawing fresh ids: it deduplicates,
//! validates, clusters, places and resolves edges, and returns the nodes and
//! edges to append together with the outcome report. Committing the plan is
//! the store's job, as a single checkpointed mutation.

use std::collections::{HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::cluster::cluster_candidates;
use crate::config::PlacementConfig;
use crate::document::{CandidateNode, Suggestion};
use crate::error::ValidationError;
use crate::ids::IdGenerator;
use crate::ir::{Edge, Graph, Node, Position};
use crate::placement::{compute_anchor, place_node};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Comparison key for label dedup: trimmed, inner whitespace collapsed, lowercased.
pub fn canonical_label(label: &str) -> String {
    WHITESPACE_RE
        .replace_all(label.trim(), " ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Applied,
    /// Nothing survived dedup; the graph is untouched.
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Endpoint is the temp id of a candidate dropped as a duplicate.
    DuplicateEndpoint(String),
    /// Endpoint is neither a surviving temp id nor an existing node.
    MissingEndpoint(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEdge {
    pub index: usize,
    pub source: String,
    pub target: String,
    pub reason: DropReason,
}

impl fmt::Display for DroppedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            DropReason::DuplicateEndpoint(id) => write!(
                f,
                "edge #{} {} -> {} dropped: `{id}` was skipped as a duplicate",
                self.index, self.source, self.target
            ),
            DropReason::MissingEndpoint(id) => write!(
                f,
                "edge #{} {} -> {} dropped: `{id}` does not exist",
                self.index, self.source, self.target
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub status: MergeStatus,
    pub nodes_added: usize,
    pub edges_added: usize,
    pub duplicates_skipped: usize,
    pub edges_dropped: usize,
    pub dropped: Vec<DroppedEdge>,
    pub added_node_ids: Vec<String>,
    pub added_edge_ids: Vec<String>,
}

impl MergeReport {
    fn no_op(duplicates_skipped: usize) -> Self {
        Self {
            status: MergeStatus::NoOp,
            nodes_added: 0,
            edges_added: 0,
            duplicates_skipped,
            edges_dropped: 0,
            dropped: Vec::new(),
            added_node_ids: Vec::new(),
            added_edge_ids: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.status == MergeStatus::NoOp
    }

    /// One-line user-facing summary.
    pub fn summary(&self) -> String {
        if self.is_noop() {
            return if self.duplicates_skipped > 0 {
                format!(
                    "No new nodes added ({} already on the map)",
                    self.duplicates_skipped
                )
            } else {
                "No new nodes added".to_string()
            };
        }
        let mut out = format!(
            "Added {} node(s) and {} edge(s)",
            self.nodes_added, self.edges_added
        );
        if self.duplicates_skipped > 0 {
            out.push_str(&format!(", skipped {} duplicate(s)", self.duplicates_skipped));
        }
        if self.edges_dropped > 0 {
            out.push_str(&format!(
                ", dropped {} edge(s) with invalid endpoints",
                self.edges_dropped
            ));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct MergePlan {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub report: MergeReport,
}

pub fn plan_merge(
    graph: &Graph,
    suggestion: &Suggestion,
    ids: &mut dyn IdGenerator,
    config: &PlacementConfig,
) -> Result<MergePlan, ValidationError> {
    let existing_labels: HashSet<String> = graph
        .nodes
        .values()
        .map(|node| canonical_label(&node.label))
        .collect();

    let mut survivors: Vec<usize> = Vec::new();
    let mut skipped_temp_ids: HashSet<&str> = HashSet::new();
    for (index, candidate) in suggestion.new_nodes.iter().enumerate() {
        let duplicate = candidate
            .label
            .as_deref()
            .map(canonical_label)
            .filter(|label| !label.is_empty())
            .is_some_and(|label| existing_labels.contains(&label));
        if duplicate {
            if let Some(temp_id) = candidate.id.as_deref() {
                skipped_temp_ids.insert(temp_id);
            }
        } else {
            survivors.push(index);
        }
    }
    let duplicates_skipped = suggestion.new_nodes.len() - survivors.len();

    if survivors.is_empty() {
        return Ok(MergePlan {
            nodes: Vec::new(),
            edges: Vec::new(),
            report: MergeReport::no_op(duplicates_skipped),
        });
    }

    for &index in &survivors {
        validate_candidate(index, &suggestion.new_nodes[index])?;
    }

    let mut remap: HashMap<&str, String> = HashMap::new();
    let mut new_ids: Vec<String> = Vec::with_capacity(survivors.len());
    for &index in &survivors {
        let new_id = ids.next_id("node");
        if let Some(temp_id) = suggestion.new_nodes[index].id.as_deref() {
            remap.entry(temp_id).or_insert_with(|| new_id.clone());
        }
        new_ids.push(new_id);
    }

    let temp_ids: Vec<Option<&str>> = survivors
        .iter()
        .map(|&index| suggestion.new_nodes[index].id.as_deref())
        .collect();
    let clusters = cluster_candidates(
        &temp_ids,
        suggestion
            .new_edges
            .iter()
            .map(|edge| (edge.source.as_str(), edge.target.as_str())),
    );

    let mut occupied: Vec<Position> = graph.nodes.values().map(|node| node.position).collect();
    let anchor = compute_anchor(&occupied, config);
    let mut positions: Vec<Option<Position>> = vec![None; survivors.len()];
    let mut batch_index = 0usize;
    for cluster in &clusters {
        let mut cluster_anchor = anchor;
        for (member_rank, &slot) in cluster.iter().enumerate() {
            let placed = place_node(cluster_anchor, &occupied, batch_index, config);
            if member_rank == 0 {
                cluster_anchor = placed.position;
            }
            occupied.push(placed.position);
            positions[slot] = Some(placed.position);
            batch_index += 1;
        }
    }

    let mut nodes = Vec::with_capacity(survivors.len());
    for (slot, &index) in survivors.iter().enumerate() {
        let candidate = &suggestion.new_nodes[index];
        let mut node = Node::new(
            new_ids[slot].clone(),
            candidate.label.clone().unwrap_or_default().trim(),
            candidate.category.clone().unwrap_or_default().trim(),
            positions[slot].unwrap_or(anchor),
        );
        node.highlighted = true;
        nodes.push(node);
    }

    let resolve = |endpoint: &str| -> Result<String, DropReason> {
        if let Some(new_id) = remap.get(endpoint) {
            Ok(new_id.clone())
        } else if skipped_temp_ids.contains(endpoint) {
            Err(DropReason::DuplicateEndpoint(endpoint.to_string()))
        } else if graph.contains_node(endpoint) {
            Ok(endpoint.to_string())
        } else {
            Err(DropReason::MissingEndpoint(endpoint.to_string()))
        }
    };

    let mut edges = Vec::new();
    let mut dropped = Vec::new();
    for (index, candidate) in suggestion.new_edges.iter().enumerate() {
        let resolved = resolve(&candidate.source)
            .and_then(|source| resolve(&candidate.target).map(|target| (source, target)));
        match resolved {
            Ok((source, target)) => {
                let mut edge = Edge::new(ids.next_id("edge"), source, target, candidate.label.clone());
                edge.highlighted = true;
                edges.push(edge);
            }
            Err(reason) => {
                let dropped_edge = DroppedEdge {
                    index,
                    source: candidate.source.clone(),
                    target: candidate.target.clone(),
                    reason,
                };
                warn!(%dropped_edge, "candidate edge dropped");
                dropped.push(dropped_edge);
            }
        }
    }

    let report = MergeReport {
        status: MergeStatus::Applied,
        nodes_added: nodes.len(),
        edges_added: edges.len(),
        duplicates_skipped,
        edges_dropped: dropped.len(),
        dropped,
        added_node_ids: nodes.iter().map(|node| node.id.clone()).collect(),
        added_edge_ids: edges.iter().map(|edge| edge.id.clone()).collect(),
    };
    Ok(MergePlan {
        nodes,
        edges,
        report,
    })
}

fn validate_candidate(index: usize, candidate: &CandidateNode) -> Result<(), ValidationError> {
    let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());
    if blank(&candidate.label) {
        return Err(ValidationError::MissingLabel { index });
    }
    if blank(&candidate.category) {
        return Err(ValidationError::MissingCategory { index });
    }
    Ok(())
}
