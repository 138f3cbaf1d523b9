//! Canonical graph state for one topic.
//!
//! Every change goes through [`GraphStore::apply`] as a [`Mutation`] tagged
//! with a [`MutationSource`]. User mutations checkpoint the pre-mutation
//! snapshot into history; programmatic ones (layout, restore, highlight
//! expiry) never do. After every settled mutation the snapshot is handed to
//! the persistence hook.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::{Document, GeneratedMap, Suggestion};
use crate::error::ValidationError;
use crate::history::HistoryManager;
use crate::ids::{IdGenerator, UuidIds};
use crate::ir::{Direction, Edge, Graph, Node, Position, Snapshot};
use crate::layout::{LayoutResult, Viewport, center_and_fit, compute_layout, tidy_graph};
use crate::merge::{MergeReport, plan_merge};
use crate::persist::{NullPersistence, Persistence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationSource {
    User,
    Programmatic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddNode(Node),
    UpdateNode {
        id: String,
        label: String,
        category: Option<String>,
    },
    DeleteNode(String),
    AddEdge(Edge),
    UpdateEdge {
        id: String,
        label: String,
    },
    DeleteEdge(String),
    SetPositions(BTreeMap<String, Position>),
    AppendBatch {
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    },
    ReplaceGraph(Graph),
    Clear,
    SetHighlight {
        node_ids: Vec<String>,
        edge_ids: Vec<String>,
        highlighted: bool,
    },
    Restore(Snapshot),
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::AddNode(_) => "add_node",
            Mutation::UpdateNode { .. } => "update_node",
            Mutation::DeleteNode(_) => "delete_node",
            Mutation::AddEdge(_) => "add_edge",
            Mutation::UpdateEdge { .. } => "update_edge",
            Mutation::DeleteEdge(_) => "delete_edge",
            Mutation::SetPositions(_) => "set_positions",
            Mutation::AppendBatch { .. } => "append_batch",
            Mutation::ReplaceGraph(_) => "replace_graph",
            Mutation::Clear => "clear",
            Mutation::SetHighlight { .. } => "set_highlight",
            Mutation::Restore(_) => "restore",
        }
    }
}

/// Entities highlighted by a merge, and when the highlight lapses.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightLease {
    pub node_ids: Vec<String>,
    pub edge_ids: Vec<String>,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistWarning {
    pub topic_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationReport {
    pub nodes: usize,
    pub edges: usize,
    pub edges_dropped: usize,
}

pub struct GraphStore {
    topic_id: String,
    graph: Graph,
    history: HistoryManager,
    ids: Box<dyn IdGenerator>,
    persistence: Box<dyn Persistence>,
    config: Config,
    leases: Vec<HighlightLease>,
    warnings: Vec<PersistWarning>,
}

impl GraphStore {
    pub fn new(topic_id: impl Into<String>, config: &Config) -> Self {
        Self {
            topic_id: topic_id.into(),
            graph: Graph::new(),
            history: HistoryManager::new(config.history.max_depth),
            ids: Box::new(UuidIds),
            persistence: Box::new(NullPersistence),
            config: config.clone(),
            leases: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_persistence(mut self, persistence: impl Persistence + 'static) -> Self {
        self.persistence = Box::new(persistence);
        self
    }

    /// Seeds the store without touching history or persistence.
    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.graph = graph;
        self
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn snapshot(&self) -> Snapshot {
        self.graph.snapshot()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn pending_highlights(&self) -> &[HighlightLease] {
        &self.leases
    }

    /// Drains persistence warnings collected since the last call.
    pub fn take_warnings(&mut self) -> Vec<PersistWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Applies one mutation atomically. Returns `false`, without checkpointing
    /// or persisting, when the mutation would not change anything.
    pub fn apply(&mut self, mutation: Mutation, source: MutationSource) -> bool {
        if !self.is_effective(&mutation) {
            debug!(kind = mutation.kind(), "mutation skipped, nothing to change");
            return false;
        }
        if source == MutationSource::User {
            self.history.checkpoint(self.graph.snapshot());
        }
        let kind = mutation.kind();
        self.apply_to_graph(mutation);
        debug!(
            kind,
            ?source,
            nodes = self.graph.nodes.len(),
            edges = self.graph.edges.len(),
            "mutation applied"
        );
        self.persist();
        true
    }

    fn is_effective(&self, mutation: &Mutation) -> bool {
        match mutation {
            Mutation::UpdateNode { id, .. } | Mutation::DeleteNode(id) => {
                self.graph.nodes.contains_key(id)
            }
            Mutation::UpdateEdge { id, .. } | Mutation::DeleteEdge(id) => {
                self.graph.edges.contains_key(id)
            }
            Mutation::SetPositions(positions) => {
                positions.keys().any(|id| self.graph.nodes.contains_key(id))
            }
            Mutation::AppendBatch { nodes, edges } => !nodes.is_empty() || !edges.is_empty(),
            Mutation::SetHighlight {
                node_ids, edge_ids, ..
            } => {
                node_ids.iter().any(|id| self.graph.nodes.contains_key(id))
                    || edge_ids.iter().any(|id| self.graph.edges.contains_key(id))
            }
            Mutation::Clear => !self.graph.is_empty(),
            Mutation::AddNode(_)
            | Mutation::AddEdge(_)
            | Mutation::ReplaceGraph(_)
            | Mutation::Restore(_) => true,
        }
    }

    fn apply_to_graph(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::AddNode(node) => self.graph.insert_node(node),
            Mutation::UpdateNode {
                id,
                label,
                category,
            } => {
                if let Some(node) = self.graph.nodes.get_mut(&id) {
                    node.label = label;
                    if let Some(category) = category {
                        node.category = category;
                    }
                }
            }
            Mutation::DeleteNode(id) => {
                if let Some((_, removed_edges)) = self.graph.remove_node(&id) {
                    debug!(node = %id, cascaded = removed_edges.len(), "node deleted");
                }
            }
            Mutation::AddEdge(edge) => self.graph.insert_edge(edge),
            Mutation::UpdateEdge { id, label } => {
                if let Some(edge) = self.graph.edges.get_mut(&id) {
                    edge.label = label;
                }
            }
            Mutation::DeleteEdge(id) => {
                self.graph.edges.remove(&id);
            }
            Mutation::SetPositions(positions) => {
                for (id, position) in positions {
                    if let Some(node) = self.graph.nodes.get_mut(&id) {
                        node.position = position;
                    }
                }
            }
            Mutation::AppendBatch { nodes, edges } => {
                for node in nodes {
                    self.graph.insert_node(node);
                }
                for edge in edges {
                    self.graph.insert_edge(edge);
                }
            }
            Mutation::ReplaceGraph(graph) => self.graph = graph,
            Mutation::Clear => self.graph = Graph::new(),
            Mutation::SetHighlight {
                node_ids,
                edge_ids,
                highlighted,
            } => {
                for id in &node_ids {
                    if let Some(node) = self.graph.nodes.get_mut(id) {
                        node.highlighted = highlighted;
                    }
                }
                for id in &edge_ids {
                    if let Some(edge) = self.graph.edges.get_mut(id) {
                        edge.highlighted = highlighted;
                    }
                }
            }
            Mutation::Restore(snapshot) => self.graph = Graph::from_snapshot(&snapshot),
        }
    }

    fn persist(&mut self) {
        let snapshot = self.graph.snapshot();
        if let Err(err) = self.persistence.save(&self.topic_id, &snapshot) {
            warn!(topic = %self.topic_id, error = %err, "failed to persist graph");
            self.warnings.push(PersistWarning {
                topic_id: self.topic_id.clone(),
                message: err.to_string(),
            });
        }
    }

    pub fn default_position(&self) -> Position {
        Position::new(self.config.placement.default_x, self.config.placement.default_y)
    }

    pub fn add_node(&mut self, label: &str, category: &str) -> Node {
        let position = self.default_position();
        self.add_node_at(label, category, position)
    }

    pub fn add_node_at(&mut self, label: &str, category: &str, position: Position) -> Node {
        let node = Node::new(self.ids.next_id("node"), label, category, position);
        self.apply(Mutation::AddNode(node.clone()), MutationSource::User);
        node
    }

    pub fn update_node(&mut self, id: &str, label: &str, category: Option<&str>) -> bool {
        self.apply(
            Mutation::UpdateNode {
                id: id.to_string(),
                label: label.to_string(),
                category: category.map(str::to_string),
            },
            MutationSource::User,
        )
    }

    pub fn delete_node(&mut self, id: &str) -> bool {
        self.apply(Mutation::DeleteNode(id.to_string()), MutationSource::User)
    }

    /// Endpoints are not checked; callers pass ids they know exist.
    pub fn add_edge(&mut self, source: &str, target: &str, label: &str) -> Edge {
        let edge = Edge::new(self.ids.next_id("edge"), source, target, label);
        self.apply(Mutation::AddEdge(edge.clone()), MutationSource::User);
        edge
    }

    pub fn update_edge(&mut self, id: &str, label: &str) -> bool {
        self.apply(
            Mutation::UpdateEdge {
                id: id.to_string(),
                label: label.to_string(),
            },
            MutationSource::User,
        )
    }

    pub fn delete_edge(&mut self, id: &str) -> bool {
        self.apply(Mutation::DeleteEdge(id.to_string()), MutationSource::User)
    }

    pub fn clear(&mut self) -> bool {
        self.leases.clear();
        self.apply(Mutation::Clear, MutationSource::User)
    }

    pub fn replace_graph(&mut self, graph: Graph) -> bool {
        self.leases.clear();
        self.apply(Mutation::ReplaceGraph(graph), MutationSource::User)
    }

    /// Replaces the graph with an already validated import document.
    pub fn import(&mut self, document: &Document) -> bool {
        self.replace_graph(document.to_graph())
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(self.graph.snapshot()) else {
            return false;
        };
        debug!(remaining = self.history.undo_depth(), "undo");
        self.apply(Mutation::Restore(previous), MutationSource::Programmatic)
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.graph.snapshot()) else {
            return false;
        };
        debug!(remaining = self.history.redo_depth(), "redo");
        self.apply(Mutation::Restore(next), MutationSource::Programmatic)
    }

    /// Merges a suggested subgraph as one checkpointed batch and leases the
    /// highlight on the added entities until `now` plus the configured duration.
    pub fn merge(
        &mut self,
        suggestion: &Suggestion,
        now: Instant,
    ) -> Result<MergeReport, ValidationError> {
        let report = self.merge_without_lease(suggestion)?;
        if !report.is_noop() {
            self.leases.push(HighlightLease {
                node_ids: report.added_node_ids.clone(),
                edge_ids: report.added_edge_ids.clone(),
                expires_at: now + self.config.highlight.duration(),
            });
        }
        Ok(report)
    }

    /// Same commit as [`GraphStore::merge`], but the added entities stay
    /// highlighted until the caller clears them. For hosts without a
    /// monotonic clock.
    pub fn merge_without_lease(
        &mut self,
        suggestion: &Suggestion,
    ) -> Result<MergeReport, ValidationError> {
        let plan = plan_merge(
            &self.graph,
            suggestion,
            self.ids.as_mut(),
            &self.config.placement,
        )?;
        if plan.report.is_noop() {
            info!(
                topic = %self.topic_id,
                duplicates = plan.report.duplicates_skipped,
                "merge produced no new nodes"
            );
            return Ok(plan.report);
        }

        let report = plan.report;
        self.apply(
            Mutation::AppendBatch {
                nodes: plan.nodes,
                edges: plan.edges,
            },
            MutationSource::User,
        );
        info!(
            topic = %self.topic_id,
            nodes_added = report.nodes_added,
            edges_added = report.edges_added,
            duplicates = report.duplicates_skipped,
            edges_dropped = report.edges_dropped,
            "merge committed"
        );
        Ok(report)
    }

    /// Clears the highlight on every lease that has lapsed by `now`. Returns
    /// the number of leases released.
    pub fn expire_highlights(&mut self, now: Instant) -> usize {
        let (expired, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.leases)
            .into_iter()
            .partition(|lease| lease.expires_at <= now);
        self.leases = pending;
        for lease in &expired {
            self.apply(
                Mutation::SetHighlight {
                    node_ids: lease.node_ids.clone(),
                    edge_ids: lease.edge_ids.clone(),
                    highlighted: false,
                },
                MutationSource::Programmatic,
            );
        }
        expired.len()
    }

    /// Replaces the graph with a freshly generated map, laid out from scratch.
    /// Generated ids are remapped to fresh ones; edges to unknown ids are dropped.
    pub fn apply_generated(&mut self, map: &GeneratedMap) -> GenerationReport {
        let mut graph = Graph::new();
        let mut remap: HashMap<&str, String> = HashMap::new();
        for generated in &map.nodes {
            let id = self.ids.next_id("node");
            remap.entry(generated.id.as_str()).or_insert_with(|| id.clone());
            graph.insert_node(Node::new(
                id,
                generated.label.trim(),
                generated.category.trim(),
                Position::default(),
            ));
        }
        let mut edges_dropped = 0usize;
        for candidate in &map.edges {
            let (Some(source), Some(target)) = (
                remap.get(candidate.source.as_str()),
                remap.get(candidate.target.as_str()),
            ) else {
                edges_dropped += 1;
                continue;
            };
            let edge = Edge::new(
                self.ids.next_id("edge"),
                source.clone(),
                target.clone(),
                candidate.label.clone(),
            );
            graph.insert_edge(edge);
        }
        if edges_dropped > 0 {
            warn!(topic = %self.topic_id, edges_dropped, "generated map had dangling edges");
        }

        let graph = tidy_graph(&graph, self.config.layout.direction, &self.config.layout);
        let report = GenerationReport {
            nodes: graph.nodes.len(),
            edges: graph.edges.len(),
            edges_dropped,
        };
        self.replace_graph(graph);
        report
    }

    /// Re-lays out the whole graph in place. Positions only, no checkpoint.
    pub fn tidy(&mut self, direction: Direction) -> LayoutResult {
        let layout = compute_layout(&self.graph, direction, &self.config.layout);
        self.apply(
            Mutation::SetPositions(layout.positions.clone()),
            MutationSource::Programmatic,
        );
        layout
    }

    /// Lays out, then centres the result in `viewport`. Returns the fitting zoom.
    pub fn center_and_fit(&mut self, direction: Direction, viewport: Viewport, padding: f32) -> f32 {
        let layout = compute_layout(&self.graph, direction, &self.config.layout);
        let fit = center_and_fit(&layout, viewport, padding, &self.config.layout);
        self.apply(Mutation::SetPositions(fit.positions), MutationSource::Programmatic);
        fit.zoom
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("topic_id", &self.topic_id)
            .field("nodes", &self.graph.nodes.len())
            .field("edges", &self.graph.edges.len())
            .field("undo_depth", &self.history.undo_depth())
            .field("redo_depth", &self.history.redo_depth())
            .finish()
    }
}
