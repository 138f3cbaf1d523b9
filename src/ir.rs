use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Renderer kind written into persisted node records.
pub const NODE_KIND: &str = "concept";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "TD" | "TB" => Some(Self::TopBottom),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Self::BottomTop | Self::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub position: Position,
    pub label: String,
    pub category: String,
    pub highlighted: bool,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        category: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            label: label.into(),
            category: category.into(),
            highlighted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub highlighted: bool,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: label.into(),
            highlighted: false,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Id-keyed arena of nodes and edges. Edges refer to nodes by id only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub nodes: BTreeMap<String, Node>,
    pub edges: BTreeMap<String, Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn insert_edge(&mut self, edge: Edge) {
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Removes a node and every edge incident to it. Returns the removed edge ids.
    pub fn remove_node(&mut self, id: &str) -> Option<(Node, Vec<String>)> {
        let node = self.nodes.remove(id)?;
        let incident: Vec<String> = self
            .edges
            .values()
            .filter(|edge| edge.touches(id))
            .map(|edge| edge.id.clone())
            .collect();
        for edge_id in &incident {
            self.edges.remove(edge_id);
        }
        Some((node, incident))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Edges whose source or target is missing from the node set.
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|edge| !self.contains_node(&edge.source) || !self.contains_node(&edge.target))
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.values().map(NodeRecord::from).collect(),
            edges: self.edges.values().map(EdgeRecord::from).collect(),
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut graph = Graph::new();
        for record in &snapshot.nodes {
            graph.insert_node(Node::new(
                record.id.clone(),
                record.label.clone(),
                record.category.clone(),
                record.position,
            ));
        }
        for record in &snapshot.edges {
            graph.insert_edge(Edge::new(
                record.id.clone(),
                record.source.clone(),
                record.target.clone(),
                record.label.clone(),
            ));
        }
        graph
    }
}

/// Serializable, highlight-free copy of a graph. Used by history and persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Position,
    pub label: String,
    pub category: String,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            kind: NODE_KIND.to_string(),
            position: node.position,
            label: node.label.clone(),
            category: node.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
}

impl From<&Edge> for EdgeRecord {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            label: edge.label.clone(),
        }
    }
}
