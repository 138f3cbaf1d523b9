//! Wire formats exchanged with the outside world: the import/export document,
//! the AI merge suggestion and the AI full-generation payload.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::PlacementConfig;
use crate::error::{EngineError, Result, ValidationError};
use crate::ir::{Edge, Graph, Node, Position};
use crate::placement::{compute_anchor, place_node};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateNode {
    /// Temporary id that candidate edges may refer to.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", alias = "category", default)]
    pub category: Option<String>,
}

impl CandidateNode {
    pub fn new(id: Option<&str>, label: &str, category: &str) -> Self {
        Self {
            id: id.map(str::to_string),
            label: Some(label.to_string()),
            category: Some(category.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
}

impl CandidateEdge {
    pub fn new(source: &str, target: &str, label: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            label: label.to_string(),
        }
    }
}

/// Partial subgraph proposed for merging into an existing graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default)]
    pub new_nodes: Vec<CandidateNode>,
    #[serde(default)]
    pub new_edges: Vec<CandidateEdge>,
}

impl Suggestion {
    pub fn from_json(text: &str) -> Result<Self> {
        decode_lenient(text)
    }

    pub fn is_empty(&self) -> bool {
        self.new_nodes.is_empty() && self.new_edges.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", alias = "category")]
    pub category: String,
}

/// From-scratch graph produced by whole-map generation. Ids are only
/// meaningful inside the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMap {
    #[serde(default)]
    pub nodes: Vec<GeneratedNode>,
    #[serde(default)]
    pub edges: Vec<CandidateEdge>,
}

impl GeneratedMap {
    pub fn from_json(text: &str) -> Result<Self> {
        decode_lenient(text)
    }
}

/// Strict JSON first, then JSON5 (comments, trailing commas, bare keys).
/// The strict error is reported when both fail.
pub fn decode_lenient<T: DeserializeOwned>(text: &str) -> Result<T> {
    match serde_json::from_str::<T>(text) {
        Ok(value) => Ok(value),
        Err(strict) => json5::from_str::<T>(text).map_err(|_| EngineError::Json(strict)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub category: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Import/export document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub nodes: Vec<DocumentNode>,
    pub edges: Vec<DocumentEdge>,
}

impl Document {
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            nodes: graph
                .nodes
                .values()
                .map(|node| DocumentNode {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    category: node.category.clone(),
                    position: node.position,
                })
                .collect(),
            edges: graph
                .edges
                .values()
                .map(|edge| DocumentEdge {
                    id: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    label: edge.label.clone(),
                })
                .collect(),
        }
    }

    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        for node in &self.nodes {
            graph.insert_node(Node::new(
                node.id.clone(),
                node.label.clone(),
                node.category.clone(),
                node.position,
            ));
        }
        for edge in &self.edges {
            graph.insert_edge(Edge::new(
                edge.id.clone(),
                edge.source.clone(),
                edge.target.clone(),
                edge.label.clone(),
            ));
        }
        graph
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn export_document(graph: &Graph) -> Result<String> {
    Document::from_graph(graph).to_json()
}

/// Parses and validates an import document. Nothing is returned unless the
/// whole document is well formed. Nodes without a position are placed with
/// the placement engine so they do not pile up on one point.
pub fn import_document(text: &str, placement: &PlacementConfig) -> Result<Document> {
    let value: Value = serde_json::from_str(text)?;
    let root = value.as_object().ok_or(ValidationError::MissingCollection("nodes"))?;
    let nodes = collection(root, "nodes")?;
    let edges = collection(root, "edges")?;

    let mut seen_nodes = HashSet::new();
    let mut parsed_nodes = Vec::with_capacity(nodes.len());
    let mut unplaced = Vec::new();
    for (index, raw) in nodes.iter().enumerate() {
        let id = required_str(raw, "node", index, "id")?;
        let label = required_str(raw, "node", index, "label")?;
        let category = required_str(raw, "node", index, "type")?;
        if !seen_nodes.insert(id.clone()) {
            return Err(ValidationError::DuplicateNodeId(id).into());
        }
        let position = match raw.get("position") {
            Some(pos) => Some(parse_position(pos, index)?),
            None => None,
        };
        if position.is_none() {
            unplaced.push(index);
        }
        parsed_nodes.push(DocumentNode {
            id,
            label,
            category,
            position: position.unwrap_or_default(),
        });
    }

    let mut seen_edges = HashSet::new();
    let mut parsed_edges = Vec::with_capacity(edges.len());
    for (index, raw) in edges.iter().enumerate() {
        let id = required_str(raw, "edge", index, "id")?;
        let source = required_str(raw, "edge", index, "source")?;
        let target = required_str(raw, "edge", index, "target")?;
        let label = optional_str(raw, "label").unwrap_or_default();
        if !seen_edges.insert(id.clone()) {
            return Err(ValidationError::DuplicateEdgeId(id).into());
        }
        for endpoint in [&source, &target] {
            if !seen_nodes.contains(endpoint) {
                return Err(ValidationError::DanglingEdge {
                    edge: id,
                    endpoint: endpoint.clone(),
                }
                .into());
            }
        }
        parsed_edges.push(DocumentEdge {
            id,
            source,
            target,
            label,
        });
    }

    if !unplaced.is_empty() {
        let mut occupied: Vec<Position> = parsed_nodes
            .iter()
            .enumerate()
            .filter(|(idx, _)| !unplaced.contains(idx))
            .map(|(_, node)| node.position)
            .collect();
        let anchor = compute_anchor(&occupied, placement);
        for (batch_index, idx) in unplaced.into_iter().enumerate() {
            let placed = place_node(anchor, &occupied, batch_index, placement);
            parsed_nodes[idx].position = placed.position;
            occupied.push(placed.position);
        }
    }

    Ok(Document {
        nodes: parsed_nodes,
        edges: parsed_edges,
    })
}

fn collection<'a>(root: &'a Map<String, Value>, field: &'static str) -> Result<&'a Vec<Value>> {
    match root.get(field) {
        None => Err(ValidationError::MissingCollection(field).into()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ValidationError::NotAnArray(field).into()),
    }
}

fn optional_str(raw: &Value, field: &str) -> Option<String> {
    match raw.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_str(
    raw: &Value,
    kind: &'static str,
    index: usize,
    field: &'static str,
) -> Result<String> {
    optional_str(raw, field)
        .ok_or_else(|| ValidationError::MissingField { kind, index, field }.into())
}

fn parse_position(raw: &Value, index: usize) -> Result<Position> {
    let coord = |field: &'static str| {
        raw.get(field)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .ok_or(ValidationError::MissingField {
                kind: "node",
                index,
                field: "position",
            })
    };
    Ok(Position::new(coord("x")?, coord("y")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> &'static str {
        r#"{
            "nodes": [
                { "id": "a", "label": "Alpha", "type": "concept", "position": { "x": 0, "y": 0 } },
                { "id": "b", "label": "Beta", "type": "example" }
            ],
            "edges": [ { "id": "e1", "source": "a", "target": "b", "label": "has" } ]
        }"#
    }

    #[test]
    fn imports_and_places_nodes_without_position() {
        let cfg = PlacementConfig::default();
        let doc = import_document(valid(), &cfg).unwrap();
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[1].position.x, cfg.column_offset());
        let graph = doc.to_graph();
        assert_eq!(graph.edges["e1"].label, "has");
        assert!(graph.dangling_edges().is_empty());
    }

    #[test]
    fn rejects_missing_or_non_array_collections() {
        let cfg = PlacementConfig::default();
        let err = import_document(r#"{ "nodes": [] }"#, &cfg).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::MissingCollection("edges"))
        ));
        let err = import_document(r#"{ "nodes": {}, "edges": [] }"#, &cfg).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::NotAnArray("nodes"))
        ));
    }

    #[test]
    fn rejects_whole_document_on_one_bad_entity() {
        let cfg = PlacementConfig::default();
        let text = r#"{
            "nodes": [ { "id": "a", "label": "Alpha", "type": "concept" }, { "id": "b", "type": "x" } ],
            "edges": []
        }"#;
        let err = import_document(text, &cfg).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::MissingField {
                kind: "node",
                index: 1,
                field: "label"
            })
        ));
    }

    #[test]
    fn rejects_dangling_edge() {
        let cfg = PlacementConfig::default();
        let text = r#"{
            "nodes": [ { "id": "a", "label": "Alpha", "type": "concept" } ],
            "edges": [ { "id": "e", "source": "a", "target": "ghost" } ]
        }"#;
        assert!(import_document(text, &cfg).is_err());
    }

    #[test]
    fn export_round_trips_through_import() {
        let cfg = PlacementConfig::default();
        let doc = import_document(valid(), &cfg).unwrap();
        let text = export_document(&doc.to_graph()).unwrap();
        let again = import_document(&text, &cfg).unwrap();
        assert_eq!(doc, again);
    }

    #[test]
    fn suggestion_accepts_json5() {
        let text = r#"{
            newNodes: [ { id: "new-1", label: "C", type: "x" }, ],
            // edges point at existing ids too
            newEdges: [ { source: "B", target: "new-1", label: "leads to" } ],
        }"#;
        let suggestion = Suggestion::from_json(text).unwrap();
        assert_eq!(suggestion.new_nodes[0].category.as_deref(), Some("x"));
        assert_eq!(suggestion.new_edges[0].target, "new-1");
    }

    #[test]
    fn suggestion_tolerates_missing_fields() {
        let suggestion = Suggestion::from_json(r#"{ "newNodes": [ { "label": "Only" } ] }"#).unwrap();
        assert!(suggestion.new_nodes[0].category.is_none());
        assert!(suggestion.new_edges.is_empty());
    }
}
