use concept_map_engine::config::Config;
use concept_map_engine::ids::UuidIds;
use concept_map_engine::{Direction, Document, GraphStore, Suggestion, import_document};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeResponse {
    document: Document,
    summary: String,
    nodes_added: usize,
    edges_added: usize,
    duplicates_skipped: usize,
    edges_dropped: usize,
}

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn tidy_with(doc_json: &str, direction: Option<String>) -> Result<String, String> {
    let config = Config::default();
    let direction = match direction.as_deref() {
        Some(token) => Direction::from_token(token).ok_or_else(|| format!("unknown direction `{token}`"))?,
        None => config.layout.direction,
    };
    let document = import_document(doc_json, &config.placement).map_err(|e| e.to_string())?;
    let mut store = GraphStore::new("wasm", &config).with_graph(document.to_graph());
    store.tidy(direction);
    Document::from_graph(store.graph())
        .to_json()
        .map_err(|e| e.to_string())
}

/// Lays out an import/export document and returns it with new positions.
#[wasm_bindgen]
pub fn tidy_document(doc_json: &str, direction: Option<String>) -> Result<String, JsValue> {
    tidy_with(doc_json, direction).map_err(js_error)
}

fn merge_with(doc_json: &str, suggestion_json: &str) -> Result<String, String> {
    let config = Config::default();
    let document = import_document(doc_json, &config.placement).map_err(|e| e.to_string())?;
    let suggestion = Suggestion::from_json(suggestion_json).map_err(|e| e.to_string())?;
    let mut store = GraphStore::new("wasm", &config)
        .with_ids(UuidIds)
        .with_graph(document.to_graph());
    let report = store
        .merge_without_lease(&suggestion)
        .map_err(|e| e.to_string())?;
    let response = MergeResponse {
        document: Document::from_graph(store.graph()),
        summary: report.summary(),
        nodes_added: report.nodes_added,
        edges_added: report.edges_added,
        duplicates_skipped: report.duplicates_skipped,
        edges_dropped: report.edges_dropped,
    };
    serde_json::to_string(&response).map_err(|e| e.to_string())
}

/// Merges a `{ newNodes, newEdges }` payload into a document. Highlight
/// expiry is left to the host, which owns the clock.
#[wasm_bindgen]
pub fn merge_suggestion(doc_json: &str, suggestion_json: &str) -> Result<String, JsValue> {
    merge_with(doc_json, suggestion_json).map_err(js_error)
}
