//! Topics own independent graph stores; the workspace decides which one is live.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::document::{GeneratedMap, Suggestion};
use crate::error::{EngineError, Result, ValidationError};
use crate::ids::{IdGenerator, UuidIds};
use crate::merge::MergeReport;
use crate::store::{GenerationReport, GraphStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error(String),
}

#[derive(Debug)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub store: GraphStore,
    pub transcript: Vec<ChatMessage>,
    pub status: GenerationStatus,
}

impl Topic {
    pub fn new(id: impl Into<String>, title: impl Into<String>, config: &Config) -> Self {
        let id = id.into();
        Self {
            store: GraphStore::new(id.clone(), config),
            id,
            title: title.into(),
            transcript: Vec::new(),
            status: GenerationStatus::Idle,
        }
    }

    pub fn with_store(id: impl Into<String>, title: impl Into<String>, store: GraphStore) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            store,
            transcript: Vec::new(),
            status: GenerationStatus::Idle,
        }
    }

    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    pub fn begin_generation(&mut self) {
        self.status = GenerationStatus::Loading;
    }

    /// Settles a full-generation request. A failed request leaves the graph
    /// untouched.
    pub fn finish_generation(
        &mut self,
        outcome: std::result::Result<GeneratedMap, String>,
    ) -> Option<GenerationReport> {
        match outcome {
            Ok(map) => {
                let report = self.store.apply_generated(&map);
                info!(topic = %self.id, nodes = report.nodes, edges = report.edges, "map generated");
                self.status = GenerationStatus::Success;
                Some(report)
            }
            Err(message) => {
                warn!(topic = %self.id, error = %message, "map generation failed");
                self.status = GenerationStatus::Error(message);
                None
            }
        }
    }

    /// Merges a suggestion and records its summary as an assistant message.
    pub fn merge_suggestion(
        &mut self,
        suggestion: &Suggestion,
        now: Instant,
    ) -> std::result::Result<MergeReport, ValidationError> {
        let report = self.store.merge(suggestion, now)?;
        self.push_message(Role::Assistant, report.summary());
        Ok(report)
    }
}

pub struct Workspace {
    config: Config,
    topics: BTreeMap<String, Topic>,
    active: Option<String>,
    ids: Box<dyn IdGenerator>,
}

impl Workspace {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            topics: BTreeMap::new(),
            active: None,
            ids: Box::new(UuidIds),
        }
    }

    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Creates a topic and makes it active. Returns its id.
    pub fn create_topic(&mut self, title: &str) -> String {
        let id = self.ids.next_id("topic");
        let topic = Topic::new(id.clone(), title, &self.config);
        self.insert_topic(topic);
        id
    }

    /// Adds an already built topic (for example one with its own persistence)
    /// and makes it active.
    pub fn insert_topic(&mut self, topic: Topic) {
        let id = topic.id.clone();
        self.topics.insert(id.clone(), topic);
        self.active = Some(id);
    }

    pub fn remove_topic(&mut self, id: &str) -> Option<Topic> {
        let removed = self.topics.remove(id)?;
        if self.active.as_deref() == Some(id) {
            self.active = self.topics.keys().next().cloned();
        }
        Some(removed)
    }

    pub fn select(&mut self, id: &str) -> Result<()> {
        if !self.topics.contains_key(id) {
            return Err(EngineError::UnknownTopic(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Topic> {
        self.active.as_ref().and_then(|id| self.topics.get(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut Topic> {
        let id = self.active.as_ref()?;
        self.topics.get_mut(id)
    }

    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.topics.get(id)
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CandidateEdge, CandidateNode, GeneratedNode};
    use crate::ids::SequentialIds;

    fn workspace() -> Workspace {
        Workspace::new(Config::default()).with_ids(SequentialIds::new())
    }

    #[test]
    fn topics_are_isolated() {
        let mut ws = workspace();
        let first = ws.create_topic("Biology");
        let second = ws.create_topic("History");
        assert_eq!(ws.active_id(), Some(second.as_str()));

        ws.active_mut().unwrap().store.add_node("Rome", "concept");
        ws.select(&first).unwrap();
        assert!(ws.active().unwrap().store.graph().is_empty());
        assert_eq!(ws.topic(&second).unwrap().store.graph().nodes.len(), 1);
    }

    #[test]
    fn select_unknown_topic_errors() {
        let mut ws = workspace();
        assert!(matches!(ws.select("nope"), Err(EngineError::UnknownTopic(_))));
    }

    #[test]
    fn removing_active_topic_falls_back() {
        let mut ws = workspace();
        let first = ws.create_topic("A");
        let second = ws.create_topic("B");
        ws.remove_topic(&second);
        assert_eq!(ws.active_id(), Some(first.as_str()));
        ws.remove_topic(&first);
        assert!(ws.active().is_none());
        assert!(ws.is_empty());
    }

    #[test]
    fn generation_status_tracks_outcome() {
        let mut topic = Topic::new("t", "Cells", &Config::default());
        topic.begin_generation();
        assert_eq!(topic.status, GenerationStatus::Loading);
        assert!(topic.finish_generation(Err("timeout".to_string())).is_none());
        assert_eq!(topic.status, GenerationStatus::Error("timeout".to_string()));
        assert!(topic.store.graph().is_empty());

        topic.begin_generation();
        let report = topic.finish_generation(Ok(GeneratedMap {
            nodes: vec![GeneratedNode {
                id: "1".to_string(),
                label: "Cell".to_string(),
                category: "concept".to_string(),
            }],
            edges: Vec::new(),
        }));
        assert_eq!(report.map(|r| r.nodes), Some(1));
        assert_eq!(topic.status, GenerationStatus::Success);
    }

    #[test]
    fn merge_suggestion_records_summary() {
        let mut topic = Topic::new("t", "Cells", &Config::default());
        let cell = topic.store.add_node("Cell", "concept");
        let suggestion = Suggestion {
            new_nodes: vec![CandidateNode::new(Some("n"), "Nucleus", "structure")],
            new_edges: vec![CandidateEdge::new(&cell.id, "n", "contains")],
        };
        let report = topic.merge_suggestion(&suggestion, Instant::now()).unwrap();
        assert_eq!(report.nodes_added, 1);
        let last = topic.transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, report.summary());
    }
}
