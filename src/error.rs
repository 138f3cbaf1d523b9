use thiserror::Error;

/// Malformed input rejected before any mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("candidate node #{index} has no label")]
    MissingLabel { index: usize },
    #[error("candidate node #{index} has no category")]
    MissingCategory { index: usize },
    #[error("document has no `{0}` collection")]
    MissingCollection(&'static str),
    #[error("document field `{0}` is not an array")]
    NotAnArray(&'static str),
    #[error("{kind} #{index} is missing required field `{field}`")]
    MissingField {
        kind: &'static str,
        index: usize,
        field: &'static str,
    },
    #[error("duplicate node id `{0}`")]
    DuplicateNodeId(String),
    #[error("duplicate edge id `{0}`")]
    DuplicateEdgeId(String),
    #[error("edge `{edge}` references unknown node `{endpoint}`")]
    DanglingEdge { edge: String, endpoint: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown topic `{0}`")]
    UnknownTopic(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
