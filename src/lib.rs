#[cfg(feature = "cli")]
pub mod cli;
pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod history;
pub mod ids;
pub mod ir;
pub mod layout;
pub mod merge;
pub mod persist;
pub mod placement;
pub mod render;
pub mod store;
pub mod theme;
pub mod topic;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use document::{Document, GeneratedMap, Suggestion, export_document, import_document};
pub use error::{EngineError, Result, ValidationError};
pub use ir::{Direction, Edge, Graph, Node, Position, Snapshot};
pub use layout::{LayoutResult, Viewport, center_and_fit, compute_layout, tidy_graph};
pub use merge::{MergeReport, MergeStatus, plan_merge};
pub use store::{GraphStore, Mutation, MutationSource};
pub use topic::{Topic, Workspace};
