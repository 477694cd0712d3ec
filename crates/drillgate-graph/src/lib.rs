//! # drillgate-graph
//!
//! The Graph Loader: reads one workspace's content tree out of a blob store
//! into an immutable arena of typed nodes, and records every cross-document
//! reference as a deferred edge.
//!
//! ## Data model
//!
//! ```text
//! BlobStore keys ({ws}/**/*.json)
//!     │  parse + tag (DocKind, SchemaVersion)
//! Node arena (Vec<Node>, indexed by canonical path)
//!     │  extract
//! Reference edges (source, target, expected kind), resolved by lookup
//! ```
//!
//! References are never followed recursively, so back-references and
//! cycles between documents cannot make loading diverge.

pub mod document;
pub mod graph;
pub mod loader;
pub mod paths;
pub mod view;

pub use document::{DocKind, Node, NodeId, RefField, RefTarget, Reference, SchemaVersion};
pub use graph::{ContentGraph, Resolution};
pub use loader::{
    DEFAULT_MAX_PARSE_ERRORS, LoadError, LoadOptions, LoadedWorkspace, discover_workspaces,
    load_workspace,
};
pub use paths::{catalog_path, page_number, resolve_url, workspace_of};
pub use view::{AnalyticsView, EntryView, IndexView, NextPage, PromptView, ScenarioView};
