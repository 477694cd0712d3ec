//! Immutable arena of loaded documents plus their deferred edges.

use crate::document::{DocKind, Node, NodeId, RefTarget, Reference, SchemaVersion};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of looking one reference up in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Target exists. May still be the wrong kind; callers compare.
    Found(NodeId),
    /// Entry id exists, but only under other kinds.
    WrongKind { found: Vec<NodeId> },
    Missing,
}

#[derive(Debug, Clone, Default)]
pub struct ContentGraph {
    workspace: String,
    nodes: Vec<Node>,
    by_path: BTreeMap<String, NodeId>,
    entries: BTreeMap<(DocKind, String), Vec<NodeId>>,
    edges: Vec<Reference>,
    /// Paths that exist in the store but could not be read or parsed.
    rejected: BTreeSet<String>,
}

impl ContentGraph {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Self::default()
        }
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Insert a parsed document. Paths are unique keys in a blob store, so a
    /// repeated path replaces nothing and is ignored.
    pub fn insert(
        &mut self,
        path: String,
        kind: DocKind,
        version: SchemaVersion,
        doc: Value,
    ) -> Option<NodeId> {
        if self.by_path.contains_key(&path) {
            return None;
        }
        let id = NodeId(self.nodes.len());
        if kind.is_entry()
            && let Some(entry_id) = doc.get("id").and_then(Value::as_str)
        {
            self.entries
                .entry((kind, entry_id.to_string()))
                .or_default()
                .push(id);
        }
        self.by_path.insert(path.clone(), id);
        self.nodes.push(Node {
            id,
            path,
            kind,
            version,
            doc,
        });
        Some(id)
    }

    pub fn add_edge(&mut self, edge: Reference) {
        self.edges.push(edge);
    }

    /// Record a document the loader found but had to exclude.
    pub fn mark_rejected(&mut self, path: impl Into<String>) {
        self.rejected.insert(path.into());
    }

    pub fn is_rejected(&self, path: &str) -> bool {
        self.rejected.contains(path)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_at(&self, path: &str) -> Option<&Node> {
        self.by_path.get(path).map(|id| self.node(*id))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edges(&self) -> &[Reference] {
        &self.edges
    }

    pub fn catalog(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == DocKind::Catalog)
    }

    /// All entry nodes, in load (path) order.
    pub fn entries(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind.is_entry())
    }

    pub fn nodes_of(&self, kind: DocKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Entry nodes sharing `(kind, id)`.
    pub fn entries_with_id(&self, kind: DocKind, id: &str) -> &[NodeId] {
        self.entries
            .get(&(kind, id.to_string()))
            .map_or(&[], Vec::as_slice)
    }

    pub fn entry_by_id(&self, kind: DocKind, id: &str) -> Option<&Node> {
        self.entries_with_id(kind, id).first().map(|id| self.node(*id))
    }

    /// Every `(kind, id)` group, ordered.
    pub fn entry_groups(&self) -> impl Iterator<Item = (&(DocKind, String), &Vec<NodeId>)> {
        self.entries.iter()
    }

    pub fn resolve(&self, target: &RefTarget) -> Resolution {
        match target {
            RefTarget::Path(path) => match self.by_path.get(path) {
                Some(id) => Resolution::Found(*id),
                None => Resolution::Missing,
            },
            RefTarget::EntryId { kind: Some(kind), id } => {
                if let Some(first) = self.entries_with_id(*kind, id).first() {
                    return Resolution::Found(*first);
                }
                let found: Vec<NodeId> = DocKind::ENTRY_KINDS
                    .iter()
                    .flat_map(|k| self.entries_with_id(*k, id).iter().copied())
                    .collect();
                if found.is_empty() {
                    Resolution::Missing
                } else {
                    Resolution::WrongKind { found }
                }
            }
            RefTarget::EntryId { kind: None, id } => DocKind::ENTRY_KINDS
                .iter()
                .find_map(|k| self.entries_with_id(*k, id).first().copied())
                .map_or(Resolution::Missing, Resolution::Found),
            RefTarget::Unresolvable(_) => Resolution::Missing,
        }
    }
}
