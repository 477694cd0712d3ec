//! Read-only review snapshot: which entries a human has signed off.
//!
//! Ids are qualified as `{workspace}/{id}` so one snapshot can cover a
//! whole content root.

use drillgate_graph::ContentGraph;
use drillgate_kernel::{FindingCode, FindingSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("failed to read review snapshot: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid review snapshot at {path}: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSnapshot {
    pub approved: Vec<String>,
    pub pending: Vec<String>,
}

impl ReviewSnapshot {
    pub fn load(path: &Path) -> Result<Self, ReviewError> {
        let display = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|source| ReviewError::ReadFile {
            path: display.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ReviewError::ParseJson {
            path: display,
            source,
        })
    }

    fn ids_for<'a>(list: &'a [String], workspace: &str) -> BTreeSet<&'a str> {
        list.iter()
            .filter_map(|q| q.split_once('/'))
            .filter(|(ws, _)| *ws == workspace)
            .map(|(_, id)| id)
            .collect()
    }

    pub fn check(&self, graph: &ContentGraph, sink: &mut FindingSink) {
        let ws = graph.workspace();
        let pending = Self::ids_for(&self.pending, ws);
        let approved = Self::ids_for(&self.approved, ws);

        let mut present = BTreeSet::new();
        for node in graph.entries() {
            let Some(id) = node.doc_id() else { continue };
            present.insert(id);
            if pending.contains(id) && !approved.contains(id) {
                sink.report(
                    FindingCode::UnapprovedEntry,
                    &node.path,
                    format!("{} {id:?} is still pending review", node.kind),
                );
            }
        }
        for id in approved.difference(&present) {
            sink.report(
                FindingCode::StaleApproval,
                &format!("{ws}/"),
                format!("approved id {ws}/{id} has no entry in this version"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillgate_graph::{DocKind, SchemaVersion};
    use serde_json::json;

    #[test]
    fn pending_and_stale_ids_warn() {
        let mut graph = ContentGraph::new("es");
        for id in ["greet", "order"] {
            graph.insert(
                format!("es/packs/{id}/pack.json"),
                DocKind::Pack,
                SchemaVersion::V1,
                json!({"kind": "pack", "id": id}),
            );
        }
        let snapshot: ReviewSnapshot = serde_json::from_value(json!({
            "approved": ["es/greet", "es/retired", "fr/order"],
            "pending": ["es/order", "fr/greet"]
        }))
        .unwrap();

        let mut sink = FindingSink::new("es");
        snapshot.check(&graph, &mut sink);
        let got: Vec<_> = sink
            .findings()
            .iter()
            .map(|f| (f.code, f.path.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (FindingCode::UnapprovedEntry, "es/packs/order/pack.json"),
                (FindingCode::StaleApproval, "es/"),
            ]
        );
        assert!(sink.findings().iter().all(|f| !f.is_hard()));
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let snapshot: ReviewSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, ReviewSnapshot::default());
    }
}
