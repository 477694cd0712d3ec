//! Workspace loading: blob keys in, node arena and reference edges out.

use crate::document::{DocKind, NodeId, RefField, RefTarget, Reference, SchemaVersion};
use crate::graph::ContentGraph;
use crate::paths::resolve_url;
use drillgate_kernel::{FindingCode, FindingSink};
use drillgate_store::{BlobStore, StoreError};
use serde_json::Value;
use tracing::{debug, warn};

pub const DEFAULT_MAX_PARSE_ERRORS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Stripped from reference URLs after the leading `/`.
    pub url_prefix: String,
    /// Read and parse errors tolerated before the workspace load is abandoned.
    /// `0` disables the limit.
    pub max_parse_errors: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            url_prefix: String::new(),
            max_parse_errors: DEFAULT_MAX_PARSE_ERRORS,
        }
    }
}

#[derive(Debug)]
pub struct LoadedWorkspace {
    pub graph: ContentGraph,
    /// Loader findings (`ReadError`, `ParseError`, `ParseStormAborted`).
    pub findings: FindingSink,
    /// JSON documents read, including ones that failed to parse.
    pub document_count: usize,
}

/// Top-level prefixes that hold a `catalog.json`, sorted.
pub fn discover_workspaces(store: &dyn BlobStore) -> Result<Vec<String>, LoadError> {
    let mut out: Vec<String> = store
        .list("")?
        .into_iter()
        .filter_map(|key| {
            let (ws, rest) = key.split_once('/')?;
            (rest == "catalog.json").then(|| ws.to_string())
        })
        .collect();
    out.sort();
    out.dedup();
    Ok(out)
}

pub fn load_workspace(
    store: &dyn BlobStore,
    workspace: &str,
    opts: &LoadOptions,
) -> Result<LoadedWorkspace, LoadError> {
    let prefix = format!("{workspace}/");
    let keys: Vec<String> = store
        .list(&prefix)?
        .into_iter()
        .filter(|k| k.ends_with(".json"))
        .collect();

    let mut graph = ContentGraph::new(workspace);
    let mut findings = FindingSink::new(workspace);
    let mut parse_errors = 0usize;
    let mut document_count = 0usize;

    for key in &keys {
        if opts.max_parse_errors > 0 && parse_errors >= opts.max_parse_errors {
            warn!(workspace, parse_errors, "parse storm; abandoning workspace load");
            findings.report(
                FindingCode::ParseStormAborted,
                &prefix,
                format!(
                    "stopped after {parse_errors} unreadable documents; {} documents not read",
                    keys.len() - document_count
                ),
            );
            break;
        }

        let blob = match store.get(key) {
            Ok(Some(blob)) => blob,
            Ok(None) => continue,
            Err(err) => {
                document_count += 1;
                parse_errors += 1;
                warn!(path = %key, error = %err, "document unreadable");
                findings.report(FindingCode::ReadError, key, err.to_string());
                graph.mark_rejected(key.clone());
                continue;
            }
        };
        document_count += 1;

        let doc = match parse_document(&blob.bytes) {
            Ok(doc) => doc,
            Err(message) => {
                parse_errors += 1;
                debug!(path = %key, %message, "document rejected");
                findings.report(FindingCode::ParseError, key, message);
                graph.mark_rejected(key.clone());
                continue;
            }
        };

        let Some(kind) = doc.get("kind").and_then(Value::as_str).and_then(DocKind::parse) else {
            parse_errors += 1;
            let message = match doc.get("kind") {
                None => "document has no `kind`".to_string(),
                Some(raw) => format!("unrecognized document kind {raw}"),
            };
            findings.report(FindingCode::ParseError, key, message);
            graph.mark_rejected(key.clone());
            continue;
        };

        let version = SchemaVersion::from_value(doc.get("schemaVersion"));
        let refs = extract_references(kind, &doc, &opts.url_prefix);
        debug!(path = %key, kind = %kind, version = %version, refs = refs.len(), "document loaded");
        if let Some(id) = graph.insert(key.clone(), kind, version, doc) {
            for pending in refs {
                graph.add_edge(pending.into_reference(id));
            }
        }
    }

    Ok(LoadedWorkspace {
        graph,
        findings,
        document_count,
    })
}

fn parse_document(bytes: &[u8]) -> Result<Value, String> {
    let doc: Value = serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {e}"))?;
    if !doc.is_object() {
        return Err("top-level JSON value is not an object".to_string());
    }
    Ok(doc)
}

/// Edge waiting for its source node id.
struct PendingRef {
    field: RefField,
    locator: String,
    raw: String,
    target: RefTarget,
    expected: Option<DocKind>,
    summary_id: Option<String>,
}

impl PendingRef {
    fn url(
        field: RefField,
        locator: String,
        raw: &str,
        url_prefix: &str,
        expected: Option<DocKind>,
    ) -> Self {
        let target = match resolve_url(raw, url_prefix) {
            Some(path) => RefTarget::Path(path),
            None => RefTarget::Unresolvable(raw.to_string()),
        };
        Self {
            field,
            locator,
            raw: raw.to_string(),
            target,
            expected,
            summary_id: None,
        }
    }

    fn into_reference(self, source: NodeId) -> Reference {
        Reference {
            source,
            field: self.field,
            locator: self.locator,
            raw: self.raw,
            target: self.target,
            expected: self.expected,
            summary_id: self.summary_id,
        }
    }
}

fn entry_kind(value: Option<&Value>) -> Option<DocKind> {
    value
        .and_then(Value::as_str)
        .and_then(DocKind::parse)
        .filter(|k| k.is_entry())
}

fn extract_references(kind: DocKind, doc: &Value, url_prefix: &str) -> Vec<PendingRef> {
    let mut out = Vec::new();
    match kind {
        DocKind::Catalog => {
            for (i, section) in array(doc, "sections").iter().enumerate() {
                if let Some(raw) = section.get("itemsUrl").and_then(Value::as_str) {
                    out.push(PendingRef::url(
                        RefField::ItemsUrl,
                        format!("sections[{i}].itemsUrl"),
                        raw,
                        url_prefix,
                        Some(DocKind::Index),
                    ));
                }
            }
        }
        DocKind::Index => {
            for (i, item) in array(doc, "items").iter().enumerate() {
                if let Some(raw) = item.get("entryUrl").and_then(Value::as_str) {
                    let mut pending = PendingRef::url(
                        RefField::EntryUrl,
                        format!("items[{i}].entryUrl"),
                        raw,
                        url_prefix,
                        entry_kind(item.get("kind")),
                    );
                    pending.summary_id = item.get("id").and_then(Value::as_str).map(str::to_string);
                    out.push(pending);
                }
            }
            if let Some(raw) = doc.get("nextPage").and_then(Value::as_str) {
                out.push(PendingRef::url(
                    RefField::NextPage,
                    "nextPage".to_string(),
                    raw,
                    url_prefix,
                    Some(DocKind::Index),
                ));
            }
        }
        DocKind::Track => {
            for (i, step) in array(doc, "sessionPlan").iter().enumerate() {
                let step_kind = entry_kind(step.get("kind"));
                for (j, id) in array(step, "itemIds").iter().enumerate() {
                    let Some(id) = id.as_str() else { continue };
                    out.push(PendingRef {
                        field: RefField::ItemIds,
                        locator: format!("sessionPlan[{i}].itemIds[{j}]"),
                        raw: id.to_string(),
                        target: RefTarget::EntryId {
                            kind: step_kind,
                            id: id.to_string(),
                        },
                        expected: step_kind,
                        summary_id: None,
                    });
                }
            }
        }
        DocKind::Pack | DocKind::Drill | DocKind::Exam => {}
    }
    out
}

fn array<'a>(value: &'a Value, name: &str) -> &'a [Value] {
    value
        .get(name)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillgate_store::MemoryBlobStore;
    use serde_json::json;

    fn store() -> MemoryBlobStore {
        let store = MemoryBlobStore::new();
        store
            .insert_json(
                "es/catalog.json",
                &json!({
                    "schemaVersion": 1, "kind": "catalog", "workspace": "es",
                    "sections": [{"id": "packs", "kind": "pack", "title": "Packs",
                                  "itemsUrl": "/es/packs/index.json"}]
                }),
            )
            .unwrap();
        store
            .insert_json(
                "es/packs/index.json",
                &json!({
                    "schemaVersion": 1, "kind": "index", "page": 1, "pageSize": 10,
                    "items": [{"id": "a", "kind": "pack", "title": "A",
                               "entryUrl": "/es/packs/a/pack.json"}],
                    "nextPage": null
                }),
            )
            .unwrap();
        store
            .insert_json(
                "es/packs/a/pack.json",
                &json!({"schemaVersion": 1, "kind": "pack", "id": "a"}),
            )
            .unwrap();
        store
            .insert_json(
                "es/tracks/t/track.json",
                &json!({"schemaVersion": 2, "kind": "track", "id": "t",
                        "sessionPlan": [{"kind": "pack", "itemIds": ["a", "missing"]}]}),
            )
            .unwrap();
        store
    }

    #[test]
    fn discovers_only_prefixes_with_catalog() {
        let store = store();
        store.insert("fr/packs/index.json", "{}").unwrap();
        store.insert("de/catalog.json", "{}").unwrap();
        assert_eq!(discover_workspaces(&store).unwrap(), vec!["de", "es"]);
    }

    #[test]
    fn loads_nodes_and_edges() {
        let loaded = load_workspace(&store(), "es", &LoadOptions::default()).unwrap();
        assert!(loaded.findings.is_empty());
        assert_eq!(loaded.document_count, 4);
        assert_eq!(loaded.graph.len(), 4);

        let edges = loaded.graph.edges();
        let fields: Vec<_> = edges.iter().map(|e| (e.field, e.locator.as_str())).collect();
        assert!(fields.contains(&(RefField::ItemsUrl, "sections[0].itemsUrl")));
        assert!(fields.contains(&(RefField::EntryUrl, "items[0].entryUrl")));
        assert!(fields.contains(&(RefField::ItemIds, "sessionPlan[0].itemIds[1]")));

        let entry_edge = edges
            .iter()
            .find(|e| e.field == RefField::EntryUrl)
            .unwrap();
        assert_eq!(
            entry_edge.target,
            RefTarget::Path("es/packs/a/pack.json".to_string())
        );
        assert_eq!(entry_edge.expected, Some(DocKind::Pack));
        assert_eq!(entry_edge.summary_id.as_deref(), Some("a"));
    }

    #[test]
    fn malformed_documents_become_parse_errors() {
        let store = store();
        store.insert("es/broken.json", "{not json").unwrap();
        store.insert("es/list.json", "[1, 2]").unwrap();
        store.insert("es/nokind.json", r#"{"id": "x"}"#).unwrap();
        store.insert("es/readme.txt", "ignored").unwrap();

        let loaded = load_workspace(&store, "es", &LoadOptions::default()).unwrap();
        assert_eq!(loaded.graph.len(), 4);
        assert_eq!(loaded.document_count, 7);
        let paths: Vec<_> = loaded
            .findings
            .findings()
            .iter()
            .map(|f| (f.code, f.path.as_str()))
            .collect();
        assert_eq!(
            paths,
            vec![
                (FindingCode::ParseError, "es/broken.json"),
                (FindingCode::ParseError, "es/list.json"),
                (FindingCode::ParseError, "es/nokind.json"),
            ]
        );
        assert!(loaded.graph.is_rejected("es/broken.json"));
        assert!(loaded.graph.is_rejected("es/nokind.json"));
        assert!(!loaded.graph.is_rejected("es/catalog.json"));
    }

    #[test]
    fn parse_storm_stops_the_load() {
        let store = MemoryBlobStore::new();
        store.insert("es/catalog.json", "nope").unwrap();
        for i in 0..5 {
            store.insert(&format!("es/bad/{i}.json"), "nope").unwrap();
        }
        let opts = LoadOptions {
            max_parse_errors: 3,
            ..LoadOptions::default()
        };
        let loaded = load_workspace(&store, "es", &opts).unwrap();
        assert_eq!(loaded.document_count, 3);
        assert!(loaded.findings.has_code(FindingCode::ParseStormAborted));
        assert_eq!(loaded.findings.len(), 4);
    }

    #[test]
    fn unaddressable_urls_are_kept_as_unresolvable() {
        let store = MemoryBlobStore::new();
        store
            .insert_json(
                "es/catalog.json",
                &json!({"kind": "catalog",
                        "sections": [{"id": "x", "itemsUrl": "https://cdn/es/x/index.json"}]}),
            )
            .unwrap();
        let loaded = load_workspace(&store, "es", &LoadOptions::default()).unwrap();
        assert_eq!(
            loaded.graph.edges()[0].target,
            RefTarget::Unresolvable("https://cdn/es/x/index.json".to_string())
        );
    }
}
