//! Referential integrity: edge resolution, identifier uniqueness,
//! pagination chains, and reachability from the catalog.

use drillgate_graph::{
    ContentGraph, DocKind, IndexView, NextPage, Node, NodeId, RefField, RefTarget, Reference,
    Resolution, catalog_path, page_number, workspace_of,
};
use drillgate_kernel::{FindingCode, FindingSink};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

fn expected_label(expected: Option<DocKind>) -> &'static str {
    expected.map_or("an entry", DocKind::as_str)
}

/// Resolve one edge; `Some` only when the target exists in this workspace.
fn resolve_edge(graph: &ContentGraph, edge: &Reference, sink: &mut FindingSink) -> Option<NodeId> {
    let source = graph.node(edge.source);
    let ws = graph.workspace();

    if let RefTarget::Path(path) = &edge.target
        && workspace_of(path) != ws
    {
        sink.report(
            FindingCode::CrossWorkspaceReference,
            &source.path,
            format!("{} -> {path} leaves workspace {ws}", edge.locator),
        );
        return None;
    }

    let target = match graph.resolve(&edge.target) {
        Resolution::Found(id) => id,
        Resolution::WrongKind { found } => {
            let kinds: Vec<&str> = found.iter().map(|id| graph.node(*id).kind.as_str()).collect();
            sink.report(
                FindingCode::KindMismatch,
                &source.path,
                format!(
                    "{} -> {:?} expects {}, found only {}",
                    edge.locator,
                    edge.raw,
                    expected_label(edge.expected),
                    kinds.join(", ")
                ),
            );
            return found.first().copied();
        }
        Resolution::Missing => {
            let message = match &edge.target {
                RefTarget::Path(path) if graph.is_rejected(path) => format!(
                    "{} -> {path}: target could not be read or parsed",
                    edge.locator
                ),
                RefTarget::Path(path) => format!("{} -> {path}: no such document", edge.locator),
                RefTarget::EntryId { id, .. } => format!(
                    "{} -> {id:?}: no {} with that id",
                    edge.locator,
                    expected_label(edge.expected)
                ),
                RefTarget::Unresolvable(raw) => {
                    format!("{} -> {raw:?}: not an addressable document URL", edge.locator)
                }
            };
            sink.report(FindingCode::DanglingReference, &source.path, message);
            return None;
        }
    };

    let node = graph.node(target);
    let kind_ok = match edge.expected {
        Some(kind) => node.kind == kind,
        None => node.kind.is_entry(),
    };
    if !kind_ok {
        sink.report(
            FindingCode::KindMismatch,
            &source.path,
            format!(
                "{} -> {} expects {}, found {}",
                edge.locator,
                node.path,
                expected_label(edge.expected),
                node.kind
            ),
        );
    }

    if let Some(summary_id) = &edge.summary_id
        && node.doc_id() != Some(summary_id.as_str())
    {
        sink.report(
            FindingCode::SummaryMismatch,
            &source.path,
            format!(
                "{} lists id {summary_id:?} but {} declares {:?}",
                edge.locator,
                node.path,
                node.doc_id().unwrap_or("")
            ),
        );
    }
    Some(target)
}

fn check_duplicate_ids(graph: &ContentGraph, sink: &mut FindingSink) {
    for ((kind, id), nodes) in graph.entry_groups() {
        let Some((first, rest)) = nodes.split_first() else {
            continue;
        };
        let first = graph.node(*first);
        for other in rest {
            let other = graph.node(*other);
            sink.report(
                FindingCode::DuplicateId,
                &other.path,
                format!(
                    "{kind} id {id:?} already declared by {} (titles {:?} and {:?})",
                    first.path,
                    first.title().unwrap_or(""),
                    other.title().unwrap_or("")
                ),
            );
        }
    }
}

fn check_catalog(graph: &ContentGraph, catalog: &Node, sink: &mut FindingSink) {
    let ws = graph.workspace();
    if catalog.path != catalog_path(ws) {
        sink.report(
            FindingCode::WorkspaceMismatch,
            &catalog.path,
            format!("catalog must live at {}", catalog_path(ws)),
        );
    }
    if let Some(declared) = catalog.str_field("workspace")
        && declared != ws
    {
        sink.report(
            FindingCode::WorkspaceMismatch,
            &catalog.path,
            format!("catalog declares workspace {declared:?} but is stored under {ws:?}"),
        );
    }

    let mut seen = BTreeSet::new();
    let sections = catalog
        .doc
        .get("sections")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);
    for (i, section) in sections.iter().enumerate() {
        if let Some(id) = section.get("id").and_then(Value::as_str)
            && !seen.insert(id)
        {
            sink.report(
                FindingCode::DuplicateId,
                &catalog.path,
                format!("sections[{i}] repeats section id {id:?}"),
            );
        }
    }
}

fn show(value: Option<u64>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

/// Walk one `nextPage` chain from its head.
fn check_chain(
    graph: &ContentGraph,
    head: NodeId,
    next_of: &BTreeMap<NodeId, NodeId>,
    sink: &mut FindingSink,
) {
    let head_node = graph.node(head);
    let head_view = IndexView::from_value(&head_node.doc);
    if head_view.page != Some(1) {
        sink.report(
            FindingCode::PaginationStart,
            &head_node.path,
            format!(
                "index chain must start at page 1, found {}",
                show(head_view.page)
            ),
        );
    }

    let mut visited = BTreeSet::new();
    let mut pages: Vec<(&Node, IndexView)> = Vec::new();
    let mut current = head;
    let complete = loop {
        if !visited.insert(current) {
            sink.report(
                FindingCode::PaginationCycle,
                &head_node.path,
                format!("chain revisits {}", graph.node(current).path),
            );
            break false;
        }
        let node = graph.node(current);
        let view = IndexView::from_value(&node.doc);

        if let Some((first, first_view)) = pages.first()
            && view.page_size != first_view.page_size
        {
            sink.report(
                FindingCode::PageSizeMismatch,
                &node.path,
                format!(
                    "pageSize {} differs from {} declared by {}",
                    show(view.page_size),
                    show(first_view.page_size),
                    first.path
                ),
            );
        }
        if let Some(size) = view.page_size
            && view.item_count as u64 > size
        {
            sink.report(
                FindingCode::PageOverflow,
                &node.path,
                format!("{} items exceed pageSize {size}", view.item_count),
            );
        }
        if let Some((prev, prev_view)) = pages.last()
            && let (Some(prev_page), Some(page)) = (prev_view.page, view.page)
            && page != prev_page + 1
        {
            sink.report(
                FindingCode::PaginationGap,
                &node.path,
                format!("page {page} follows page {prev_page} of {}", prev.path),
            );
        }

        let terminal = match &view.next_page {
            NextPage::Null => Some(true),
            NextPage::Missing | NextPage::Invalid => Some(false),
            NextPage::Url(raw) => {
                check_next_url(graph, node, &view, raw, sink);
                None
            }
        };
        pages.push((node, view));
        if let Some(complete) = terminal {
            break complete;
        }
        match next_of.get(&current).copied() {
            Some(id) if graph.node(id).kind == DocKind::Index => current = id,
            _ => break false,
        }
    };

    if !complete {
        return;
    }
    let sum: usize = pages.iter().map(|(_, v)| v.item_count).sum();
    for (node, view) in &pages {
        if let Some(total) = view.total
            && total != sum as u64
        {
            sink.report(
                FindingCode::TotalMismatch,
                &node.path,
                format!("total {total} but the chain holds {sum} items"),
            );
        }
    }
}

fn check_next_url(
    graph: &ContentGraph,
    node: &Node,
    view: &IndexView,
    raw: &str,
    sink: &mut FindingSink,
) {
    let target = graph
        .edges()
        .iter()
        .find(|e| e.source == node.id && e.field == RefField::NextPage)
        .map(|e| &e.target);
    let n = match target {
        Some(RefTarget::Path(path)) => page_number(path),
        _ => None,
    };
    match n {
        None => sink.report(
            FindingCode::MalformedNextPage,
            &node.path,
            format!("nextPage {raw:?} does not name a .../pages/{{n}}.json document"),
        ),
        Some(n) if n < 2 => sink.report(
            FindingCode::MalformedNextPage,
            &node.path,
            format!("nextPage {raw:?} names page {n}; continuation pages start at 2"),
        ),
        Some(n) => {
            if let Some(page) = view.page
                && n != page + 1
            {
                sink.report(
                    FindingCode::MalformedNextPage,
                    &node.path,
                    format!("nextPage {raw:?} names page {n}, expected page {}", page + 1),
                );
            }
        }
    }
}

/// Check every edge, identifier scope, pagination chain, and reachability.
pub fn check_graph(graph: &ContentGraph, sink: &mut FindingSink) {
    let mut resolved: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    let mut next_of = BTreeMap::new();
    let mut heads = BTreeSet::new();
    for edge in graph.edges() {
        if let Some(target) = resolve_edge(graph, edge, sink) {
            resolved.entry(edge.source).or_default().push(target);
            match edge.field {
                RefField::NextPage => {
                    next_of.insert(edge.source, target);
                }
                RefField::ItemsUrl if graph.node(target).kind == DocKind::Index => {
                    heads.insert(target);
                }
                _ => {}
            }
        }
    }

    check_duplicate_ids(graph, sink);

    let Some(catalog) = graph.catalog() else {
        return;
    };
    check_catalog(graph, catalog, sink);

    for head in &heads {
        check_chain(graph, *head, &next_of, sink);
    }

    let mut reachable = BTreeSet::from([catalog.id]);
    let mut queue = VecDeque::from([catalog.id]);
    while let Some(id) = queue.pop_front() {
        for target in resolved.get(&id).into_iter().flatten() {
            if reachable.insert(*target) {
                queue.push_back(*target);
            }
        }
    }
    for node in graph.nodes() {
        if !reachable.contains(&node.id) {
            sink.report(
                FindingCode::OrphanDocument,
                &node.path,
                format!("{} is not reachable from {}", node.kind, catalog.path),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillgate_graph::{LoadOptions, load_workspace};
    use drillgate_kernel::Finding;
    use drillgate_store::MemoryBlobStore;
    use serde_json::json;

    fn pack(id: &str, title: &str) -> Value {
        json!({"schemaVersion": 1, "kind": "pack", "id": id, "title": title})
    }

    fn page(page: u64, items: &[(&str, &str)], next: Value, total: Option<u64>) -> Value {
        let items: Vec<Value> = items
            .iter()
            .map(|(id, url)| json!({"id": id, "kind": "pack", "title": id, "entryUrl": url}))
            .collect();
        let mut doc = json!({"schemaVersion": 1, "kind": "index", "page": page,
                             "pageSize": 2, "items": items, "nextPage": next});
        if let Some(total) = total {
            doc["total"] = json!(total);
        }
        doc
    }

    fn base_store() -> MemoryBlobStore {
        let store = MemoryBlobStore::new();
        store
            .insert_json(
                "es/catalog.json",
                &json!({"schemaVersion": 1, "kind": "catalog", "workspace": "es",
                        "sections": [{"id": "packs", "kind": "pack", "title": "Packs",
                                      "itemsUrl": "/es/packs/index.json"}]}),
            )
            .unwrap();
        for id in ["a", "b", "c"] {
            store
                .insert_json(&format!("es/packs/{id}/pack.json"), &pack(id, id))
                .unwrap();
        }
        store
    }

    fn findings(store: &MemoryBlobStore) -> Vec<Finding> {
        let loaded = load_workspace(store, "es", &LoadOptions::default()).unwrap();
        let mut sink = FindingSink::new("es");
        check_graph(&loaded.graph, &mut sink);
        sink.into_findings()
    }

    fn codes(store: &MemoryBlobStore) -> Vec<FindingCode> {
        findings(store).into_iter().map(|f| f.code).collect()
    }

    fn two_page_store(total: Option<u64>) -> MemoryBlobStore {
        let store = base_store();
        store
            .insert_json(
                "es/packs/index.json",
                &page(
                    1,
                    &[("a", "/es/packs/a/pack.json"), ("b", "/es/packs/b/pack.json")],
                    json!("/es/packs/pages/2.json"),
                    total,
                ),
            )
            .unwrap();
        store
            .insert_json(
                "es/packs/pages/2.json",
                &page(2, &[("c", "/es/packs/c/pack.json")], Value::Null, None),
            )
            .unwrap();
        store
    }

    #[test]
    fn well_formed_chain_is_clean() {
        assert_eq!(codes(&two_page_store(Some(3))), Vec::new());
    }

    #[test]
    fn total_must_match_whole_chain() {
        assert_eq!(codes(&two_page_store(Some(2))), vec![FindingCode::TotalMismatch]);
    }

    #[test]
    fn dangling_entry_url_names_source_and_target() {
        let store = two_page_store(None);
        store
            .insert_json(
                "es/packs/pages/2.json",
                &page(
                    2,
                    &[("c", "/es/packs/c/pack.json"), ("ghost", "/es/packs/ghost/pack.json")],
                    Value::Null,
                    None,
                ),
            )
            .unwrap();
        let found = findings(&store);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, FindingCode::DanglingReference);
        assert_eq!(found[0].path, "es/packs/pages/2.json");
        assert!(found[0].message.contains("es/packs/ghost/pack.json"));
    }

    #[test]
    fn reference_to_unparseable_document_says_so() {
        let store = two_page_store(None);
        store.insert("es/packs/c/pack.json", "{oops").unwrap();
        let found = findings(&store);
        let dangling: Vec<_> = found
            .iter()
            .filter(|f| f.code == FindingCode::DanglingReference)
            .collect();
        assert_eq!(dangling.len(), 1);
        assert!(
            dangling[0].message.contains("could not be read or parsed"),
            "{}",
            dangling[0].message
        );
        assert!(!dangling[0].message.contains("no such document"));
    }

    #[test]
    fn wrong_kind_and_summary_mismatch() {
        let store = two_page_store(None);
        store
            .insert_json(
                "es/packs/pages/2.json",
                &page(2, &[("z", "/es/packs/c/pack.json")], Value::Null, None),
            )
            .unwrap();
        store
            .insert_json(
                "es/packs/b/pack.json",
                &json!({"schemaVersion": 1, "kind": "drill", "id": "b", "title": "b"}),
            )
            .unwrap();
        let got = codes(&store);
        assert!(got.contains(&FindingCode::KindMismatch), "{got:?}");
        assert!(got.contains(&FindingCode::SummaryMismatch), "{got:?}");
    }

    #[test]
    fn duplicate_entry_ids_carry_both_titles() {
        let store = two_page_store(None);
        store
            .insert_json("es/packs/dup/pack.json", &pack("a", "Second A"))
            .unwrap();
        let found = findings(&store);
        let dup = found
            .iter()
            .find(|f| f.code == FindingCode::DuplicateId)
            .unwrap();
        assert_eq!(dup.path, "es/packs/dup/pack.json");
        assert!(dup.message.contains("\"a\""));
        assert!(dup.message.contains("\"Second A\""));
    }

    #[test]
    fn gaps_and_bad_next_urls() {
        let store = two_page_store(None);
        store
            .insert_json(
                "es/packs/index.json",
                &page(
                    1,
                    &[("a", "/es/packs/a/pack.json"), ("b", "/es/packs/b/pack.json")],
                    json!("/es/packs/pages/3.json"),
                    None,
                ),
            )
            .unwrap();
        store
            .insert_json(
                "es/packs/pages/3.json",
                &page(3, &[("c", "/es/packs/c/pack.json")], Value::Null, None),
            )
            .unwrap();
        store.insert("es/packs/pages/2.json", "").unwrap();
        let got = codes(&store);
        assert!(got.contains(&FindingCode::MalformedNextPage), "{got:?}");
        assert!(got.contains(&FindingCode::PaginationGap), "{got:?}");
    }

    #[test]
    fn overflow_size_and_start() {
        let store = base_store();
        let mut head = page(
            2,
            &[
                ("a", "/es/packs/a/pack.json"),
                ("b", "/es/packs/b/pack.json"),
                ("c", "/es/packs/c/pack.json"),
            ],
            Value::Null,
            None,
        );
        head["pageSize"] = json!(2);
        store.insert_json("es/packs/index.json", &head).unwrap();
        let got = codes(&store);
        assert_eq!(
            got,
            vec![FindingCode::PaginationStart, FindingCode::PageOverflow]
        );
    }

    #[test]
    fn cycles_stop_the_walk() {
        let store = two_page_store(Some(3));
        store
            .insert_json(
                "es/packs/pages/2.json",
                &page(2, &[("c", "/es/packs/c/pack.json")], json!("/es/packs/index.json"), None),
            )
            .unwrap();
        let got = codes(&store);
        assert!(got.contains(&FindingCode::PaginationCycle), "{got:?}");
        assert!(!got.contains(&FindingCode::TotalMismatch), "{got:?}");
    }

    #[test]
    fn unreachable_documents_are_orphans() {
        let store = two_page_store(None);
        store
            .insert_json("es/packs/lost/pack.json", &pack("lost", "Lost"))
            .unwrap();
        let found = findings(&store);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, FindingCode::OrphanDocument);
        assert!(!found[0].is_hard());
    }

    #[test]
    fn section_urls_must_stay_in_workspace() {
        let store = two_page_store(None);
        store
            .insert_json(
                "es/catalog.json",
                &json!({"schemaVersion": 1, "kind": "catalog", "workspace": "mx",
                        "sections": [
                            {"id": "packs", "itemsUrl": "/es/packs/index.json"},
                            {"id": "packs", "itemsUrl": "/fr/packs/index.json"}
                        ]}),
            )
            .unwrap();
        let got = codes(&store);
        for code in [
            FindingCode::CrossWorkspaceReference,
            FindingCode::WorkspaceMismatch,
            FindingCode::DuplicateId,
        ] {
            assert!(got.contains(&code), "{code}: {got:?}");
        }
    }

    #[test]
    fn track_item_ids_resolve_by_kind() {
        let store = two_page_store(None);
        store
            .insert_json(
                "es/tracks/t/track.json",
                &json!({"schemaVersion": 1, "kind": "track", "id": "t",
                        "sessionPlan": [
                            {"kind": "pack", "itemIds": ["a", "nope"]},
                            {"kind": "drill", "itemIds": ["b"]}
                        ]}),
            )
            .unwrap();
        let found = findings(&store);
        let got: Vec<_> = found.iter().map(|f| f.code).collect();
        assert!(got.contains(&FindingCode::DanglingReference));
        assert!(got.contains(&FindingCode::KindMismatch));
        // The track itself is not listed anywhere.
        assert!(got.contains(&FindingCode::OrphanDocument));
    }
}
