//! Exact title collisions and near-duplicate prompt text.
//!
//! Near-duplicates use Jaccard similarity over word-trigram shingles
//! (unigrams for prompts under three tokens). They are warnings: two
//! prompts can legitimately differ by a single slot.

use crate::config::{GateConfig, NearDuplicateScope};
use crate::tokens::{jaccard, shingles, tokenize};
use drillgate_graph::{ContentGraph, EntryView, Node};
use drillgate_kernel::{FindingCode, FindingSink};
use std::collections::{BTreeMap, BTreeSet};

fn check_titles(graph: &ContentGraph, sink: &mut FindingSink) {
    let mut by_title: BTreeMap<&str, Vec<&Node>> = BTreeMap::new();
    for node in graph.entries() {
        if let Some(title) = node.title() {
            let title = title.trim();
            if !title.is_empty() {
                by_title.entry(title).or_default().push(node);
            }
        }
    }
    for (title, nodes) in by_title {
        let Some((first, rest)) = nodes.split_first() else {
            continue;
        };
        for other in rest {
            if other.doc_id() == first.doc_id() {
                continue;
            }
            sink.report(
                FindingCode::DuplicateTitle,
                &other.path,
                format!(
                    "title {title:?} of {} {:?} is already used by {} {:?} at {}",
                    other.kind,
                    other.doc_id().unwrap_or(""),
                    first.kind,
                    first.doc_id().unwrap_or(""),
                    first.path
                ),
            );
        }
    }
}

struct PromptShingles<'a> {
    node: &'a Node,
    label: String,
    set: BTreeSet<String>,
}

fn collect_prompts(graph: &ContentGraph) -> Vec<PromptShingles<'_>> {
    let mut out = Vec::new();
    for node in graph.entries() {
        let view = EntryView::from_value(&node.doc);
        for (index, prompt) in view.prompts.iter().enumerate() {
            let set = shingles(&tokenize(&prompt.text));
            if set.is_empty() {
                continue;
            }
            let label = prompt
                .id
                .clone()
                .unwrap_or_else(|| format!("prompts[{index}]"));
            out.push(PromptShingles {
                node,
                label,
                set,
            });
        }
    }
    out
}

fn check_near_duplicates(graph: &ContentGraph, config: &GateConfig, sink: &mut FindingSink) {
    let prompts = collect_prompts(graph);
    for (i, a) in prompts.iter().enumerate() {
        for b in &prompts[i + 1..] {
            let same_entry = a.node.id == b.node.id;
            if !same_entry && config.near_duplicate_scope == NearDuplicateScope::WithinEntry {
                continue;
            }
            let similarity = jaccard(&a.set, &b.set);
            if similarity < config.near_duplicate_threshold {
                continue;
            }
            let message = if same_entry {
                format!("prompts {} and {} are {similarity:.3} similar", a.label, b.label)
            } else {
                format!(
                    "prompt {} is {similarity:.3} similar to {} in {}",
                    b.label, a.label, a.node.path
                )
            };
            sink.report(FindingCode::NearDuplicatePrompt, &b.node.path, message);
        }
    }
}

pub fn check_graph(graph: &ContentGraph, config: &GateConfig, sink: &mut FindingSink) {
    check_titles(graph, sink);
    check_near_duplicates(graph, config, sink);
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillgate_graph::{DocKind, SchemaVersion};
    use serde_json::{Value, json};

    fn drill(id: &str, title: &str, prompts: &[&str]) -> Value {
        let prompts: Vec<Value> = prompts
            .iter()
            .enumerate()
            .map(|(i, text)| json!({"id": format!("p{}", i + 1), "text": text}))
            .collect();
        json!({"kind": "drill", "id": id, "title": title, "prompts": prompts})
    }

    fn graph(docs: &[Value]) -> ContentGraph {
        let mut g = ContentGraph::new("es");
        for doc in docs {
            let id = doc["id"].as_str().unwrap();
            g.insert(
                format!("es/drills/{id}/drill.json"),
                DocKind::Drill,
                SchemaVersion::V1,
                doc.clone(),
            );
        }
        g
    }

    fn run(docs: &[Value], config: &GateConfig) -> Vec<(FindingCode, String, String)> {
        let mut sink = FindingSink::new("es");
        check_graph(&graph(docs), config, &mut sink);
        sink.into_findings()
            .into_iter()
            .map(|f| (f.code, f.path, f.message))
            .collect()
    }

    #[test]
    fn trimmed_titles_collide_across_ids() {
        let got = run(
            &[
                drill("a", "At the café", &[]),
                drill("b", "  At the café ", &[]),
                drill("c", "At the Café", &[]),
            ],
            &GateConfig::default(),
        );
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].0, FindingCode::DuplicateTitle);
        assert_eq!(got[0].1, "es/drills/b/drill.json");
    }

    #[test]
    fn near_duplicates_within_entry() {
        let got = run(
            &[drill(
                "a",
                "A",
                &[
                    "quiero un café con leche por favor",
                    "Quiero un café con leche, por favor!",
                    "dónde está la estación de tren",
                ],
            )],
            &GateConfig::default(),
        );
        assert_eq!(
            got,
            vec![(
                FindingCode::NearDuplicatePrompt,
                "es/drills/a/drill.json".to_string(),
                "prompts p1 and p2 are 1.000 similar".to_string()
            )]
        );
    }

    #[test]
    fn cross_entry_pairs_need_workspace_scope() {
        let docs = [
            drill("a", "A", &["yo tengo dos hermanos mayores"]),
            drill("b", "B", &["yo tengo dos hermanos mayores"]),
        ];
        assert!(run(&docs, &GateConfig::default()).is_empty());

        let config = GateConfig {
            near_duplicate_scope: NearDuplicateScope::Workspace,
            ..GateConfig::default()
        };
        let got = run(&docs, &config);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].1, "es/drills/b/drill.json");
        assert!(got[0].2.contains("es/drills/a/drill.json"));
    }

    #[test]
    fn threshold_is_inclusive() {
        // 4 trigrams each, 3 shared: 3/5 = 0.6.
        let docs = [drill(
            "a",
            "A",
            &["uno dos tres cuatro cinco seis", "uno dos tres cuatro cinco siete"],
        )];
        let at = GateConfig {
            near_duplicate_threshold: 0.6,
            ..GateConfig::default()
        };
        assert_eq!(run(&docs, &at).len(), 1);
        let above = GateConfig {
            near_duplicate_threshold: 0.61,
            ..GateConfig::default()
        };
        assert!(run(&docs, &above).is_empty());
    }
}
