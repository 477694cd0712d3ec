//! Candidate-vs-active comparison: the published shape of a document may
//! grow, but must not shrink, retype, or move back a schema version.

use crate::schema::{json_type_name, policy_for};
use drillgate_graph::{ContentGraph, Node};
use drillgate_kernel::{FindingCode, FindingSink};
use serde_json::{Map, Value};

fn compare_fields(
    candidate: &Node,
    prefix: &str,
    new: &Map<String, Value>,
    old: &Map<String, Value>,
    sink: &mut FindingSink,
) {
    let policy = policy_for(&candidate.version, candidate.kind);
    for (name, old_value) in old {
        let path = format!("{prefix}{name}");
        match new.get(name) {
            Some(new_value) => {
                let (was, now) = (json_type_name(old_value), json_type_name(new_value));
                if was != now && was != "null" && now != "null" {
                    sink.report(
                        FindingCode::FieldRetyped,
                        &candidate.path,
                        format!("`{path}` changed from {was} to {now} since the active version"),
                    );
                }
            }
            None => {
                let required = policy
                    .as_ref()
                    .and_then(|p| p.rule(&path))
                    .is_some_and(|rule| rule.required);
                // Required fields are already reported missing by the schema stage.
                if !required {
                    sink.report(
                        FindingCode::FieldRemoved,
                        &candidate.path,
                        format!("`{path}` is present in the active version but was removed"),
                    );
                }
            }
        }
    }
}

pub fn compare_node(candidate: &Node, active: &Node, sink: &mut FindingSink) {
    match (candidate.version.number(), active.version.number()) {
        (Some(now), Some(was)) if now < was => {
            sink.report(
                FindingCode::SchemaDowngrade,
                &candidate.path,
                format!("schemaVersion {now} is older than the active {was}"),
            );
            return;
        }
        (Some(now), Some(was)) if now == was => {}
        _ => return,
    }

    let (Some(new), Some(old)) = (candidate.doc.as_object(), active.doc.as_object()) else {
        return;
    };
    compare_fields(candidate, "", new, old, sink);

    if let (Some(Value::Object(new)), Some(Value::Object(old))) =
        (new.get("analytics"), old.get("analytics"))
    {
        compare_fields(candidate, "analytics.", new, old, sink);
    }
}

/// Compare every document present in both trees, matched by path.
pub fn compare_graphs(candidate: &ContentGraph, active: &ContentGraph, sink: &mut FindingSink) {
    for node in candidate.nodes() {
        if let Some(previous) = active.node_at(&node.path)
            && previous.kind == node.kind
        {
            compare_node(node, previous, sink);
        }
    }
}
