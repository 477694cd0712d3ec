use crate::support::{EXIT_GATE_FAILED, exit_error, print_json};
use drillgate_checks::analytics::check_entry;
use drillgate_checks::{EntryMetrics, GateConfig};
use drillgate_graph::{DocKind, EntryView, Node, NodeId, SchemaVersion};
use drillgate_kernel::FindingSink;
use serde_json::{Value, json};

fn show_score(score: Option<f64>, absent: &str) -> String {
    score.map_or_else(|| absent.to_string(), |s| s.to_string())
}

pub fn run(entry: String, json_output: bool) {
    let bytes = std::fs::read(&entry)
        .unwrap_or_else(|e| exit_error(format!("failed to read {entry}: {e}")));
    let doc: Value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| exit_error(format!("invalid JSON in {entry}: {e}")));
    let kind = doc
        .get("kind")
        .and_then(Value::as_str)
        .and_then(DocKind::parse)
        .filter(|k| k.is_entry())
        .unwrap_or_else(|| exit_error(format!("{entry} is not a pack, drill, exam, or track")));

    let metrics = EntryMetrics::compute(&EntryView::from_value(&doc));
    let node = Node {
        id: NodeId(0),
        path: entry.clone(),
        kind,
        version: SchemaVersion::from_value(doc.get("schemaVersion")),
        doc,
    };
    let mut sink = FindingSink::new("");
    check_entry(&node, &GateConfig::default(), &mut sink);
    let findings = sink.into_findings();
    let failed = findings.iter().any(|f| f.is_hard());

    if json_output {
        print_json(&json!({
            "entry": entry,
            "kind": kind.as_str(),
            "metrics": metrics,
            "findings": findings,
        }));
    } else {
        println!("drillgate analytics {entry}");
        println!("  Kind: {kind}");
        println!("  Prompts: {}", metrics.prompt_count);
        println!("  Variation slots: {}", metrics.slot_count);
        println!("  Average prompt tokens: {}", metrics.average_prompt_tokens);
        println!(
            "  Slot switch density: {}",
            show_score(metrics.slot_switch_density, "unverifiable")
        );
        println!("  Prompt diversity: {}", metrics.prompt_diversity_score);
        println!(
            "  Scenario coverage: {}",
            show_score(metrics.scenario_coverage_score, "no scenario")
        );
        println!(
            "  Cognitive load: {}",
            metrics
                .estimated_cognitive_load
                .map_or("unverifiable", |load| load.as_str())
        );
        if findings.is_empty() {
            println!("  Stored analytics: consistent");
        } else {
            println!("  Findings:");
            for f in &findings {
                println!("    [{}] {}: {}", f.severity, f.code, f.message);
            }
        }
    }
    if failed {
        std::process::exit(EXIT_GATE_FAILED);
    }
}
