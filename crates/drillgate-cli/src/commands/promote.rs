//! `drillgate promote`: gate one workspace, then swap its active pointer.

use crate::support::{
    EXIT_GATE_FAILED, exit_error, load_config_or_exit, print_json, print_report_text,
    workspaces_or_exit,
};
use chrono::Utc;
use drillgate_checks::{GateOptions, validate_workspace};
use drillgate_kernel::Report;
use drillgate_store::{FsBlobStore, Manifest, ManifestError, ManifestManager, content_version_id};
use serde_json::{Value, json};

pub struct Args {
    pub manifest_dir: String,
    pub workspace: String,
    pub content_root: String,
    pub config: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let config = load_config_or_exit(args.config.as_deref());
    let root = std::fs::canonicalize(&args.content_root)
        .unwrap_or_else(|e| exit_error(format!("failed to resolve {}: {e}", args.content_root)));
    let store = FsBlobStore::new(&root);
    let ws = args.workspace;
    if !workspaces_or_exit(&store).contains(&ws) {
        exit_error(format!("no workspace {ws} with a catalog.json under {}", root.display()));
    }

    let manifests = FsBlobStore::new(&args.manifest_dir);
    let manager = ManifestManager::new(&manifests);
    let active_root = manager
        .read_active(&ws)
        .unwrap_or_else(|e| exit_error(e))
        .map(|m| FsBlobStore::new(m.content_root));

    let mut options = GateOptions {
        config,
        ..GateOptions::default()
    };
    if let Some(active) = &active_root {
        options.workspace_baselines.insert(ws.clone(), active);
    }
    let part = validate_workspace(&store, &ws, &options).unwrap_or_else(|e| exit_error(e));
    let report = Report::from_workspaces(vec![part]);

    let version = content_version_id(&store, &ws).unwrap_or_else(|e| exit_error(e));
    let manifest = Manifest::new(&ws, root.display().to_string(), version, Utc::now());

    match manager.promote(manifest, &report) {
        Ok(outcome) => {
            if args.json {
                print_json(&json!({ "report": report, "promotion": outcome }));
            } else {
                print_report_text(&format!("drillgate promote {ws}"), &report);
                if outcome.unchanged {
                    println!("  Unchanged: {} is already active", outcome.active.content_version);
                } else {
                    println!("  Promoted: {}", outcome.active.content_version);
                    if let Some(previous) = &outcome.archived {
                        println!("  Archived: {}", previous.content_version);
                    }
                }
            }
        }
        Err(ManifestError::GateRejected { hard_count, .. }) => {
            if args.json {
                print_json(&json!({ "report": report, "promotion": Value::Null }));
            } else {
                print_report_text(&format!("drillgate promote {ws}"), &report);
                println!("  Rejected: {hard_count} hard finding(s); active manifest left in place");
            }
            std::process::exit(EXIT_GATE_FAILED);
        }
        Err(e) => exit_error(e),
    }
}
