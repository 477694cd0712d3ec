use crate::support::{exit_error, print_json};
use drillgate_store::{FsBlobStore, ManifestManager};
use serde_json::json;

pub fn run(manifest_dir: String, workspace: String, json_output: bool) {
    let manifests = FsBlobStore::new(&manifest_dir);
    let manager = ManifestManager::new(&manifests);
    let active = manager.read_active(&workspace).unwrap_or_else(|e| exit_error(e));
    let archive = manager.list_archive(&workspace).unwrap_or_else(|e| exit_error(e));

    if json_output {
        print_json(&json!({
            "workspace": workspace,
            "active": active,
            "archive": archive,
        }));
        return;
    }

    println!("drillgate manifest {workspace}");
    match &active {
        Some(m) => {
            println!("  Active: {}", m.content_version);
            println!("    Root: {}", m.content_root);
            println!("    Promoted at: {}", m.promoted_at.to_rfc3339());
        }
        None => println!("  Active: none"),
    }
    if archive.is_empty() {
        println!("  Archive: empty");
    } else {
        println!("  Archive:");
        for m in &archive {
            println!("    - {} promoted {}", m.content_version, m.promoted_at.to_rfc3339());
        }
    }
}
