use crate::support::{exit_error, print_json};
use drillgate_store::{FsBlobStore, ManifestManager};

pub fn run(manifest_dir: String, workspace: String, to: Option<String>, json_output: bool) {
    let manifests = FsBlobStore::new(&manifest_dir);
    let outcome = ManifestManager::new(&manifests)
        .rollback(&workspace, to.as_deref())
        .unwrap_or_else(|e| exit_error(e));

    if json_output {
        print_json(&outcome);
    } else {
        println!("drillgate rollback {workspace}");
        println!(
            "  Restored: {} ({})",
            outcome.restored.content_version, outcome.restored.content_root
        );
        println!("  Archived: {}", outcome.archived.content_version);
    }
}
