use crate::support::{
    EXIT_GATE_FAILED, active_baselines_or_exit, exit_error, load_config_or_exit,
    load_review_or_exit, print_json, print_report_text, workspaces_or_exit,
};
use drillgate_checks::{GateOptions, open_content_root, validate_store};
use drillgate_store::{BlobStore, FsBlobStore};
use std::path::Path;

pub struct Args {
    pub root: String,
    pub config: Option<String>,
    pub baseline: Option<String>,
    pub manifest_dir: Option<String>,
    pub review_snapshot: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let config = load_config_or_exit(args.config.as_deref());
    let review = args.review_snapshot.as_deref().map(load_review_or_exit);
    let store = open_content_root(Path::new(&args.root));
    let baseline = args
        .baseline
        .as_deref()
        .map(|root| open_content_root(Path::new(root)));

    let active = match &args.manifest_dir {
        Some(dir) => {
            active_baselines_or_exit(&FsBlobStore::new(dir), &workspaces_or_exit(&store))
        }
        None => Default::default(),
    };

    let mut options = GateOptions {
        config,
        baseline: baseline.as_ref().map(|s| s as &dyn BlobStore),
        review,
        ..GateOptions::default()
    };
    for (ws, active_store) in &active {
        options.workspace_baselines.insert(ws.clone(), active_store);
    }

    let report = validate_store(&store, &options).unwrap_or_else(|e| exit_error(e));
    if args.json {
        print_json(&report);
    } else {
        print_report_text(&format!("drillgate validate {}", args.root), &report);
    }
    if !report.passed() {
        std::process::exit(EXIT_GATE_FAILED);
    }
}
