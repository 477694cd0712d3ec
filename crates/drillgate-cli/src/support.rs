use drillgate_checks::{GateConfig, ReviewSnapshot};
use drillgate_graph::discover_workspaces;
use drillgate_kernel::{Finding, Report};
use drillgate_store::{BlobStore, FsBlobStore, ManifestManager};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Gate verdict was `fail`.
pub const EXIT_GATE_FAILED: i32 = 1;
/// The run itself could not complete.
pub const EXIT_OPERATIONAL: i32 = 2;

pub const LOG_ENV: &str = "DRILLGATE_LOG";

/// Logs go to stderr so `--json` stdout stays machine-readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn exit_error(message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(EXIT_OPERATIONAL);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_error(format!("failed to render JSON: {e}")),
    }
}

pub fn load_config_or_exit(path: Option<&str>) -> GateConfig {
    let Some(path) = path else {
        return GateConfig::default();
    };
    GateConfig::load(Path::new(path)).unwrap_or_else(|e| exit_error(e))
}

pub fn load_review_or_exit(path: &str) -> ReviewSnapshot {
    ReviewSnapshot::load(Path::new(path)).unwrap_or_else(|e| exit_error(e))
}

/// Active content root per workspace, for workspaces that have one.
pub fn active_baselines_or_exit(
    manifests: &dyn BlobStore,
    workspaces: &[String],
) -> BTreeMap<String, FsBlobStore> {
    let manager = ManifestManager::new(manifests);
    let mut out = BTreeMap::new();
    for ws in workspaces {
        let active = manager.read_active(ws).unwrap_or_else(|e| exit_error(e));
        if let Some(manifest) = active {
            out.insert(ws.clone(), FsBlobStore::new(&manifest.content_root));
        }
    }
    out
}

pub fn workspaces_or_exit(store: &dyn BlobStore) -> Vec<String> {
    discover_workspaces(store).unwrap_or_else(|e| exit_error(e))
}

fn print_finding(finding: &Finding) {
    println!(
        "    [{}] {} {}: {}",
        finding.severity, finding.code, finding.path, finding.message
    );
}

pub fn print_report_text(title: &str, report: &Report) {
    println!("{title}");
    println!("  Verdict: {}", report.verdict);
    println!(
        "  Workspaces: {}  Documents: {}  Hard: {}  Warnings: {}",
        report.summary.workspace_count,
        report.summary.document_count,
        report.summary.hard_count,
        report.summary.warning_count
    );
    for ws in &report.workspaces {
        println!(
            "  - {} {} ({} documents, {} hard, {} warnings)",
            ws.workspace, ws.verdict, ws.document_count, ws.hard_count, ws.warning_count
        );
        for finding in report.findings.iter().filter(|f| f.workspace == ws.workspace) {
            print_finding(finding);
        }
    }
    println!("  Digest: {}", report.report_digest);
}
