//! Quality gate: run every stage per workspace and fold the findings into
//! one report.
//!
//! Workspaces are independent. Each one is loaded and checked on its own
//! scoped thread; results meet at a single channel and are merged by
//! [`Report::from_workspaces`], which fixes the order regardless of which
//! thread finished first. A workspace that cannot be listed still gets a
//! summary, carrying one `ReadError`.

use crate::config::{ConfigError, GateConfig};
use crate::review::ReviewSnapshot;
use crate::{analytics, baseline, duplicates, integrity, schema};
use drillgate_graph::{LoadError, discover_workspaces, load_workspace};
use drillgate_kernel::{Finding, FindingCode, Report, Verdict, WorkspaceFindings};
use drillgate_store::{BlobStore, FsBlobStore};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("no workspace with a catalog.json under {0}")]
    NoWorkspaces(String),
}

/// Inputs beyond the candidate tree itself.
#[derive(Default)]
pub struct GateOptions<'a> {
    pub config: GateConfig,
    /// Currently published tree, for schema-stability comparison.
    pub baseline: Option<&'a dyn BlobStore>,
    /// Per-workspace published trees; these win over `baseline`.
    pub workspace_baselines: BTreeMap<String, &'a dyn BlobStore>,
    pub review: Option<ReviewSnapshot>,
}

/// Validate content on disk with default options.
///
/// `root` is either a content root with one directory per workspace or a
/// single workspace directory (see [`open_content_root`]).
pub fn validate(root: &Path) -> Result<Report, GateError> {
    validate_store(&open_content_root(root), &GateOptions::default())
}

/// Store over `root`. A directory with its own `catalog.json` is mounted as
/// the workspace that catalog declares, or as its directory name when the
/// catalog does not say.
pub fn open_content_root(root: &Path) -> FsBlobStore {
    let catalog = root.join("catalog.json");
    if !catalog.is_file() {
        return FsBlobStore::new(root);
    }
    let declared = fs::read(&catalog)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        .and_then(|doc| doc.get("workspace")?.as_str().map(str::to_string))
        .filter(|ws| is_workspace_segment(ws));
    let from_dir = || {
        root.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .filter(|ws| is_workspace_segment(ws))
    };
    match declared.or_else(from_dir) {
        Some(ws) => {
            debug!(root = %root.display(), workspace = %ws, "mounting single workspace");
            FsBlobStore::mounted(root, &ws)
        }
        None => FsBlobStore::new(root),
    }
}

fn is_workspace_segment(ws: &str) -> bool {
    !ws.is_empty() && ws != "." && ws != ".." && !ws.contains(['/', '\\'])
}

pub fn validate_store(
    store: &dyn BlobStore,
    options: &GateOptions<'_>,
) -> Result<Report, GateError> {
    options.config.validate()?;
    let workspaces = discover_workspaces(store)?;
    if workspaces.is_empty() {
        return Err(GateError::NoWorkspaces(store.name().to_string()));
    }
    info!(store = store.name(), workspaces = workspaces.len(), "gate run started");

    let workers = options.config.workers.min(workspaces.len()).max(1);
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            let workspaces = &workspaces;
            scope.spawn(move || {
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(ws) = workspaces.get(i) else { break };
                    let part = validate_workspace(store, ws, options)
                        .unwrap_or_else(|err| unreadable_workspace(ws, &err));
                    if tx.send(part).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let report = Report::from_workspaces(rx.into_iter().collect());
    info!(
        verdict = %report.verdict,
        hard = report.summary.hard_count,
        warnings = report.summary.warning_count,
        digest = %report.report_digest,
        "gate run finished"
    );
    Ok(report)
}

/// Run every stage for one workspace.
pub fn validate_workspace(
    store: &dyn BlobStore,
    workspace: &str,
    options: &GateOptions<'_>,
) -> Result<WorkspaceFindings, LoadError> {
    let _span = info_span!("workspace", workspace).entered();
    let config = &options.config;
    let loaded = load_workspace(store, workspace, &config.load_options())?;
    let graph = &loaded.graph;
    let mut sink = loaded.findings;

    for (kind, message) in schema::builtin_compatibility_violations() {
        sink.report(
            FindingCode::CompatibilityViolation,
            &format!("policy/{kind}"),
            message,
        );
    }
    schema::check_graph(graph, &mut sink);

    let active_store = options
        .workspace_baselines
        .get(workspace)
        .copied()
        .or(options.baseline);
    if let Some(active_store) = active_store {
        match load_workspace(active_store, workspace, &config.load_options()) {
            Ok(active) => {
                debug!(documents = active.graph.len(), "comparing against active version");
                baseline::compare_graphs(graph, &active.graph, &mut sink);
            }
            Err(err) => {
                warn!(error = %err, "active version unreadable");
                sink.report(
                    FindingCode::ReadError,
                    &format!("{workspace}/"),
                    format!("active version {} unreadable: {err}", active_store.name()),
                );
            }
        }
    }

    integrity::check_graph(graph, &mut sink);
    analytics::check_graph(graph, config, &mut sink);
    duplicates::check_graph(graph, config, &mut sink);
    if let Some(review) = &options.review {
        review.check(graph, &mut sink);
    }

    let findings = sink.into_findings();
    let hard = findings.iter().filter(|f| f.is_hard()).count();
    let verdict = if hard == 0 { Verdict::Pass } else { Verdict::Fail };
    info!(
        verdict = %verdict,
        documents = loaded.document_count,
        hard,
        warnings = findings.len() - hard,
        "workspace checked"
    );

    Ok(WorkspaceFindings {
        workspace: workspace.to_string(),
        document_count: loaded.document_count,
        findings,
    })
}

/// Summary for a workspace whose documents could not even be listed.
fn unreadable_workspace(workspace: &str, err: &LoadError) -> WorkspaceFindings {
    warn!(workspace, error = %err, "workspace unreadable");
    WorkspaceFindings {
        workspace: workspace.to_string(),
        document_count: 0,
        findings: vec![Finding::new(
            FindingCode::ReadError,
            workspace,
            format!("{workspace}/"),
            err.to_string(),
        )],
    }
}
