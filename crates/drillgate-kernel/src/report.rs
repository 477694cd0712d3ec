//! The gate report: one verdict over every workspace in a run.

use crate::digest::compute_report_digest;
use crate::error::KernelError;
use crate::finding::{Finding, FindingCode, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const REPORT_SCHEMA: u32 = 1;
pub const REPORT_KIND: &str = "drillgate.gate.report.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    fn from_hard_count(hard_count: usize) -> Self {
        if hard_count == 0 { Self::Pass } else { Self::Fail }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw per-workspace output of the stages, before merging.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceFindings {
    pub workspace: String,
    pub document_count: usize,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub workspace: String,
    pub verdict: Verdict,
    pub document_count: usize,
    pub hard_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub workspace_count: usize,
    pub document_count: usize,
    pub hard_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub schema: u32,
    pub report_kind: String,
    pub verdict: Verdict,
    pub passed: bool,
    pub summary: ReportSummary,
    pub workspaces: Vec<WorkspaceSummary>,
    pub findings: Vec<Finding>,
    pub report_digest: String,
}

impl Report {
    /// Merge per-workspace findings into one ordered report.
    ///
    /// Input order does not matter: workspaces are sorted by name and
    /// findings by their total order, so parallel collection stays
    /// deterministic.
    pub fn from_workspaces(mut parts: Vec<WorkspaceFindings>) -> Self {
        parts.sort_by(|a, b| a.workspace.cmp(&b.workspace));

        let mut workspaces = Vec::with_capacity(parts.len());
        let mut findings = Vec::new();
        let mut document_count = 0;
        for part in parts {
            let hard_count = part.findings.iter().filter(|f| f.is_hard()).count();
            let warning_count = part.findings.len() - hard_count;
            document_count += part.document_count;
            workspaces.push(WorkspaceSummary {
                workspace: part.workspace,
                verdict: Verdict::from_hard_count(hard_count),
                document_count: part.document_count,
                hard_count,
                warning_count,
            });
            findings.extend(part.findings);
        }
        findings.sort();

        let hard_count = findings.iter().filter(|f| f.is_hard()).count();
        let summary = ReportSummary {
            workspace_count: workspaces.len(),
            document_count,
            hard_count,
            warning_count: findings.len() - hard_count,
        };
        let verdict = Verdict::from_hard_count(hard_count);
        let report_digest = compute_report_digest(&findings);

        Self {
            schema: REPORT_SCHEMA,
            report_kind: REPORT_KIND.to_string(),
            verdict,
            passed: verdict == Verdict::Pass,
            summary,
            workspaces,
            findings,
            report_digest,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn hard_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Hard)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    /// Sorted unique codes present at the given severity.
    pub fn codes(&self, severity: Severity) -> Vec<FindingCode> {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .map(|f| f.code)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_code(&self, code: FindingCode) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    pub fn workspace(&self, name: &str) -> Option<&WorkspaceSummary> {
        self.workspaces.iter().find(|w| w.workspace == name)
    }

    pub fn to_json_pretty(&self) -> Result<String, KernelError> {
        serde_json::to_string_pretty(self).map_err(KernelError::Render)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, KernelError> {
        serde_json::from_slice(bytes).map_err(KernelError::Decode)
    }
}
