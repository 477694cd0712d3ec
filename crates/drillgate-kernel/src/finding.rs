//! Findings: the unit of gate output.

use crate::digest::compute_finding_id;
use serde::{Deserialize, Serialize};

/// Whether a finding blocks promotion.
///
/// `Hard` sorts before `Warning` so reports lead with blocking defects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hard,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed taxonomy of everything the gate can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingCode {
    // Loading
    ParseError,
    ReadError,
    ParseStormAborted,

    // Schema and compatibility
    UnknownSchemaVersion,
    MissingRequiredField,
    FieldTypeMismatch,
    ValueOutOfRange,
    CompatibilityViolation,
    FieldRetyped,
    FieldRemoved,
    SchemaDowngrade,
    LegacyAnalyticsFieldMissing,

    // Referential integrity
    DanglingReference,
    KindMismatch,
    CrossWorkspaceReference,
    WorkspaceMismatch,
    SummaryMismatch,
    DuplicateId,
    OrphanDocument,

    // Pagination
    PaginationStart,
    PaginationGap,
    PaginationCycle,
    PageSizeMismatch,
    PageOverflow,
    MalformedNextPage,
    TotalMismatch,

    // Analytics
    AnalyticsFieldMismatch,
    AnalyticsScoreOutOfRange,
    AnalyticsScoreMismatch,
    AnalyticsUnverifiable,
    InvalidCognitiveLoad,
    CognitiveLoadMismatch,
    InvalidSlotTag,
    EmptyOutcome,
    PlaceholderMarker,
    LowPromptDiversity,
    LowScenarioCoverage,

    // Duplicates
    DuplicateTitle,
    NearDuplicatePrompt,

    // Review snapshot
    UnapprovedEntry,
    StaleApproval,
}

impl FindingCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseError => "ParseError",
            Self::ReadError => "ReadError",
            Self::ParseStormAborted => "ParseStormAborted",
            Self::UnknownSchemaVersion => "UnknownSchemaVersion",
            Self::MissingRequiredField => "MissingRequiredField",
            Self::FieldTypeMismatch => "FieldTypeMismatch",
            Self::ValueOutOfRange => "ValueOutOfRange",
            Self::CompatibilityViolation => "CompatibilityViolation",
            Self::FieldRetyped => "FieldRetyped",
            Self::FieldRemoved => "FieldRemoved",
            Self::SchemaDowngrade => "SchemaDowngrade",
            Self::LegacyAnalyticsFieldMissing => "LegacyAnalyticsFieldMissing",
            Self::DanglingReference => "DanglingReference",
            Self::KindMismatch => "KindMismatch",
            Self::CrossWorkspaceReference => "CrossWorkspaceReference",
            Self::WorkspaceMismatch => "WorkspaceMismatch",
            Self::SummaryMismatch => "SummaryMismatch",
            Self::DuplicateId => "DuplicateId",
            Self::OrphanDocument => "OrphanDocument",
            Self::PaginationStart => "PaginationStart",
            Self::PaginationGap => "PaginationGap",
            Self::PaginationCycle => "PaginationCycle",
            Self::PageSizeMismatch => "PageSizeMismatch",
            Self::PageOverflow => "PageOverflow",
            Self::MalformedNextPage => "MalformedNextPage",
            Self::TotalMismatch => "TotalMismatch",
            Self::AnalyticsFieldMismatch => "AnalyticsFieldMismatch",
            Self::AnalyticsScoreOutOfRange => "AnalyticsScoreOutOfRange",
            Self::AnalyticsScoreMismatch => "AnalyticsScoreMismatch",
            Self::AnalyticsUnverifiable => "AnalyticsUnverifiable",
            Self::InvalidCognitiveLoad => "InvalidCognitiveLoad",
            Self::CognitiveLoadMismatch => "CognitiveLoadMismatch",
            Self::InvalidSlotTag => "InvalidSlotTag",
            Self::EmptyOutcome => "EmptyOutcome",
            Self::PlaceholderMarker => "PlaceholderMarker",
            Self::LowPromptDiversity => "LowPromptDiversity",
            Self::LowScenarioCoverage => "LowScenarioCoverage",
            Self::DuplicateTitle => "DuplicateTitle",
            Self::NearDuplicatePrompt => "NearDuplicatePrompt",
            Self::UnapprovedEntry => "UnapprovedEntry",
            Self::StaleApproval => "StaleApproval",
        }
    }

    /// Severity a code carries unless a stage overrides it.
    pub fn default_severity(self) -> Severity {
        match self {
            Self::FieldRemoved
            | Self::LegacyAnalyticsFieldMissing
            | Self::OrphanDocument
            | Self::AnalyticsUnverifiable
            | Self::LowPromptDiversity
            | Self::LowScenarioCoverage
            | Self::NearDuplicatePrompt
            | Self::UnapprovedEntry
            | Self::StaleApproval => Severity::Warning,
            _ => Severity::Hard,
        }
    }
}

impl std::fmt::Display for FindingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified observation about one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Deterministic ID over (code, workspace, path, message).
    pub finding_id: String,
    pub severity: Severity,
    pub code: FindingCode,
    pub workspace: String,
    /// Canonical path of the offending document.
    pub path: String,
    pub message: String,
}

impl Finding {
    /// Create a finding with the code's default severity.
    pub fn new(
        code: FindingCode,
        workspace: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let workspace = workspace.into();
        let path = path.into();
        let message = message.into();
        let finding_id = compute_finding_id(code.as_str(), &workspace, &path, &message);
        Self {
            finding_id,
            severity: code.default_severity(),
            code,
            workspace,
            path,
            message,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_hard(&self) -> bool {
        self.severity == Severity::Hard
    }

    fn sort_key(&self) -> (&str, Severity, &str, &str, &str, &str) {
        (
            &self.workspace,
            self.severity,
            self.code.as_str(),
            &self.path,
            &self.message,
            &self.finding_id,
        )
    }
}

impl PartialOrd for Finding {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Finding {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Append-only collector for one workspace's findings.
#[derive(Debug, Clone, Default)]
pub struct FindingSink {
    workspace: String,
    findings: Vec<Finding>,
}

impl FindingSink {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            findings: Vec::new(),
        }
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Record a finding at the code's default severity.
    pub fn report(&mut self, code: FindingCode, path: &str, message: impl Into<String>) {
        self.findings
            .push(Finding::new(code, self.workspace.clone(), path, message));
    }

    /// Record a finding at an explicit severity.
    pub fn report_with(
        &mut self,
        code: FindingCode,
        severity: Severity,
        path: &str,
        message: impl Into<String>,
    ) {
        self.findings.push(
            Finding::new(code, self.workspace.clone(), path, message).with_severity(severity),
        );
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, other: FindingSink) {
        self.findings.extend(other.findings);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn has_code(&self, code: FindingCode) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}
