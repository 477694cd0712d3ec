//! # Drillgate Kernel
//!
//! The vocabulary every gate stage speaks: a finding is a classified,
//! located, human-readable observation about published content, and a
//! report is the deterministic fold of all findings into one verdict.
//!
//! This crate is **content-agnostic**: it does not model catalogs, indexes,
//! or entries. Stages in `drillgate-checks` decide what to observe; the
//! kernel only decides how observations are identified, ordered, and judged.
//!
//! ## Architecture
//!
//! ```text
//! FindingCode          ← Closed taxonomy (hard vs warning by default)
//!     │
//! Finding              ← (severity, code, workspace, path, message) + f1_ id
//!     │
//! FindingSink          ← Per-workspace append-only collector
//!     │
//! Report               ← Sorted findings, summaries, verdict, gr1_ digest
//! ```

pub mod digest;
pub mod error;
pub mod finding;
pub mod report;

pub use digest::{compute_finding_id, compute_report_digest, jcs_serialize};
pub use error::KernelError;
pub use finding::{Finding, FindingCode, FindingSink, Severity};
pub use report::{
    REPORT_KIND, REPORT_SCHEMA, Report, ReportSummary, Verdict, WorkspaceFindings,
    WorkspaceSummary,
};
