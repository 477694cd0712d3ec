//! # drillgate-checks
//!
//! Every stage between a loaded content graph and the gate verdict.
//!
//! ```text
//! load_workspace ─┬─ schema      required fields per (schemaVersion, kind)
//!                 ├─ baseline    stability against the active version
//!                 ├─ integrity   edges, ids, pagination, reachability
//!                 ├─ analytics   recomputed scores vs stored block
//!                 ├─ duplicates  titles, near-duplicate prompts
//!                 └─ review      pending / stale approvals
//!                        │
//!                  gate::validate_store → Report
//! ```
//!
//! Stages never stop at the first problem: each one appends to the
//! workspace's `FindingSink` and the gate decides afterwards.

pub mod analytics;
pub mod baseline;
pub mod config;
pub mod duplicates;
pub mod gate;
pub mod integrity;
pub mod review;
pub mod schema;
pub mod tokens;

pub use analytics::{CognitiveLoad, EntryMetrics};
pub use config::{AnalyticsMode, ConfigError, GateConfig, NearDuplicateScope};
pub use gate::{
    GateError, GateOptions, open_content_root, validate, validate_store, validate_workspace,
};
pub use review::{ReviewError, ReviewSnapshot};
pub use schema::{FieldType, Policy, Rule, check_policy_compatibility, policy_for};
