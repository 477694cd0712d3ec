//! Active manifest pointer with archive-on-promote and restore-on-rollback.
//!
//! The pointer for a workspace is a single blob, so swapping it is a single
//! `put`. The previous pointer is always archived before the swap; a crash
//! between the two leaves an extra archive entry, never a lost one.

use crate::blob::{Blob, BlobStore, StoreError};
use chrono::{DateTime, Utc};
use drillgate_kernel::{Report, Verdict};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const MANIFEST_SCHEMA: u32 = 1;
pub const MANIFEST_KIND: &str = "drillgate.manifest.v1";

const ACTIVE_PREFIX: &str = "manifests/active";
const ARCHIVE_PREFIX: &str = "manifests/archive";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid manifest at {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid workspace name: {0:?}")]
    InvalidWorkspace(String),

    #[error("gate rejected promotion of {workspace}: {hard_count} hard finding(s)")]
    GateRejected { workspace: String, hard_count: usize },

    #[error("report does not cover workspace {0}")]
    WorkspaceNotValidated(String),

    #[error("no active manifest for workspace {0}")]
    NoActiveManifest(String),

    #[error("no archived manifest {version} for workspace {workspace}")]
    ArchiveNotFound { workspace: String, version: String },

    #[error("no archived manifest to roll back to for workspace {0}")]
    NothingToRollBack(String),
}

/// Pointer from a workspace to the content tree currently served.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema: u32,
    pub kind: String,
    pub workspace: String,
    pub content_root: String,
    pub content_version: String,
    pub promoted_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new(
        workspace: impl Into<String>,
        content_root: impl Into<String>,
        content_version: impl Into<String>,
        promoted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema: MANIFEST_SCHEMA,
            kind: MANIFEST_KIND.to_string(),
            workspace: workspace.into(),
            content_root: content_root.into(),
            content_version: content_version.into(),
            promoted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromotionOutcome {
    pub active: Manifest,
    pub archived: Option<Manifest>,
    /// True when the requested version was already active.
    pub unchanged: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    pub restored: Manifest,
    pub archived: Manifest,
}

pub fn active_key(workspace: &str) -> String {
    format!("{ACTIVE_PREFIX}/{workspace}.json")
}

pub fn archive_key(workspace: &str, content_version: &str) -> String {
    format!("{ARCHIVE_PREFIX}/{workspace}/{content_version}.json")
}

fn validate_workspace(workspace: &str) -> Result<(), ManifestError> {
    let valid = !workspace.is_empty()
        && workspace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ManifestError::InvalidWorkspace(workspace.to_string()))
    }
}

/// Manifest operations over any blob store.
pub struct ManifestManager<'a> {
    store: &'a dyn BlobStore,
}

impl<'a> ManifestManager<'a> {
    pub fn new(store: &'a dyn BlobStore) -> Self {
        Self { store }
    }

    pub fn read_active(&self, workspace: &str) -> Result<Option<Manifest>, ManifestError> {
        validate_workspace(workspace)?;
        self.read(&active_key(workspace))
    }

    /// Archived manifests, oldest first.
    pub fn list_archive(&self, workspace: &str) -> Result<Vec<Manifest>, ManifestError> {
        validate_workspace(workspace)?;
        let prefix = format!("{ARCHIVE_PREFIX}/{workspace}/");
        let mut manifests = Vec::new();
        for key in self.store.list(&prefix)? {
            if let Some(manifest) = self.read(&key)? {
                manifests.push(manifest);
            }
        }
        manifests.sort_by(|a, b| {
            a.promoted_at
                .cmp(&b.promoted_at)
                .then_with(|| a.content_version.cmp(&b.content_version))
        });
        Ok(manifests)
    }

    /// Swap the active pointer to `manifest`, gated on the report's verdict
    /// for that workspace. Failures in unrelated workspaces do not block.
    pub fn promote(
        &self,
        manifest: Manifest,
        report: &Report,
    ) -> Result<PromotionOutcome, ManifestError> {
        let workspace = manifest.workspace.clone();
        validate_workspace(&workspace)?;

        let Some(summary) = report.workspace(&workspace) else {
            return Err(ManifestError::WorkspaceNotValidated(workspace));
        };
        if summary.verdict != Verdict::Pass {
            warn!(
                workspace = %workspace,
                hard = summary.hard_count,
                "promotion refused by gate"
            );
            return Err(ManifestError::GateRejected {
                workspace,
                hard_count: summary.hard_count,
            });
        }

        let previous = self.read_active(&workspace)?;
        if let Some(current) = &previous
            && current.content_version == manifest.content_version
        {
            return Ok(PromotionOutcome {
                active: current.clone(),
                archived: None,
                unchanged: true,
            });
        }

        if let Some(current) = &previous {
            self.write(&archive_key(&workspace, &current.content_version), current)?;
        }
        self.write(&active_key(&workspace), &manifest)?;
        info!(
            workspace = %workspace,
            version = %manifest.content_version,
            "promoted manifest"
        );

        Ok(PromotionOutcome {
            active: manifest,
            archived: previous,
            unchanged: false,
        })
    }

    /// Restore an archived manifest, archiving the current pointer first.
    ///
    /// Without `to`, restores the most recently promoted archive whose content
    /// version differs from the active one.
    pub fn rollback(
        &self,
        workspace: &str,
        to: Option<&str>,
    ) -> Result<RollbackOutcome, ManifestError> {
        let current = self
            .read_active(workspace)?
            .ok_or_else(|| ManifestError::NoActiveManifest(workspace.to_string()))?;

        let target = match to {
            Some(version) => self
                .read(&archive_key(workspace, version))?
                .ok_or_else(|| ManifestError::ArchiveNotFound {
                    workspace: workspace.to_string(),
                    version: version.to_string(),
                })?,
            None => self
                .list_archive(workspace)?
                .into_iter()
                .rev()
                .find(|m| m.content_version != current.content_version)
                .ok_or_else(|| ManifestError::NothingToRollBack(workspace.to_string()))?,
        };

        self.write(&archive_key(workspace, &current.content_version), &current)?;
        self.write(&active_key(workspace), &target)?;
        info!(
            workspace = %workspace,
            from = %current.content_version,
            to = %target.content_version,
            "rolled back manifest"
        );

        Ok(RollbackOutcome {
            restored: target,
            archived: current,
        })
    }

    fn read(&self, key: &str) -> Result<Option<Manifest>, ManifestError> {
        let Some(blob) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_slice(&blob.bytes)
            .map(Some)
            .map_err(|source| ManifestError::Decode {
                key: key.to_string(),
                source,
            })
    }

    fn write(&self, key: &str, manifest: &Manifest) -> Result<(), ManifestError> {
        let bytes = serde_json::to_vec_pretty(manifest).map_err(ManifestError::Encode)?;
        self.store.put(key, Blob::for_key(key, bytes))?;
        Ok(())
    }
}
