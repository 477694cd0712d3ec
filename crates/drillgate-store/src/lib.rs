//! # drillgate-store
//!
//! Storage boundary for published content and manifests.
//!
//! This crate provides:
//! - `BlobStore`: an opaque key → blob map with content-type and
//!   cache-control metadata
//! - `FsBlobStore` (directory-backed, atomic writes) and `MemoryBlobStore`
//! - `content_version_id`: a deterministic identifier for a workspace tree
//! - `ManifestManager`: active pointer, archive-on-promote, restore-on-rollback
//!
//! The gate itself only reads through this crate. Mutation is limited to the
//! manifest pointer and its archive, and only after a passing report.
//!
//! ## Key layout
//!
//! ```text
//! {workspace}/catalog.json                      content (read-only here)
//! manifests/active/{workspace}.json             active pointer
//! manifests/archive/{workspace}/{version}.json  archived pointers
//! ```

pub mod blob;
pub mod manifest;

pub use blob::{
    Blob, BlobStore, FsBlobStore, MemoryBlobStore, StoreError, cache_control_for_key,
    content_type_for_key, content_version_id,
};
pub use manifest::{
    MANIFEST_KIND, MANIFEST_SCHEMA, Manifest, ManifestError, ManifestManager, PromotionOutcome,
    RollbackOutcome, active_key, archive_key,
};
