//! Error types for kernel operations.
//!
//! Content defects are never errors; they are findings. Errors here are
//! operational: a report that cannot be rendered, or a report payload that
//! does not decode.

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The report could not be rendered to JSON.
    #[error("failed to render report: {0}")]
    Render(#[source] serde_json::Error),

    /// A report payload could not be decoded.
    #[error("failed to decode report: {0}")]
    Decode(#[source] serde_json::Error),
}
