//! Pipeline error types.

use dicom2elk_repository::SearchIndexError;
use dicom2elk_shared::TallyMismatch;
use thiserror::Error;

/// Errors that abort a pipeline run.
///
/// Per-item failures never surface here; they become skipped outcomes.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid pipeline wiring or settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A worker pool could not run a batch at all.
    #[error("Dispatch error: {0}")]
    DispatchError(String),

    /// The worker request/reply protocol was violated.
    #[error("Worker protocol error: {0}")]
    ProtocolError(String),

    /// The tally no longer accounts for every item.
    #[error("Accounting error: {0}")]
    Accounting(#[from] TallyMismatch),

    #[error(transparent)]
    SearchIndex(#[from] SearchIndexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::DispatchError(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }
}
