//! Per-item outcomes reported by the dispatcher.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Why an item did not make it to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The file could not be read or parsed.
    Extraction(String),
    /// The JSON file was written but could not be found afterwards.
    WriteVerification(PathBuf),
    /// The worker handling the item failed before reporting it.
    Worker(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction(msg) => write!(f, "extraction failed: {}", msg),
            Self::WriteVerification(path) => {
                write!(f, "output {} not found after write", path.display())
            }
            Self::Worker(msg) => write!(f, "worker failed: {}", msg),
        }
    }
}

/// Result of pushing one input item through the extractor and sink router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The document was persisted as a JSON file.
    Written { source: PathBuf, output: PathBuf },
    /// The document awaits the end-of-batch bulk upload.
    Pending { document: Document },
    /// The item produced nothing.
    Skipped { source: PathBuf, reason: SkipReason },
}

impl ItemOutcome {
    pub fn skipped(source: impl Into<PathBuf>, reason: SkipReason) -> Self {
        Self::Skipped {
            source: source.into(),
            reason,
        }
    }

    pub fn is_processed(&self) -> bool {
        !self.is_skipped()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// The source path of the item, when it is known.
    pub fn source(&self) -> Option<&Path> {
        match self {
            Self::Written { source, .. } | Self::Skipped { source, .. } => Some(source),
            Self::Pending { document } => document.filepath().map(Path::new),
        }
    }

    /// Take the pending document out of the outcome.
    pub fn into_document(self) -> Option<Document> {
        match self {
            Self::Pending { document } => Some(document),
            _ => None,
        }
    }
}
