//! Sink module for the dicom2elk pipeline.
//!
//! Routes each document either to a JSON file or to the bulk-upload buffer.

mod bulk;
mod file;

pub use bulk::BulkSink;
pub use file::{output_file_stem, FileSink};

#[cfg(test)]
pub(crate) use bulk::mock;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use dicom2elk_shared::{Document, ItemOutcome};

/// Which sink a run writes to.
///
/// Serializable so that worker processes can rebuild the same router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkSpec {
    /// One JSON file per document in `output_dir`.
    Files { output_dir: PathBuf },
    /// Documents are collected and uploaded once per batch.
    Bulk,
}

/// Per-item routing of extracted documents.
#[derive(Debug, Clone)]
pub enum SinkRouter {
    Files(FileSink),
    Bulk,
}

impl SinkRouter {
    pub fn from_spec(spec: &SinkSpec) -> Self {
        match spec {
            SinkSpec::Files { output_dir } => Self::Files(FileSink::new(output_dir.clone())),
            SinkSpec::Bulk => Self::Bulk,
        }
    }

    /// Route a document from a synchronous context.
    pub fn route_blocking(&self, document: Document) -> ItemOutcome {
        match self {
            Self::Files(sink) => sink.write_blocking(document),
            Self::Bulk => ItemOutcome::Pending { document },
        }
    }

    /// Route a document, writing files asynchronously.
    pub async fn route(&self, document: Document) -> ItemOutcome {
        match self {
            Self::Files(sink) => sink.write(document).await,
            Self::Bulk => ItemOutcome::Pending { document },
        }
    }
}
