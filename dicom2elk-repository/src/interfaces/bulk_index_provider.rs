//! Bulk index provider trait definition.
//!
//! This module defines the abstract interface used by the bulk-upload sink,
//! allowing for different backend implementations (OpenSearch, mocks, etc.).

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::{BulkIndexSummary, IndexStatus};
use dicom2elk_shared::Document;

/// Abstracts the remote index the bulk-upload sink writes into.
///
/// Implementations are injected into the pipeline's bulk sink, which keeps
/// the pipeline testable with mock implementations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait BulkIndexProvider: Send + Sync {
    /// Name of the index documents are written to.
    fn index_name(&self) -> &str;

    /// Make sure the target index exists.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexStatus::Created)` - The index was absent and has been created
    /// * `Ok(IndexStatus::AlreadyExists)` - The index exists and will be reused as is
    /// * `Err(SearchIndexError)` - If the check or the creation fails
    async fn ensure_index(&self) -> Result<IndexStatus, SearchIndexError>;

    /// Submit `documents` as a single bulk request.
    ///
    /// Each document is identified by its position in the slice (`0..n`).
    /// Per-document rejections are reported in the returned summary; only a
    /// failure of the request as a whole is an `Err`.
    async fn bulk_index(&self, documents: &[Document])
        -> Result<BulkIndexSummary, SearchIndexError>;

    /// Check if the search engine is healthy and reachable.
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
