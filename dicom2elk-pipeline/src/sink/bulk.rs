//! Bulk-upload sink.
//!
//! Buffers the documents of one batch and submits them as a single bulk
//! request when the batch is complete.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use dicom2elk_repository::{BulkIndexProvider, BulkIndexSummary, IndexStatus};
use dicom2elk_shared::Document;

/// Sink that uploads documents to the search index, one bulk request per batch.
pub struct BulkSink {
    provider: Arc<dyn BulkIndexProvider>,
    pending_docs: Vec<Document>,
    index_ready: bool,
}

impl BulkSink {
    /// Create a new bulk sink writing through `provider`.
    pub fn new(provider: Arc<dyn BulkIndexProvider>) -> Self {
        Self {
            provider,
            pending_docs: Vec::new(),
            index_ready: false,
        }
    }

    /// Add documents to the current batch.
    pub fn buffer(&mut self, documents: impl IntoIterator<Item = Document>) {
        self.pending_docs.extend(documents);
    }

    pub fn pending(&self) -> usize {
        self.pending_docs.len()
    }

    /// Make sure the index exists, once per sink.
    pub async fn ensure_index(&mut self) -> Result<(), PipelineError> {
        if self.index_ready {
            return Ok(());
        }

        match self.provider.ensure_index().await? {
            IndexStatus::Created => {
                info!(index = %self.provider.index_name(), "Created index");
            }
            IndexStatus::AlreadyExists => {
                warn!(index = %self.provider.index_name(), "Index already exists");
            }
        }
        self.index_ready = true;
        Ok(())
    }

    /// Submit every buffered document as one bulk request.
    ///
    /// Documents rejected individually are logged; a request that fails as a
    /// whole is returned as an error and ends the run.
    #[instrument(skip(self), fields(pending = self.pending_docs.len()))]
    pub async fn flush(&mut self) -> Result<BulkIndexSummary, PipelineError> {
        if self.pending_docs.is_empty() {
            return Ok(BulkIndexSummary::default());
        }

        self.ensure_index().await?;

        let docs: Vec<Document> = self.pending_docs.drain(..).collect();
        let count = docs.len();

        info!(count = count, "Flushing documents to search index");

        let summary = self.provider.bulk_index(&docs).await?;
        if summary.has_failures() {
            for failure in &summary.failures {
                warn!(
                    id = %failure.id,
                    status = failure.status,
                    reason = %failure.reason,
                    "Document rejected by search index"
                );
            }
            warn!(
                failed = summary.failed,
                succeeded = summary.succeeded,
                "Bulk upload completed with rejected documents"
            );
        } else {
            debug!(count = count, "Successfully indexed documents");
        }

        Ok(summary)
    }

    pub async fn health_check(&self) -> Result<bool, PipelineError> {
        Ok(self.provider.health_check().await?)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use async_trait::async_trait;
    use dicom2elk_repository::{BulkItemFailure, SearchIndexError};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Mock provider recording every bulk request.
    pub struct MockProvider {
        pub index_exists: AtomicBool,
        pub ensure_calls: AtomicUsize,
        pub requests: Mutex<Vec<Vec<Document>>>,
        pub reject_first: AtomicBool,
        pub fail_wholesale: AtomicBool,
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self {
                index_exists: AtomicBool::new(false),
                ensure_calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                reject_first: AtomicBool::new(false),
                fail_wholesale: AtomicBool::new(false),
            }
        }

        pub async fn indexed_count(&self) -> usize {
            self.requests.lock().await.iter().map(Vec::len).sum()
        }
    }

    #[async_trait]
    impl BulkIndexProvider for MockProvider {
        fn index_name(&self) -> &str {
            "mock-index"
        }

        async fn ensure_index(&self) -> Result<IndexStatus, SearchIndexError> {
            self.ensure_calls.fetch_add(1, Ordering::SeqCst);
            if self.index_exists.swap(true, Ordering::SeqCst) {
                Ok(IndexStatus::AlreadyExists)
            } else {
                Ok(IndexStatus::Created)
            }
        }

        async fn bulk_index(
            &self,
            documents: &[Document],
        ) -> Result<BulkIndexSummary, SearchIndexError> {
            if self.fail_wholesale.load(Ordering::SeqCst) {
                return Err(SearchIndexError::bulk_operation("connection refused"));
            }
            self.requests.lock().await.push(documents.to_vec());

            if self.reject_first.load(Ordering::SeqCst) {
                return Ok(BulkIndexSummary {
                    total: documents.len(),
                    succeeded: documents.len() - 1,
                    failed: 1,
                    failures: vec![BulkItemFailure {
                        id: "0".into(),
                        status: 400,
                        reason: "mapper_parsing_exception".into(),
                    }],
                });
            }
            Ok(BulkIndexSummary::all_succeeded(documents.len()))
        }

        async fn health_check(&self) -> Result<bool, SearchIndexError> {
            Ok(true)
        }
    }
}
