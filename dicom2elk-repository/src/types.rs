//! Request and response types for search index operations.

/// State of the target index after `ensure_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The index did not exist and was created.
    Created,
    /// The index already existed and is reused without validation.
    AlreadyExists,
}

/// A single document rejected inside an otherwise accepted bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// Document identifier (its position within the batch).
    pub id: String,
    /// HTTP status reported for the item.
    pub status: u16,
    /// Reason given by the search engine.
    pub reason: String,
}

/// Summary of one bulk request.
///
/// The request is accepted or rejected as a whole; `failed` counts the
/// documents the engine rejected individually inside an accepted request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkIndexSummary {
    /// Total number of documents submitted.
    pub total: usize,
    /// Number of documents indexed.
    pub succeeded: usize,
    /// Number of documents rejected.
    pub failed: usize,
    /// Details for each rejected document.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkIndexSummary {
    /// Summary for a request in which every document was accepted.
    pub fn all_succeeded(total: usize) -> Self {
        Self {
            total,
            succeeded: total,
            failed: 0,
            failures: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
