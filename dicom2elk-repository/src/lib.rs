//! # dicom2elk Repository
//!
//! This crate provides the search index side of the bulk-upload sink: the
//! connection configuration, error types, the `BulkIndexProvider` trait and
//! its OpenSearch implementation (wire compatible with Elasticsearch).

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::IndexConnection;
pub use errors::SearchIndexError;
pub use interfaces::BulkIndexProvider;
pub use opensearch::OpenSearchClient;
pub use types::{BulkIndexSummary, BulkItemFailure, IndexStatus};
