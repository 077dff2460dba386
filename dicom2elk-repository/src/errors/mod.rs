//! Error types for the dicom2elk repository.

mod search_index_error;

pub use search_index_error::SearchIndexError;
