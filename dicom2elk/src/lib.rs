//! # dicom2elk
//!
//! Entry points and run configuration for dicom2elk.
//!
//! This crate wires the pipeline into four binaries:
//! - `dicom2elk`: extract one list of DICOM files to JSON or the search index
//! - `dicom2elk-worker`: process-pool worker, driven over stdin/stdout
//! - `file2list`: catalog a directory tree into batch list files
//! - `file2json`: run `dicom2elk` over every list file in a directory

pub mod catalog;
pub mod config;
pub mod input;
pub mod logging;
pub mod profiling;
pub mod progress;
pub mod runner;

pub use config::{Dependencies, LogLevel, OutputMode, RunArgs, RunSettings};

use thiserror::Error;

/// Errors that can occur during startup or a run.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] dicom2elk_pipeline::PipelineError),

    /// Search index error.
    #[error("Search index error: {0}")]
    SearchIndexError(#[from] dicom2elk_repository::SearchIndexError),

    /// Catalog error.
    #[error("Catalog error: {0}")]
    CatalogError(#[from] catalog::CatalogError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
