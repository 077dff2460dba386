//! # dicom2elk Pipeline
//!
//! This crate provides the batch pipeline that turns DICOM files into
//! metadata documents and hands them to a sink.
//!
//! ## Architecture
//!
//! The pipeline follows an Extractor-Router-Dispatcher-Controller pattern:
//!
//! 1. **Extractor**: Reads one file and builds its DICOM JSON document
//! 2. **Sink**: Writes the document to disk or buffers it for a bulk upload
//! 3. **Dispatcher**: Fans a batch out over a worker pool
//! 4. **Orchestrator**: Runs batches in order and keeps the tally

pub mod dispatcher;
pub mod error_log;
pub mod errors;
pub mod extractor;
pub mod orchestrator;
pub mod sink;

pub use dispatcher::{
    DispatchConfig, Dispatcher, ItemJob, JobSettings, NoopProgress, ProgressObserver, WorkerPool,
};
pub use error_log::ErrorLog;
pub use errors::PipelineError;
pub use extractor::{ExtractError, TagExtractor};
pub use orchestrator::RunController;
pub use sink::{BulkSink, FileSink, SinkRouter, SinkSpec};
