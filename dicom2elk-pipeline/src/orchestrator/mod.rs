//! Orchestrator module for the dicom2elk pipeline.
//!
//! Runs batches one after another, keeps the tally and flushes the bulk sink
//! at the end of every batch.

use std::path::PathBuf;

use tracing::{info, instrument};

use crate::dispatcher::Dispatcher;
use crate::errors::PipelineError;
use crate::sink::BulkSink;
use dicom2elk_shared::{ItemOutcome, RunTally};

/// Drives a whole run over prepared batches.
///
/// The controller:
/// - Dispatches each batch and waits for every item
/// - Folds outcomes into the run tally and checks it
/// - Uploads pending documents when a bulk sink is attached
pub struct RunController {
    dispatcher: Dispatcher,
    bulk: Option<BulkSink>,
}

impl RunController {
    /// Controller for the file sink.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            bulk: None,
        }
    }

    /// Controller that uploads pending documents through `bulk`.
    pub fn with_bulk_sink(dispatcher: Dispatcher, bulk: BulkSink) -> Self {
        Self {
            dispatcher,
            bulk: Some(bulk),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run every batch in order and return the final tally.
    ///
    /// Per-item failures are counted as skipped. Only a dispatch, accounting
    /// or bulk-upload failure aborts the run.
    #[instrument(skip(self, batches), fields(batches = batches.len()))]
    pub async fn run(&mut self, batches: &[Vec<PathBuf>]) -> Result<RunTally, PipelineError> {
        let mut tally = RunTally::new();
        let mut seen = 0;
        let total = batches.len();

        for (i, batch) in batches.iter().enumerate() {
            let index = i + 1;
            info!(
                "Processing batch #{} of {} (batch size: {})",
                index,
                total,
                batch.len()
            );
            self.dispatcher
                .progress()
                .batch_started(index, total, batch.len());

            let outcomes = self.dispatcher.run_batch(batch).await?;
            seen += batch.len();

            let (processed, skipped) = tally.record_batch(&outcomes);
            tally.verify(seen)?;

            self.flush_pending(outcomes).await?;

            self.dispatcher
                .progress()
                .batch_finished(index, processed, skipped);
            info!(
                batch = index,
                processed = processed,
                skipped = skipped,
                "Batch complete"
            );
        }

        Ok(tally)
    }

    /// Hand the batch's pending documents to the bulk sink and upload them.
    async fn flush_pending(&mut self, outcomes: Vec<ItemOutcome>) -> Result<(), PipelineError> {
        let documents: Vec<_> = outcomes
            .into_iter()
            .filter_map(ItemOutcome::into_document)
            .collect();

        match self.bulk.as_mut() {
            Some(bulk) => {
                bulk.buffer(documents);
                bulk.flush().await?;
                Ok(())
            }
            None if documents.is_empty() => Ok(()),
            None => Err(PipelineError::config(format!(
                "{} documents are pending but no bulk sink is configured",
                documents.len()
            ))),
        }
    }
}
