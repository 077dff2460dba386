//! Sequential pool: one item at a time, in input order.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::{ItemJob, ProgressObserver, WorkerPool};
use crate::errors::PipelineError;
use dicom2elk_shared::ItemOutcome;

pub struct SequentialPool {
    job: Arc<ItemJob>,
}

impl SequentialPool {
    pub fn new(job: Arc<ItemJob>) -> Self {
        Self { job }
    }
}

#[async_trait]
impl WorkerPool for SequentialPool {
    fn name(&self) -> &'static str {
        "sequential"
    }

    async fn run_items(
        &self,
        items: &[PathBuf],
        progress: &dyn ProgressObserver,
    ) -> Result<Vec<ItemOutcome>, PipelineError> {
        let mut outcomes = Vec::with_capacity(items.len());
        for path in items {
            let outcome = self.job.run(path).await;
            progress.item_done(&outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
