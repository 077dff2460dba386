//! Cooperative-task pool.
//!
//! One tokio task per item; a semaphore caps how many run at once.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::error;

use super::{ItemJob, ProgressObserver, WorkerPool};
use crate::errors::PipelineError;
use dicom2elk_shared::{ItemOutcome, SkipReason};

pub struct TaskPool {
    job: Arc<ItemJob>,
    permits: Arc<Semaphore>,
}

impl TaskPool {
    pub fn new(job: Arc<ItemJob>, concurrency: usize) -> Self {
        Self {
            job,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }
}

#[async_trait]
impl WorkerPool for TaskPool {
    fn name(&self) -> &'static str {
        "asyncio"
    }

    async fn run_items(
        &self,
        items: &[PathBuf],
        progress: &dyn ProgressObserver,
    ) -> Result<Vec<ItemOutcome>, PipelineError> {
        let handles: Vec<_> = items
            .iter()
            .cloned()
            .map(|path| {
                let job = self.job.clone();
                let permits = self.permits.clone();
                tokio::spawn(async move {
                    match permits.acquire_owned().await {
                        Ok(_permit) => job.run(&path).await,
                        Err(e) => ItemOutcome::skipped(path, SkipReason::Worker(e.to_string())),
                    }
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(items.len());
        for (handle, path) in handles.into_iter().zip(items) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Worker task failed");
                    ItemOutcome::skipped(path.clone(), SkipReason::Worker(e.to_string()))
                }
            };
            progress.item_done(&outcome);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}
