//! Dispatcher module for the dicom2elk pipeline.
//!
//! Fans the items of one batch out over a worker pool and collects exactly
//! one outcome per item, in input order.

mod job;
mod process_pool;
mod progress;
mod sequential;
mod task_pool;
pub mod worker;

pub use job::{ItemJob, JobSettings};
pub use process_pool::ProcessPool;
pub use progress::{NoopProgress, ProgressObserver};
pub use sequential::SequentialPool;
pub use task_pool::TaskPool;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::error_log::ErrorLog;
use crate::errors::PipelineError;
use dicom2elk_shared::{ConcurrencyMode, ItemOutcome, SkipReason};

/// Runs independent items and returns one outcome per item, in input order.
///
/// A failing item never prevents the others from running.
#[async_trait]
pub trait WorkerPool: Send + Sync {
    /// Name used in logs and profiling output.
    fn name(&self) -> &'static str;

    async fn run_items(
        &self,
        items: &[PathBuf],
        progress: &dyn ProgressObserver,
    ) -> Result<Vec<ItemOutcome>, PipelineError>;
}

/// How a run spreads work over workers.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Number of workers; 1 or less means sequential.
    pub workers: usize,
    pub mode: ConcurrencyMode,
    /// Executable of the worker process used by the process pool.
    pub worker_program: PathBuf,
    /// Log level handed to worker processes.
    pub worker_log_level: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            mode: ConcurrencyMode::default(),
            worker_program: PathBuf::from("dicom2elk-worker"),
            worker_log_level: "INFO".to_string(),
        }
    }
}

/// Runs batches on the pool selected for the run.
pub struct Dispatcher {
    pool: Box<dyn WorkerPool>,
    error_log: Arc<ErrorLog>,
    progress: Arc<dyn ProgressObserver>,
}

impl Dispatcher {
    pub fn new(pool: Box<dyn WorkerPool>, error_log: Arc<ErrorLog>) -> Self {
        Self {
            pool,
            error_log,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Pick the pool once from configuration.
    pub fn from_config(
        config: &DispatchConfig,
        settings: JobSettings,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        let pool: Box<dyn WorkerPool> = if config.workers <= 1 {
            Box::new(SequentialPool::new(Arc::new(ItemJob::new(&settings))))
        } else {
            match config.mode {
                ConcurrencyMode::ProcessPool => Box::new(ProcessPool::new(
                    config.worker_program.clone(),
                    config.workers,
                    settings,
                    &config.worker_log_level,
                )),
                ConcurrencyMode::CooperativeTask => Box::new(TaskPool::new(
                    Arc::new(ItemJob::new(&settings)),
                    config.workers,
                )),
            }
        };

        info!(pool = pool.name(), workers = config.workers, "Selected worker pool");
        Self::new(pool, error_log)
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn pool_name(&self) -> &'static str {
        self.pool.name()
    }

    pub fn progress(&self) -> &dyn ProgressObserver {
        self.progress.as_ref()
    }

    /// Run one batch.
    ///
    /// Items that could not be read, or whose worker failed, are recorded in
    /// the error log.
    #[instrument(skip(self, items), fields(pool = self.pool.name(), items = items.len()))]
    pub async fn run_batch(&self, items: &[PathBuf]) -> Result<Vec<ItemOutcome>, PipelineError> {
        let outcomes = self.pool.run_items(items, self.progress.as_ref()).await?;

        if outcomes.len() != items.len() {
            return Err(PipelineError::dispatch(format!(
                "pool {} returned {} outcomes for {} items",
                self.pool.name(),
                outcomes.len(),
                items.len()
            )));
        }

        for outcome in &outcomes {
            if let ItemOutcome::Skipped {
                source,
                reason: SkipReason::Extraction(_) | SkipReason::Worker(_),
            } = outcome
            {
                self.error_log.record_or_warn(source);
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::test_support::write_dicom;
    use crate::sink::SinkSpec;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProgress {
        done: AtomicUsize,
    }

    impl ProgressObserver for CountingProgress {
        fn item_done(&self, _outcome: &ItemOutcome) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Pool that drops the last item.
    struct LossyPool;

    #[async_trait]
    impl WorkerPool for LossyPool {
        fn name(&self) -> &'static str {
            "lossy"
        }

        async fn run_items(
            &self,
            items: &[PathBuf],
            _progress: &dyn ProgressObserver,
        ) -> Result<Vec<ItemOutcome>, PipelineError> {
            Ok(items
                .iter()
                .skip(1)
                .map(|p| ItemOutcome::skipped(p.clone(), SkipReason::Worker("x".into())))
                .collect())
        }
    }

    /// Writes `n` files, every third one not DICOM.
    fn mixed_inputs(dir: &Path, n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| {
                let path = dir.join(format!("{}.dcm", i));
                if i % 3 == 2 {
                    std::fs::write(&path, b"not dicom").unwrap();
                } else {
                    write_dicom(&path, &format!("1.2.3.{}", i));
                }
                path
            })
            .collect()
    }

    async fn run_with(mode: ConcurrencyMode, workers: usize) {
        let input_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let items = mixed_inputs(input_dir.path(), 7);
        let error_log = Arc::new(ErrorLog::at(out_dir.path().join("run.errors.txt")));

        let config = DispatchConfig {
            workers,
            mode,
            ..DispatchConfig::default()
        };
        let settings = JobSettings::new(SinkSpec::Files {
            output_dir: out_dir.path().to_path_buf(),
        });
        let progress = Arc::new(CountingProgress {
            done: AtomicUsize::new(0),
        });
        let dispatcher = Dispatcher::from_config(&config, settings, error_log.clone())
            .with_progress(progress.clone());

        let outcomes = dispatcher.run_batch(&items).await.unwrap();

        assert_eq!(outcomes.len(), items.len());
        for (outcome, item) in outcomes.iter().zip(&items) {
            assert_eq!(outcome.source(), Some(item.as_path()));
        }
        assert_eq!(outcomes.iter().filter(|o| o.is_processed()).count(), 5);
        assert_eq!(progress.done.load(Ordering::SeqCst), 7);
        assert_eq!(
            error_log.entries().unwrap(),
            vec![items[2].clone(), items[5].clone()]
        );
    }

    #[tokio::test]
    async fn test_sequential_pool() {
        run_with(ConcurrencyMode::ProcessPool, 1).await;
    }

    #[tokio::test]
    async fn test_task_pool() {
        run_with(ConcurrencyMode::CooperativeTask, 3).await;
    }

    #[tokio::test]
    async fn test_pool_selection() {
        let settings = JobSettings::new(SinkSpec::Bulk);
        let log = Arc::new(ErrorLog::disabled());
        let select = |workers, mode| {
            let config = DispatchConfig {
                workers,
                mode,
                ..DispatchConfig::default()
            };
            Dispatcher::from_config(&config, settings.clone(), log.clone()).pool_name()
        };

        assert_eq!(select(0, ConcurrencyMode::CooperativeTask), "sequential");
        assert_eq!(select(1, ConcurrencyMode::ProcessPool), "sequential");
        assert_eq!(select(4, ConcurrencyMode::ProcessPool), "multiprocessing");
        assert_eq!(select(4, ConcurrencyMode::CooperativeTask), "asyncio");
    }

    #[tokio::test]
    async fn test_outcome_count_mismatch_is_error() {
        let dispatcher = Dispatcher::new(Box::new(LossyPool), Arc::new(ErrorLog::disabled()));
        let items = vec![PathBuf::from("/a"), PathBuf::from("/b")];

        let err = dispatcher.run_batch(&items).await.unwrap_err();
        assert!(matches!(err, PipelineError::DispatchError(_)));
    }
}
