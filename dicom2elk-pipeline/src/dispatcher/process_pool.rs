//! OS-process pool.
//!
//! A batch is cut into contiguous chunks, one per worker process. Each
//! worker gets its chunk over stdin and streams outcomes back over stdout.
//! Items a worker never reports are skipped with a worker failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, warn};

use super::worker::{WorkerReply, WorkerRequest};
use super::{JobSettings, ProgressObserver, WorkerPool};
use crate::errors::PipelineError;
use dicom2elk_shared::{prepare_batches, ItemOutcome, SkipReason};

pub struct ProcessPool {
    program: PathBuf,
    args: Vec<String>,
    workers: usize,
    settings: JobSettings,
}

impl ProcessPool {
    /// Pool spawning `program --log-level <level>` for every chunk.
    pub fn new(
        program: impl Into<PathBuf>,
        workers: usize,
        settings: JobSettings,
        log_level: &str,
    ) -> Self {
        Self::with_args(
            program,
            vec!["--log-level".to_string(), log_level.to_string()],
            workers,
            settings,
        )
    }

    /// Pool spawning `program` with exactly `args`.
    pub fn with_args(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        workers: usize,
        settings: JobSettings,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            workers: workers.max(1),
            settings,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run_chunk(
        &self,
        chunk_index: usize,
        chunk: &[PathBuf],
        progress: &dyn ProgressObserver,
    ) -> Vec<ItemOutcome> {
        let mut slots: Vec<Option<ItemOutcome>> = vec![None; chunk.len()];

        let failure = match self.drive_worker(chunk, &mut slots, progress).await {
            Ok(()) => None,
            Err(e) => {
                error!(chunk = chunk_index, error = %e, "Worker process failed");
                Some(e.to_string())
            }
        };

        slots
            .into_iter()
            .zip(chunk)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| {
                    let reason = failure
                        .clone()
                        .unwrap_or_else(|| "worker did not report this item".to_string());
                    let outcome = ItemOutcome::skipped(path.clone(), SkipReason::Worker(reason));
                    progress.item_done(&outcome);
                    outcome
                })
            })
            .collect()
    }

    async fn drive_worker(
        &self,
        chunk: &[PathBuf],
        slots: &mut [Option<ItemOutcome>],
        progress: &dyn ProgressObserver,
    ) -> Result<(), PipelineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PipelineError::dispatch(format!(
                    "failed to start worker {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let request = WorkerRequest {
            settings: self.settings.clone(),
            items: chunk.to_vec(),
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| PipelineError::protocol(e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::dispatch("worker stdin unavailable"))?;
        stdin.write_all(&payload).await?;
        stdin.shutdown().await?;
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::dispatch("worker stdout unavailable"))?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let reply: WorkerReply = match serde_json::from_str(&line) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(error = %e, "Discarding malformed worker reply");
                    continue;
                }
            };
            match slots.get_mut(reply.index) {
                Some(slot) if slot.is_none() => {
                    progress.item_done(&reply.outcome);
                    *slot = Some(reply.outcome);
                }
                _ => warn!(index = reply.index, "Discarding unexpected worker reply"),
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(PipelineError::dispatch(format!(
                "worker exited with {}",
                status
            )));
        }
        debug!(items = chunk.len(), "Worker finished");
        Ok(())
    }
}

#[async_trait]
impl WorkerPool for ProcessPool {
    fn name(&self) -> &'static str {
        "multiprocessing"
    }

    async fn run_items(
        &self,
        items: &[PathBuf],
        progress: &dyn ProgressObserver,
    ) -> Result<Vec<ItemOutcome>, PipelineError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = items.len().div_ceil(self.workers);
        let chunks = prepare_batches(items, chunk_size);

        let results = join_all(
            chunks
                .iter()
                .enumerate()
                .map(|(i, chunk)| self.run_chunk(i, chunk, progress)),
        )
        .await;

        Ok(results.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::NoopProgress;
    use crate::sink::SinkSpec;

    fn settings() -> JobSettings {
        JobSettings::new(SinkSpec::Bulk)
    }

    fn items(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/data/{}.dcm", i))).collect()
    }

    #[tokio::test]
    async fn test_missing_worker_program_skips_every_item() {
        let pool = ProcessPool::new("/nonexistent/dicom2elk-worker", 2, settings(), "INFO");
        let input = items(5);

        let outcomes = pool.run_items(&input, &NoopProgress).await.unwrap();

        assert_eq!(outcomes.len(), 5);
        for (outcome, path) in outcomes.iter().zip(&input) {
            assert_eq!(outcome.source(), Some(path.as_path()));
            assert!(matches!(
                outcome,
                ItemOutcome::Skipped {
                    reason: SkipReason::Worker(_),
                    ..
                }
            ));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_dying_midway_keeps_reported_items() {
        // Reports the first item of its chunk, then exits with an error.
        let script = r#"cat > /dev/null; echo '{"index":0,"outcome":{"status":"written","source":"/data/first.dcm","output":"/out/1.json"}}'; exit 3"#;
        let pool = ProcessPool::with_args(
            "/bin/sh",
            vec!["-c".to_string(), script.to_string()],
            1,
            settings(),
        );
        let input = items(3);

        let outcomes = pool.run_items(&input, &NoopProgress).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_processed());
        assert!(outcomes[1].is_skipped());
        assert!(outcomes[2].is_skipped());
        assert_eq!(outcomes[2].source(), Some(Path::new("/data/2.dcm")));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = ProcessPool::new("/nonexistent/worker", 4, settings(), "INFO");
        assert!(pool.run_items(&[], &NoopProgress).await.unwrap().is_empty());
    }
}
