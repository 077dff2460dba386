//! The unit of work every pool runs: extract one file, route its document.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::extractor::TagExtractor;
use crate::sink::{SinkRouter, SinkSpec};
use dicom2elk_shared::{ExtractOptions, ItemOutcome, SkipReason};

/// Settings shared by every item of a run.
///
/// Also the payload handed to worker processes, so it stays serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSettings {
    pub sink: SinkSpec,
    #[serde(default)]
    pub options: ExtractOptions,
    /// Delay after each item, in milliseconds.
    #[serde(default)]
    pub sleep_time_ms: u64,
}

impl JobSettings {
    pub fn new(sink: SinkSpec) -> Self {
        Self {
            sink,
            options: ExtractOptions::default(),
            sleep_time_ms: 0,
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sleep_time_ms(mut self, sleep_time_ms: u64) -> Self {
        self.sleep_time_ms = sleep_time_ms;
        self
    }
}

/// Extract-then-route for a single input item.
#[derive(Debug, Clone)]
pub struct ItemJob {
    extractor: TagExtractor,
    router: SinkRouter,
    throttle: Duration,
}

impl ItemJob {
    pub fn new(settings: &JobSettings) -> Self {
        Self {
            extractor: TagExtractor::new(settings.options),
            router: SinkRouter::from_spec(&settings.sink),
            throttle: Duration::from_millis(settings.sleep_time_ms),
        }
    }

    /// Run the item on the current thread.
    pub fn run_blocking(&self, path: &Path) -> ItemOutcome {
        let outcome = match self.extractor.extract(path) {
            Ok(document) => self.router.route_blocking(document),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error reading file");
                ItemOutcome::skipped(path, SkipReason::Extraction(e.to_string()))
            }
        };

        if !self.throttle.is_zero() {
            std::thread::sleep(self.throttle);
        }
        outcome
    }

    /// Run the item with parsing on the blocking pool and async writes.
    pub async fn run(&self, path: &Path) -> ItemOutcome {
        let extractor = self.extractor;
        let owned = path.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&owned)).await;

        let outcome = match extracted {
            Ok(Ok(document)) => self.router.route(document).await,
            Ok(Err(e)) => {
                error!(path = %path.display(), error = %e, "Error reading file");
                ItemOutcome::skipped(path, SkipReason::Extraction(e.to_string()))
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Extraction task failed");
                ItemOutcome::skipped(path, SkipReason::Worker(e.to_string()))
            }
        };

        if !self.throttle.is_zero() {
            tokio::time::sleep(self.throttle).await;
        }
        outcome
    }
}
