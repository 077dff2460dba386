//! One complete run over an input list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::config::{Dependencies, RunSettings};
use crate::input::read_input_list;
use crate::profiling::{self, MemoryProfiler, ProfileRecord};
use crate::AppError;
use dicom2elk_pipeline::ProgressObserver;
use dicom2elk_shared::{prepare_batches, RunTally};

/// Result of a run that ended without a fatal error.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub tally: RunTally,
    pub batches: usize,
    pub elapsed: Duration,
}

/// Read the input list, run every batch and log the summary.
///
/// With profiling enabled the peak memory and total time are appended to
/// the profiling TSV. A fatal error aborts the run without a summary.
#[instrument(skip_all, fields(input = %settings.input_list.display()))]
pub async fn run_job(
    settings: &RunSettings,
    progress: Arc<dyn ProgressObserver>,
) -> Result<RunSummary, AppError> {
    info!(
        "Running dicom2elk {} with the following arguments",
        env!("CARGO_PKG_VERSION")
    );
    for (name, value) in settings.describe() {
        info!("  {}: {}", name, value);
    }
    for warning in &settings.warnings {
        warn!("{}", warning);
    }

    let items = read_input_list(&settings.input_list)?;
    let batches = prepare_batches(&items, settings.batch_size);
    info!(
        files = items.len(),
        batches = batches.len(),
        "Input list loaded"
    );

    let mut deps = Dependencies::new(settings, progress).await?;
    info!(pool = deps.controller.dispatcher().pool_name(), "Worker pool ready");

    let started = Instant::now();
    let tally = match &settings.profile_tsv {
        Some(tsv) => {
            let profiler = MemoryProfiler::start();
            let result = deps.controller.run(&batches).await;
            let measurement = profiler.finish().await;
            let tally = result?;

            let record = ProfileRecord {
                timestamp: profiling::timestamp_now(),
                n_threads: settings.n_threads,
                batch_size: settings.batch_size,
                process_handler: settings.process_handler.to_string(),
                max_memory_usage: measurement.peak_mib,
                total_dcm_processed: tally.processed(),
                total_dcm_skipped: tally.skipped(),
                total_time: measurement.elapsed.as_secs_f64(),
            };
            info!(
                max_memory_mib = format!("{:.2}", measurement.peak_mib),
                "Profiling complete"
            );
            profiling::append_record(tsv, &record)?;
            tally
        }
        None => deps.controller.run(&batches).await?,
    };
    let elapsed = started.elapsed();

    info!("Total DICOM files processed: {}", tally.processed());
    info!("Total DICOM files skipped: {}", tally.skipped());
    info!("Total time: {:.3} seconds", elapsed.as_secs_f64());
    if tally.skipped() > 0 {
        if let Some(path) = deps.error_log.path() {
            info!(path = %path.display(), "Skipped files were recorded");
        }
    }

    Ok(RunSummary {
        tally,
        batches: batches.len(),
        elapsed,
    })
}
