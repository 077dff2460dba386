//! Memory and wall-clock profiling of a whole run.
//!
//! A background sampler records the resident memory of this process and
//! its direct children (the process-pool workers). The peak and the elapsed
//! time are appended to a TSV file, one row per profiled run.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sysinfo::{Pid, System};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::AppError;

/// Interval between two memory samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// One row of the profiling TSV.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRecord {
    /// `%Y-%m-%dT%H:%M:%S`, local time.
    pub timestamp: String,
    pub n_threads: usize,
    pub batch_size: usize,
    pub process_handler: String,
    /// Peak resident memory in MiB.
    pub max_memory_usage: f64,
    pub total_dcm_processed: usize,
    pub total_dcm_skipped: usize,
    /// Seconds.
    pub total_time: f64,
}

/// Samples memory in the background until finished or dropped.
pub struct MemoryProfiler {
    started: Instant,
    peak_bytes: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    sampler: Option<JoinHandle<()>>,
}

/// Peak memory and elapsed time of a profiled section.
#[derive(Debug, Clone, Copy)]
pub struct Measurement {
    pub peak_mib: f64,
    pub elapsed: Duration,
}

impl MemoryProfiler {
    /// Start sampling. Must be called inside a tokio runtime.
    pub fn start() -> Self {
        let peak_bytes = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let sampler = {
            let peak_bytes = peak_bytes.clone();
            let stop = stop.clone();
            tokio::task::spawn_blocking(move || {
                let mut system = System::new();
                let pid = match sysinfo::get_current_pid() {
                    Ok(pid) => pid,
                    Err(e) => {
                        debug!(error = %e, "Memory sampling unavailable");
                        return;
                    }
                };
                loop {
                    let sample = sample_memory(&mut system, pid);
                    peak_bytes.fetch_max(sample, Ordering::Relaxed);
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    std::thread::sleep(SAMPLE_INTERVAL);
                }
            })
        };

        Self {
            started: Instant::now(),
            peak_bytes,
            stop,
            sampler: Some(sampler),
        }
    }

    /// Stop sampling and return the measurement.
    pub async fn finish(mut self) -> Measurement {
        let elapsed = self.started.elapsed();
        self.stop.store(true, Ordering::Relaxed);
        if let Some(sampler) = self.sampler.take() {
            let _ = sampler.await;
        }

        Measurement {
            peak_mib: self.peak_bytes.load(Ordering::Relaxed) as f64 / BYTES_PER_MIB,
            elapsed,
        }
    }
}

impl Drop for MemoryProfiler {
    // The runtime waits for blocking tasks on shutdown.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Resident memory of `pid` plus its direct children, in bytes.
fn sample_memory(system: &mut System, pid: Pid) -> u64 {
    system.refresh_all();
    system
        .processes()
        .values()
        .filter(|process| process.pid() == pid || process.parent() == Some(pid))
        .map(|process| process.memory())
        .sum()
}

/// Append `record` to the TSV at `path`, writing the header on creation.
pub fn append_record(path: &Path, record: &ProfileRecord) -> Result<(), AppError> {
    let is_new = !path.exists() || std::fs::metadata(path)?.len() == 0;
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(is_new)
        .from_writer(file);
    writer
        .serialize(record)
        .map_err(|e| AppError::config(format!("cannot write profile {}: {}", path.display(), e)))?;
    writer.flush()?;

    info!(path = %path.display(), "Profiling results saved");
    Ok(())
}

/// Current local time in the profiling timestamp format.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
