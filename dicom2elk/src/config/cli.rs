//! Command-line flags shared by `dicom2elk` and `file2json`.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::logging::LogLevel;
use dicom2elk_shared::ConcurrencyMode;

/// Where extracted documents go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// One JSON file per document in the output directory.
    Json,
    /// One bulk upload per batch to the configured index.
    Elasticsearch,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Elasticsearch => "elasticsearch",
        }
    }
}

/// Flags controlling one pipeline run.
///
/// The input list is not part of this group: `dicom2elk` takes it from
/// `--input-dcm-list` and `file2json` from each list file it picks up.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// JSON file with the search index connection (url, port, user, pwd, index).
    /// Required with `--mode elasticsearch`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory for JSON files, logs and profiling results.
    #[arg(short, long)]
    pub output_dir: PathBuf,

    #[arg(short, long, value_enum, default_value = "json")]
    pub mode: OutputMode,

    #[arg(short, long, value_enum, ignore_case = true, default_value = "INFO")]
    pub log_level: LogLevel,

    /// Number of workers. Clamped to `1..=number of CPUs`.
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub n_threads: i64,

    /// Number of files per batch.
    #[arg(short, long, default_value_t = 10_000)]
    pub batch_size: usize,

    /// Worker pool used when more than one worker is requested.
    #[arg(short = 'p', long, default_value = "multiprocessing")]
    pub process_handler: ConcurrencyMode,

    /// Delay after each file, in milliseconds.
    #[arg(short, long, default_value_t = 0)]
    pub sleep_time_ms: u64,

    /// Record peak memory and run time to a TSV file.
    #[arg(long)]
    pub profile: bool,

    /// Profiling TSV path. Defaults to `<output_dir>/<input list name>.profile.tsv`.
    #[arg(long, requires = "profile")]
    pub profile_tsv: Option<PathBuf>,

    /// Worker executable for the process pool. Defaults to the
    /// `dicom2elk-worker` next to the running binary.
    #[arg(long)]
    pub worker_program: Option<PathBuf>,
}
