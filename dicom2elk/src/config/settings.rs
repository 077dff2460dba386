//! Normalized run settings.

use std::path::{Path, PathBuf};

use super::cli::{OutputMode, RunArgs};
use crate::logging::LogLevel;
use crate::AppError;
use dicom2elk_pipeline::{DispatchConfig, JobSettings, SinkSpec};
use dicom2elk_shared::{ConcurrencyMode, ExtractOptions};

/// Log file written in the output directory by `dicom2elk`.
pub const DEFAULT_LOG_NAME: &str = "dicom2elk.log";

const WORKER_BINARY: &str = "dicom2elk-worker";

/// Everything a run needs, with paths absolute and limits applied.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub input_list: PathBuf,
    pub config: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub mode: OutputMode,
    pub log_level: LogLevel,
    pub n_threads: usize,
    pub batch_size: usize,
    pub process_handler: ConcurrencyMode,
    pub sleep_time_ms: u64,
    /// Set when profiling is enabled.
    pub profile_tsv: Option<PathBuf>,
    pub worker_program: PathBuf,
    pub log_file: PathBuf,
    /// Adjustments made while normalizing, logged once logging is up.
    pub warnings: Vec<String>,
}

impl RunSettings {
    /// Normalize command-line flags for one input list.
    ///
    /// Creates the output directory. Fails on a zero batch size or when the
    /// search index mode has no connection file.
    pub fn from_args(
        args: &RunArgs,
        input_list: &Path,
        log_name: &str,
    ) -> Result<Self, AppError> {
        if args.batch_size == 0 {
            return Err(AppError::config("batch size must be at least 1"));
        }
        if args.mode == OutputMode::Elasticsearch && args.config.is_none() {
            return Err(AppError::config(
                "a connection file (--config) is required with --mode elasticsearch",
            ));
        }

        let output_dir = absolute(&args.output_dir)?;
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            AppError::config(format!(
                "cannot create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let input_list = absolute(input_list)?;
        let config = args.config.as_deref().map(absolute).transpose()?;

        let mut warnings = Vec::new();
        let (n_threads, warning) = resolve_worker_count(args.n_threads, num_cpus::get());
        warnings.extend(warning);

        let profile_tsv = if args.profile {
            Some(match &args.profile_tsv {
                Some(path) => absolute(path)?,
                None => output_dir.join(format!("{}.profile.tsv", file_name(&input_list))),
            })
        } else {
            None
        };

        let worker_program = match &args.worker_program {
            Some(path) => absolute(path)?,
            None => default_worker_program()?,
        };

        Ok(Self {
            log_file: output_dir.join(log_name),
            input_list,
            config,
            output_dir,
            mode: args.mode,
            log_level: args.log_level,
            n_threads,
            batch_size: args.batch_size,
            process_handler: args.process_handler,
            sleep_time_ms: args.sleep_time_ms,
            profile_tsv,
            worker_program,
            warnings,
        })
    }

    pub fn sink_spec(&self) -> SinkSpec {
        match self.mode {
            OutputMode::Json => SinkSpec::Files {
                output_dir: self.output_dir.clone(),
            },
            OutputMode::Elasticsearch => SinkSpec::Bulk,
        }
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings::new(self.sink_spec())
            .with_options(ExtractOptions::default())
            .with_sleep_time_ms(self.sleep_time_ms)
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            workers: self.n_threads,
            mode: self.process_handler,
            worker_program: self.worker_program.clone(),
            worker_log_level: self.log_level.as_str().to_string(),
        }
    }

    /// `(name, value)` pairs describing the run, in a stable order.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let optional = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "None".to_string())
        };
        vec![
            ("input_dcm_list", self.input_list.display().to_string()),
            ("config", optional(&self.config)),
            ("output_dir", self.output_dir.display().to_string()),
            ("mode", self.mode.as_str().to_string()),
            ("log_level", self.log_level.to_string()),
            ("n_threads", self.n_threads.to_string()),
            ("batch_size", self.batch_size.to_string()),
            ("process_handler", self.process_handler.to_string()),
            ("sleep_time_ms", self.sleep_time_ms.to_string()),
            ("profile", self.profile_tsv.is_some().to_string()),
            ("profile_tsv", optional(&self.profile_tsv)),
        ]
    }
}

/// Clamp the requested worker count to `1..=cpus`.
///
/// Returns the count to use and a warning when it had to change.
pub fn resolve_worker_count(requested: i64, cpus: usize) -> (usize, Option<String>) {
    let cpus = cpus.max(1);
    if requested < 1 {
        (
            1,
            Some(format!(
                "Number of threads ({}) must be at least 1, using 1",
                requested
            )),
        )
    } else if requested as u64 > cpus as u64 {
        (
            cpus,
            Some(format!(
                "Number of threads ({}) exceeds the number of CPUs, using {}",
                requested, cpus
            )),
        )
    } else {
        (requested as usize, None)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dicom2elk".to_string())
}

fn default_worker_program() -> Result<PathBuf, AppError> {
    let exe = std::env::current_exe()?;
    Ok(exe.with_file_name(format!("{}{}", WORKER_BINARY, std::env::consts::EXE_SUFFIX)))
}
