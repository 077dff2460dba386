//! Catalog a directory tree into list files for `dicom2elk`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use dicom2elk::catalog::{
    CatalogConfig, Cataloger, DEFAULT_BATCH_SIZE, DEFAULT_DB_FILE, DEFAULT_TABLE,
};
use dicom2elk::logging::{self, LogLevel};
use dicom2elk::AppError;

/// Explore a directory and list every file found in batches.
#[derive(Parser, Debug)]
#[command(name = "file2list", version)]
struct Cli {
    /// Directory to start exploring.
    #[arg(short, long)]
    path: PathBuf,

    /// Output directory for the list files and the log.
    #[arg(short, long)]
    output_dir: PathBuf,

    /// SQLite database file.
    #[arg(short, long, default_value = DEFAULT_DB_FILE)]
    db_file: PathBuf,

    /// Table holding the catalogued paths.
    #[arg(short = 't', long, default_value = DEFAULT_TABLE)]
    db_table: String,

    /// Maximum number of files to visit.
    #[arg(short, long)]
    limit: Option<usize>,

    /// Number of paths per list file.
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Delay after each file, in milliseconds.
    #[arg(short, long, default_value_t = 0)]
    sleep_time_ms: u64,

    #[arg(short = 'L', long, value_enum, ignore_case = true, default_value = "INFO")]
    log_level: LogLevel,
}

const LOG_NAME_REPLACED: &[char] = &[
    ' ', '(', ')', '[', ']', '{', '}', ',', ';', ':', '\'', '"', '\\', '/',
];

/// `file2list_<dir>_<timestamp>.log` with separators and brackets replaced.
fn log_name(root: &Path) -> String {
    let basedir = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("file2list_{}_{}.log", basedir, timestamp).replace(LOG_NAME_REPLACED, "_")
}

fn absolute(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let root = absolute(&cli.path)?;
    let output_dir = absolute(&cli.output_dir)?;
    std::fs::create_dir_all(&output_dir)?;

    logging::init(cli.log_level, Some(&output_dir.join(log_name(&root))))?;

    info!(
        "Running file2list (dicom2elk version {}) with the following arguments",
        env!("CARGO_PKG_VERSION")
    );
    info!("  path: {}", root.display());
    info!("  output_dir: {}", output_dir.display());
    info!("  db_file: {}", cli.db_file.display());
    info!("  db_table: {}", cli.db_table);
    info!("  limit: {:?}", cli.limit);
    info!("  batch_size: {}", cli.batch_size);
    info!("  sleep_time_ms: {}", cli.sleep_time_ms);
    info!("  log_level: {}", cli.log_level);

    let config = CatalogConfig {
        root,
        output_dir,
        db_file: cli.db_file,
        table: cli.db_table,
        limit: cli.limit,
        batch_size: cli.batch_size,
        sleep_time_ms: cli.sleep_time_ms,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {pos} files [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let summary = Cataloger::open(config)?.with_progress(spinner).run()?;
    info!(
        visited = summary.visited,
        inserted = summary.inserted,
        list_files = summary.dumps.len(),
        "Finished!"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("file2list failed: {}", e);
            eprintln!("file2list: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_name_replaces_special_characters() {
        let name = log_name(Path::new("/mnt/pacs (2021), [a]"));
        assert!(name.starts_with("file2list_pacs__2021____a__"));
        assert!(name.ends_with(".log"));
        assert!(!name.contains(' '));
    }
}
