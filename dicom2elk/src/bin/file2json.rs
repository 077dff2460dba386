//! Run `dicom2elk` over every list file found in a directory.
//!
//! Each list file is moved to the temp folder while it runs, then to the
//! done folder, or to the error folder when the run fails.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

use dicom2elk::catalog::walk_files;
use dicom2elk::logging;
use dicom2elk::progress::BatchProgress;
use dicom2elk::{runner, AppError, RunArgs, RunSettings};

const LOG_NAME: &str = "file2json.log";

#[derive(Parser, Debug)]
#[command(name = "file2json", version)]
struct Cli {
    /// Directory containing the list files to process.
    #[arg(short = 'P', long)]
    path: PathBuf,

    /// Where list files go after a successful run.
    #[arg(long)]
    output_done: PathBuf,

    /// Where list files go after a failed run.
    #[arg(long)]
    output_err: PathBuf,

    /// Where a list file stays while it is processed.
    #[arg(long)]
    temp_folder: PathBuf,

    #[command(flatten)]
    run: RunArgs,
}

fn absolute(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Rename, falling back to copy and delete across file systems.
fn move_file(from: &Path, to: &Path) -> Result<(), AppError> {
    if std::fs::rename(from, to).is_err() {
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut found = Vec::new();
    walk_files(dir, &mut |path: &Path| {
        found.push(path.to_path_buf());
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(found)
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let source_dir = absolute(&cli.path)?;
    let done_dir = absolute(&cli.output_done)?;
    let err_dir = absolute(&cli.output_err)?;
    let temp_dir = absolute(&cli.temp_folder)?;
    for dir in [&done_dir, &err_dir, &temp_dir] {
        std::fs::create_dir_all(dir)?;
    }

    let output_dir = absolute(&cli.run.output_dir)?;
    std::fs::create_dir_all(&output_dir)?;
    logging::init(cli.run.log_level, Some(&output_dir.join(LOG_NAME)))?;

    info!(
        "Running file2json (dicom2elk version {}) with the following arguments",
        env!("CARGO_PKG_VERSION")
    );
    info!("  path: {}", source_dir.display());
    info!("  output_done: {}", done_dir.display());
    info!("  output_err: {}", err_dir.display());
    info!("  temp_folder: {}", temp_dir.display());

    // Settings problems are the same for every list; fail before moving any.
    RunSettings::from_args(&cli.run, &source_dir, LOG_NAME)?;

    let lists = list_files(&source_dir)?;
    info!(lists = lists.len(), "List files found");

    let folders = Folders {
        done: done_dir,
        err: err_dir,
        temp: temp_dir,
    };
    let mut failed = 0;
    for list in &lists {
        let started = Instant::now();
        if !process_list(&cli.run, list, &folders).await? {
            failed += 1;
        }
        info!("Total time: {:.2} sec.", started.elapsed().as_secs_f64());
    }

    info!(lists = lists.len(), failed, "Finished!");
    Ok(())
}

struct Folders {
    done: PathBuf,
    err: PathBuf,
    temp: PathBuf,
}

/// Run one list file through the pipeline and file it under done or err.
///
/// Returns whether the run succeeded. Only moving the list itself can fail.
async fn process_list(args: &RunArgs, list: &Path, folders: &Folders) -> Result<bool, AppError> {
    let Some(name) = list.file_name() else {
        return Ok(false);
    };
    let working = folders.temp.join(name);
    move_file(list, &working)?;

    let outcome = match RunSettings::from_args(args, &working, LOG_NAME) {
        Ok(settings) => runner::run_job(&settings, Arc::new(BatchProgress::for_terminal())).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(summary) => {
            move_file(&working, &folders.done.join(name))?;
            info!(
                list = %name.to_string_lossy(),
                processed = summary.tally.processed(),
                skipped = summary.tally.skipped(),
                "Run summary"
            );
            Ok(true)
        }
        Err(e) => {
            error!(list = %name.to_string_lossy(), error = %e, "Run failed");
            move_file(&working, &folders.err.join(name))?;
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("file2json failed: {}", e);
            eprintln!("file2json: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    fn folders(root: &Path) -> Folders {
        let folders = Folders {
            done: root.join("done"),
            err: root.join("err"),
            temp: root.join("tmp"),
        };
        for dir in [&folders.done, &folders.err, &folders.temp] {
            std::fs::create_dir_all(dir).unwrap();
        }
        folders
    }

    #[tokio::test]
    async fn test_invalid_settings_move_list_to_err() {
        let root = tempfile::tempdir().unwrap();
        let folders = folders(root.path());
        let list = root.path().join("dicom_1.txt");
        std::fs::write(&list, "/data/a.dcm\n").unwrap();
        let out = root.path().join("out");
        let args = TestCli::try_parse_from(["file2json", "-o", out.to_str().unwrap(), "-b", "0"])
            .unwrap()
            .run;

        let succeeded = process_list(&args, &list, &folders).await.unwrap();

        assert!(!succeeded);
        assert!(folders.err.join("dicom_1.txt").exists());
        assert!(!folders.temp.join("dicom_1.txt").exists());
        assert!(!list.exists());
    }

    #[tokio::test]
    async fn test_empty_list_moves_to_done() {
        let root = tempfile::tempdir().unwrap();
        let folders = folders(root.path());
        let list = root.path().join("dicom_2.txt");
        std::fs::write(&list, "").unwrap();
        let out = root.path().join("out");
        let args = TestCli::try_parse_from(["file2json", "-o", out.to_str().unwrap()])
            .unwrap()
            .run;

        assert!(process_list(&args, &list, &folders).await.unwrap());
        assert!(folders.done.join("dicom_2.txt").exists());
        assert!(!folders.temp.join("dicom_2.txt").exists());
    }
}
