use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use dicom2elk::config::DEFAULT_LOG_NAME;
use dicom2elk::progress::BatchProgress;
use dicom2elk::{logging, runner, RunArgs, RunSettings};

/// Extract DICOM metadata to JSON files or a search index.
#[derive(Parser)]
#[command(name = "dicom2elk", version)]
struct Cli {
    /// Text file listing one DICOM file path per line.
    #[arg(short, long)]
    input_dcm_list: PathBuf,

    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match RunSettings::from_args(&cli.run, &cli.input_dcm_list, DEFAULT_LOG_NAME) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("dicom2elk: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(settings.log_level, Some(&settings.log_file)) {
        eprintln!("dicom2elk: {}", e);
        return ExitCode::FAILURE;
    }

    match runner::run_job(&settings, Arc::new(BatchProgress::for_terminal())).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run failed: {}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
