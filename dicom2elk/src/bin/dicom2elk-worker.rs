//! Process-pool worker.
//!
//! Reads one request from stdin, writes one reply line per item to stdout.
//! Logs go to stderr.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use dicom2elk::logging::{self, LogLevel};
use dicom2elk_pipeline::dispatcher::worker;

#[derive(Parser)]
#[command(name = "dicom2elk-worker", version)]
struct Cli {
    #[arg(long, value_enum, ignore_case = true, default_value = "INFO")]
    log_level: LogLevel,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init_worker(cli.log_level) {
        eprintln!("dicom2elk-worker: {}", e);
        return ExitCode::FAILURE;
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match worker::serve(stdin.lock(), stdout.lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Worker failed");
            ExitCode::FAILURE
        }
    }
}
