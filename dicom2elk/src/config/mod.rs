//! Run configuration: command-line flags, normalized settings and wiring.

mod cli;
mod dependencies;
mod settings;

pub use cli::{OutputMode, RunArgs};
pub use dependencies::Dependencies;
pub use settings::{resolve_worker_count, RunSettings, DEFAULT_LOG_NAME};

pub use crate::logging::LogLevel;
