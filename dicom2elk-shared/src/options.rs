//! Typed run options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options controlling how a single file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Stop reading before the Pixel Data element (7FE0,0010).
    ///
    /// Defaults to `true`: only the header and metadata section is parsed.
    pub stop_before_pixels: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            stop_before_pixels: true,
        }
    }
}

impl ExtractOptions {
    /// Options that read the whole file, bulk pixel data included.
    pub fn full_read() -> Self {
        Self {
            stop_before_pixels: false,
        }
    }
}

/// Parallelism strategy used when more than one worker is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Items are partitioned across OS worker processes.
    #[serde(rename = "multiprocessing")]
    ProcessPool,
    /// Items run as tasks on a bounded async pool inside this process.
    #[serde(rename = "asyncio")]
    CooperativeTask,
}

impl ConcurrencyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessPool => "multiprocessing",
            Self::CooperativeTask => "asyncio",
        }
    }
}

impl Default for ConcurrencyMode {
    fn default() -> Self {
        Self::ProcessPool
    }
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown concurrency mode name.
#[derive(Debug, Clone, Error)]
#[error("unknown concurrency mode '{0}' (expected 'multiprocessing' or 'asyncio')")]
pub struct ParseModeError(pub String);

impl FromStr for ConcurrencyMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "multiprocessing" | "process" | "process-pool" => Ok(Self::ProcessPool),
            "asyncio" | "task" | "cooperative-task" => Ok(Self::CooperativeTask),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}
