//! Error side-channel.
//!
//! Paths that could not be extracted are appended, one per line, to a plain
//! text file next to the run's log file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

/// Append-only record of failed input paths.
#[derive(Debug)]
pub struct ErrorLog {
    path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl ErrorLog {
    /// Record into the given file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            lock: Mutex::new(()),
        }
    }

    /// Record next to `log_file`: `run.log` gives `run.errors.txt`.
    pub fn for_log_file(log_file: &Path) -> Self {
        Self::at(Self::side_channel_path(log_file))
    }

    /// An error log that drops every entry.
    pub fn disabled() -> Self {
        Self {
            path: None,
            lock: Mutex::new(()),
        }
    }

    pub fn side_channel_path(log_file: &Path) -> PathBuf {
        let stem = log_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dicom2elk".to_string());
        log_file.with_file_name(format!("{}.errors.txt", stem))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one failed path.
    pub fn record(&self, failed: &Path) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", failed.display())
    }

    /// Append a failed path, logging instead of failing when the side-channel
    /// itself cannot be written.
    pub fn record_or_warn(&self, failed: &Path) {
        if let Err(e) = self.record(failed) {
            warn!(
                path = %failed.display(),
                error = %e,
                "Failed to record path in error log"
            );
        }
    }

    /// Every path recorded so far, in order.
    pub fn entries(&self) -> io::Result<Vec<PathBuf>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(text
                .lines()
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_channel_path() {
        let path = ErrorLog::side_channel_path(Path::new("/out/dicom2elk.log"));
        assert_eq!(path, PathBuf::from("/out/dicom2elk.errors.txt"));
    }

    #[test]
    fn test_record_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::for_log_file(&dir.path().join("run.log"));

        log.record(Path::new("/data/a.dcm")).unwrap();
        log.record(Path::new("/data/b.dcm")).unwrap();

        assert_eq!(
            log.entries().unwrap(),
            vec![PathBuf::from("/data/a.dcm"), PathBuf::from("/data/b.dcm")]
        );

        let reopened = ErrorLog::for_log_file(&dir.path().join("run.log"));
        reopened.record(Path::new("/data/c.dcm")).unwrap();
        assert_eq!(reopened.entries().unwrap().len(), 3);
    }

    #[test]
    fn test_disabled_log() {
        let log = ErrorLog::disabled();
        log.record(Path::new("/data/a.dcm")).unwrap();
        assert!(log.entries().unwrap().is_empty());
        assert!(log.path().is_none());
    }
}
