//! Recursive directory traversal.

use std::ops::ControlFlow;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use super::CatalogError;

/// 1990-01-01T00:00:00Z. Files modified at or before this are ignored.
pub const MTIME_CUTOFF_SECS: u64 = 631_152_000;

pub fn mtime_cutoff() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(MTIME_CUTOFF_SECS)
}

/// Whether `modified` is recent enough to be catalogued.
pub fn is_recent(modified: SystemTime) -> bool {
    modified > mtime_cutoff()
}

/// Visit every regular file under `root`, depth first, in name order.
///
/// Unreadable directories are skipped with a warning. The walk ends early
/// when `visit` breaks.
pub fn walk_files<F>(root: &Path, visit: &mut F) -> Result<ControlFlow<()>, CatalogError>
where
    F: FnMut(&Path) -> Result<ControlFlow<()>, CatalogError>,
{
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %root.display(), error = %e, "Cannot read directory");
            return Ok(ControlFlow::Continue(()));
        }
    };

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %root.display(), error = %e, "Cannot read directory entry");
                continue;
            }
        };
        let path = entry.path();
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => dirs.push(path),
            Ok(_) if path.is_file() => files.push(path),
            _ => {}
        }
    }
    files.sort();
    dirs.sort();

    for file in &files {
        if visit(file)?.is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    for dir in &dirs {
        if walk_files(dir, visit)?.is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}
