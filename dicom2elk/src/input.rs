//! Input list reading.

use std::path::{Path, PathBuf};

use crate::AppError;

/// Read a newline-delimited list of file paths.
///
/// Surrounding whitespace is trimmed and blank lines are ignored.
pub fn read_input_list(path: &Path) -> Result<Vec<PathBuf>, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::config(format!("cannot read input list {}: {}", path.display(), e))
    })?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.txt");
        std::fs::write(&list, "/data/a.dcm\n\n  /data/b.dcm  \r\n\n").unwrap();

        let items = read_input_list(&list).unwrap();
        assert_eq!(
            items,
            vec![PathBuf::from("/data/a.dcm"), PathBuf::from("/data/b.dcm")]
        );
    }

    #[test]
    fn test_missing_list_is_config_error() {
        let err = read_input_list(Path::new("/nonexistent/list.txt")).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
