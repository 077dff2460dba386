//! File-system JSON sink.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use dicom2elk_shared::{Document, ItemOutcome, SkipReason};

/// Hex digits of the path hash used in fallback names.
const FALLBACK_HASH_LEN: usize = 16;

/// Writes each document to `<output_dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Target path for `document`.
    pub fn output_path(&self, document: &Document) -> PathBuf {
        self.output_dir
            .join(format!("{}.json", output_file_stem(document)))
    }

    /// Write `document` and verify it landed on disk.
    pub fn write_blocking(&self, document: Document) -> ItemOutcome {
        let source = source_of(&document);
        let output = self.output_path(&document);

        let written = render(&document).and_then(|bytes| std::fs::write(&output, bytes));
        Self::verify(source, output, written, output_exists_blocking)
    }

    /// Async variant of [`FileSink::write_blocking`].
    pub async fn write(&self, document: Document) -> ItemOutcome {
        let source = source_of(&document);
        let output = self.output_path(&document);

        let written = match render(&document) {
            Ok(bytes) => tokio::fs::write(&output, bytes).await,
            Err(e) => Err(e),
        };
        let exists = tokio::fs::try_exists(&output).await.unwrap_or(false);
        Self::verify(source, output, written, |_| exists)
    }

    fn verify(
        source: PathBuf,
        output: PathBuf,
        written: std::io::Result<()>,
        exists: impl FnOnce(&Path) -> bool,
    ) -> ItemOutcome {
        if let Err(e) = &written {
            warn!(
                source = %source.display(),
                output = %output.display(),
                error = %e,
                "Failed to write document"
            );
        }

        if written.is_ok() && exists(&output) {
            debug!(output = %output.display(), "Document written");
            ItemOutcome::Written { source, output }
        } else {
            warn!(output = %output.display(), "Output file missing after write");
            ItemOutcome::skipped(source, SkipReason::WriteVerification(output))
        }
    }
}

fn output_exists_blocking(path: &Path) -> bool {
    path.exists()
}

fn source_of(document: &Document) -> PathBuf {
    document.filepath().map(PathBuf::from).unwrap_or_default()
}

/// Pretty JSON with a 4-space indent.
fn render(document: &Document) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    document.serialize(&mut serializer)?;
    Ok(bytes)
}

/// File stem for `document`: its SOP Instance UID when that is a safe
/// file name, otherwise `error_<hash of the source path>`.
pub fn output_file_stem(document: &Document) -> String {
    match document.primary_identifier() {
        Some(uid) if is_safe_identifier(uid) => uid.to_string(),
        _ => fallback_stem(document.filepath().unwrap_or_default()),
    }
}

fn is_safe_identifier(uid: &str) -> bool {
    !uid.is_empty()
        && uid != "."
        && !uid.contains("..")
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

fn fallback_stem(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let hash = hex::encode(digest);
    format!("error_{}", &hash[..FALLBACK_HASH_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn document(uid: Option<&str>, source: &str) -> Document {
        let mut fields = Map::new();
        if let Some(uid) = uid {
            fields.insert("00080018".into(), json!({"vr": "UI", "Value": [uid]}));
        }
        fields.insert("00080060".into(), json!({"vr": "CS", "Value": ["MR"]}));
        Document::new(fields, Path::new(source))
    }

    #[test]
    fn test_stem_uses_sop_instance_uid() {
        let doc = document(Some("1.2.840.113619.2.1"), "/data/a.dcm");
        assert_eq!(output_file_stem(&doc), "1.2.840.113619.2.1");
    }

    #[test]
    fn test_stem_fallback_is_deterministic() {
        let a = document(None, "/data/a.dcm");
        let b = document(None, "/data/b.dcm");

        let stem = output_file_stem(&a);
        assert!(stem.starts_with("error_"));
        assert_eq!(stem.len(), "error_".len() + FALLBACK_HASH_LEN);
        assert_eq!(stem, output_file_stem(&document(None, "/data/a.dcm")));
        assert_ne!(stem, output_file_stem(&b));
    }

    #[test]
    fn test_unsafe_identifier_falls_back() {
        for uid in ["", "../../etc/passwd", "a/b", "..", "1.2\\3"] {
            let doc = document(Some(uid), "/data/a.dcm");
            assert!(output_file_stem(&doc).starts_with("error_"), "uid={:?}", uid);
        }
    }

    #[test]
    fn test_write_blocking_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        let doc = document(Some("1.2.3"), "/data/a.dcm");

        let outcome = sink.write_blocking(doc.clone());

        let output = dir.path().join("1.2.3.json");
        assert_eq!(
            outcome,
            ItemOutcome::Written {
                source: PathBuf::from("/data/a.dcm"),
                output: output.clone(),
            }
        );

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("\n    \"00080018\""));
        let read_back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(read_back, doc);
    }

    #[tokio::test]
    async fn test_async_write_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        let doc = document(Some("1.2.3"), "/data/a.dcm");

        sink.write_blocking(doc.clone());
        let first = std::fs::read(dir.path().join("1.2.3.json")).unwrap();

        let outcome = sink.write(doc).await;
        assert!(outcome.is_processed());
        let second = std::fs::read(dir.path().join("1.2.3.json")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_unwritable_directory_is_skipped() {
        let sink = FileSink::new("/nonexistent/output");
        let outcome = sink.write_blocking(document(Some("1.2.3"), "/data/a.dcm"));

        match outcome {
            ItemOutcome::Skipped {
                reason: SkipReason::WriteVerification(path),
                ..
            } => assert_eq!(path, PathBuf::from("/nonexistent/output/1.2.3.json")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
