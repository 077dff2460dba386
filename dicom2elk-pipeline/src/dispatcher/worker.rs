//! Worker process protocol.
//!
//! The coordinator writes one [`WorkerRequest`] as JSON to the worker's
//! stdin and closes it. The worker answers with one [`WorkerReply`] per item,
//! one JSON object per line, as soon as each item is done.

use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ItemJob, JobSettings};
use crate::errors::PipelineError;
use dicom2elk_shared::ItemOutcome;

/// Items assigned to one worker process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub settings: JobSettings,
    pub items: Vec<PathBuf>,
}

/// Outcome of the item at `index` in the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReply {
    pub index: usize,
    pub outcome: ItemOutcome,
}

/// Handle one request read from `input`, streaming replies to `output`.
///
/// Returns the number of items handled.
pub fn serve<R: Read, W: Write>(mut input: R, mut output: W) -> Result<usize, PipelineError> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;

    let request: WorkerRequest = serde_json::from_slice(&raw)
        .map_err(|e| PipelineError::protocol(format!("invalid worker request: {}", e)))?;

    info!(items = request.items.len(), "Worker received items");
    let job = ItemJob::new(&request.settings);

    for (index, path) in request.items.iter().enumerate() {
        let reply = WorkerReply {
            index,
            outcome: job.run_blocking(path),
        };
        serde_json::to_writer(&mut output, &reply)
            .map_err(|e| PipelineError::protocol(e.to_string()))?;
        output.write_all(b"\n")?;
        output.flush()?;
        debug!(index = index, "Reported item");
    }

    Ok(request.items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::test_support::write_dicom;
    use crate::sink::SinkSpec;
    use dicom2elk_shared::SkipReason;

    #[test]
    fn test_serve_streams_one_line_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.dcm");
        write_dicom(&good, "1.2.3.4");
        let missing = dir.path().join("missing.dcm");

        let request = WorkerRequest {
            settings: JobSettings::new(SinkSpec::Bulk),
            items: vec![good.clone(), missing.clone()],
        };
        let input = serde_json::to_vec(&request).unwrap();
        let mut output = Vec::new();

        let handled = serve(input.as_slice(), &mut output).unwrap();
        assert_eq!(handled, 2);

        let replies: Vec<WorkerReply> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].index, 0);
        match &replies[0].outcome {
            ItemOutcome::Pending { document } => {
                assert_eq!(document.primary_identifier(), Some("1.2.3.4"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(matches!(
            replies[1].outcome,
            ItemOutcome::Skipped {
                reason: SkipReason::Extraction(_),
                ..
            }
        ));
    }

    #[test]
    fn test_serve_rejects_garbage_request() {
        let mut output = Vec::new();
        let err = serve(&b"not json"[..], &mut output).unwrap_err();

        assert!(matches!(err, PipelineError::ProtocolError(_)));
        assert!(output.is_empty());
    }
}
