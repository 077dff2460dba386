//! Run tally bookkeeping.

use serde::Serialize;
use thiserror::Error;

use crate::outcome::ItemOutcome;

/// Raised when the tally no longer accounts for every item seen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tally mismatch: processed {processed} + skipped {skipped} != {expected} items")]
pub struct TallyMismatch {
    pub processed: usize,
    pub skipped: usize,
    pub expected: usize,
}

/// Cumulative processed/skipped counters for a whole run.
///
/// The counters only ever grow; they are folded in one batch at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTally {
    processed: usize,
    skipped: usize,
}

impl RunTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn total(&self) -> usize {
        self.processed + self.skipped
    }

    /// `(processed, skipped)`.
    pub fn as_tuple(&self) -> (usize, usize) {
        (self.processed, self.skipped)
    }

    /// Fold a completed batch into the tally.
    ///
    /// Returns the `(processed, skipped)` counts of that batch alone.
    pub fn record_batch(&mut self, outcomes: &[ItemOutcome]) -> (usize, usize) {
        let processed = outcomes.iter().filter(|o| o.is_processed()).count();
        let skipped = outcomes.len() - processed;
        self.processed += processed;
        self.skipped += skipped;
        (processed, skipped)
    }

    /// Check that every item seen so far is accounted for.
    pub fn verify(&self, expected: usize) -> Result<(), TallyMismatch> {
        if self.total() == expected {
            Ok(())
        } else {
            Err(TallyMismatch {
                processed: self.processed,
                skipped: self.skipped,
                expected,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::SkipReason;

    fn written(name: &str) -> ItemOutcome {
        ItemOutcome::Written {
            source: name.into(),
            output: format!("{}.json", name).into(),
        }
    }

    #[test]
    fn test_record_batch() {
        let mut tally = RunTally::new();
        let batch = vec![
            written("a"),
            ItemOutcome::skipped("b", SkipReason::Extraction("not dicom".into())),
            written("c"),
        ];

        assert_eq!(tally.record_batch(&batch), (2, 1));
        assert_eq!(tally.record_batch(&[written("d")]), (1, 0));
        assert_eq!(tally.as_tuple(), (3, 1));
        assert!(tally.verify(4).is_ok());
    }

    #[test]
    fn test_verify_mismatch() {
        let mut tally = RunTally::new();
        tally.record_batch(&[written("a")]);

        let err = tally.verify(2).unwrap_err();
        assert_eq!(err.expected, 2);
        assert_eq!(err.processed, 1);
    }

    #[test]
    fn test_empty_tally() {
        let tally = RunTally::new();
        assert_eq!(tally.as_tuple(), (0, 0));
        assert!(tally.verify(0).is_ok());
    }
}
