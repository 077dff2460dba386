//! Progress reporting hooks.

use dicom2elk_shared::ItemOutcome;

/// Receives progress events while batches run.
///
/// Purely cosmetic: observers never influence outcomes. Every method has an
/// empty default.
pub trait ProgressObserver: Send + Sync {
    /// A batch of `size` items is about to be dispatched.
    fn batch_started(&self, _index: usize, _total: usize, _size: usize) {}

    /// One item of the current batch has an outcome.
    fn item_done(&self, _outcome: &ItemOutcome) {}

    /// The batch has been folded into the tally.
    fn batch_finished(&self, _index: usize, _processed: usize, _skipped: usize) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}
