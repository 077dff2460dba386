//! Batch preparation.

use std::path::PathBuf;

/// An ordered group of input paths processed together before a sink flush.
pub type Batch = Vec<PathBuf>;

/// Split `items` into consecutive batches of at most `batch_size` items.
///
/// The batch size is clamped to `1..=items.len()`, so an oversized batch
/// size yields a single batch and an empty list yields no batch at all.
pub fn prepare_batches<T: Clone>(items: &[T], batch_size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = batch_size.clamp(1, items.len());
    items.chunks(size).map(<[T]>::to_vec).collect()
}
