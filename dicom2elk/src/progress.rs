//! Terminal progress bar for batch runs.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

use dicom2elk_pipeline::ProgressObserver;
use dicom2elk_shared::ItemOutcome;

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Per-batch progress bar drawn on stderr.
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    /// A visible bar, or a hidden one when `visible` is false.
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Visible only when stderr is a terminal.
    pub fn for_terminal() -> Self {
        Self::new(std::io::stderr().is_terminal())
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressObserver for BatchProgress {
    fn batch_started(&self, index: usize, total: usize, size: usize) {
        self.bar.reset();
        self.bar.set_length(size as u64);
        self.bar.set_message(format!("batch {}/{}", index, total));
    }

    fn item_done(&self, _outcome: &ItemOutcome) {
        self.bar.inc(1);
    }

    fn batch_finished(&self, index: usize, processed: usize, skipped: usize) {
        self.bar.set_message(format!(
            "batch {} done ({} processed, {} skipped)",
            index, processed, skipped
        ));
        self.bar.finish_and_clear();
    }
}
