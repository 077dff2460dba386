//! # dicom2elk Shared
//!
//! Data structures shared by the extraction pipeline, the search index
//! repository and the command line tools.

mod batch;
mod document;
mod options;
mod outcome;
mod tally;

pub use batch::{prepare_batches, Batch};
pub use document::{Document, FILEPATH_KEY, SOP_INSTANCE_UID_TAG};
pub use options::{ConcurrencyMode, ExtractOptions, ParseModeError};
pub use outcome::{ItemOutcome, SkipReason};
pub use tally::{RunTally, TallyMismatch};
