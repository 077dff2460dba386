//! Directory cataloging for `file2list`.
//!
//! Paths found under a root directory are recorded in a SQLite table and
//! periodically dumped to numbered list files that `dicom2elk` and
//! `file2json` consume. Re-running over the same tree only dumps paths that
//! were not catalogued before.

mod store;
mod walker;

pub use store::{CatalogStore, STAGED_MARKER};
pub use walker::{is_recent, walk_files, MTIME_CUTOFF_SECS};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{debug, info};

/// Default database file.
pub const DEFAULT_DB_FILE: &str = "file2list.db";
/// Default table name.
pub const DEFAULT_TABLE: &str = "pacs_file_paths";
/// Default number of paths per list file.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Errors raised while cataloging.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid table name: {0:?}")]
    InvalidTable(String),

    #[error("Invalid catalog configuration: {0}")]
    Config(String),
}

impl CatalogError {
    pub fn invalid_table(name: impl Into<String>) -> Self {
        Self::InvalidTable(name.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Settings for one cataloging run.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub db_file: PathBuf,
    pub table: String,
    /// Stop after this many files have been visited.
    pub limit: Option<usize>,
    pub batch_size: usize,
    pub sleep_time_ms: u64,
}

impl CatalogConfig {
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
            db_file: PathBuf::from(DEFAULT_DB_FILE),
            table: DEFAULT_TABLE.to_string(),
            limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
            sleep_time_ms: 0,
        }
    }
}

/// Counters of a finished cataloging run.
#[derive(Debug, Clone, Default)]
pub struct CatalogSummary {
    /// Files seen during the walk, old or new.
    pub visited: usize,
    /// Paths added to the table by this run.
    pub inserted: usize,
    /// List files written by this run, in order.
    pub dumps: Vec<PathBuf>,
    /// Rows in the table after closing.
    pub table_size: usize,
}

/// Walks a tree and keeps the catalog table and list files in sync.
pub struct Cataloger {
    store: CatalogStore,
    config: CatalogConfig,
    summary: CatalogSummary,
    progress: ProgressBar,
}

impl Cataloger {
    /// Open the database and create the table if needed.
    pub fn open(config: CatalogConfig) -> Result<Self, CatalogError> {
        if config.batch_size == 0 {
            return Err(CatalogError::config("batch size must be at least 1"));
        }
        std::fs::create_dir_all(&config.output_dir)?;

        let store = CatalogStore::open(&config.db_file, &config.table)?;
        info!(
            db = %config.db_file.display(),
            table = %config.table,
            rows = store.len()?,
            "Catalog opened"
        );

        Ok(Self {
            store,
            config,
            summary: CatalogSummary::default(),
            progress: ProgressBar::hidden(),
        })
    }

    /// Report visited files on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Flush leftovers, walk the tree, then clean and close.
    pub fn run(mut self) -> Result<CatalogSummary, CatalogError> {
        self.clean()?;

        let root = self.config.root.clone();
        walk_files(&root, &mut |path: &Path| self.visit(path))?;

        info!("Nbr file read: {}", self.summary.visited);
        self.progress.finish_and_clear();
        self.close()
    }

    fn visit(&mut self, path: &Path) -> Result<ControlFlow<()>, CatalogError> {
        self.summary.visited += 1;
        self.progress.inc(1);

        let recent = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map(is_recent)
            .unwrap_or(false);

        if recent && self.store.insert(&path.to_string_lossy())? {
            self.summary.inserted += 1;
            if self.summary.inserted % self.config.batch_size == 0 {
                self.store.stage(self.config.batch_size)?;
                self.dump_staged()?;
            }
        }

        if let Some(limit) = self.config.limit {
            if self.summary.visited >= limit {
                info!(limit, "File limit reached");
                return Ok(ControlFlow::Break(()));
            }
        }

        if self.config.sleep_time_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.sleep_time_ms));
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Dump staged rows, then stage and dump until nothing is pending.
    pub fn clean(&mut self) -> Result<(), CatalogError> {
        self.dump_staged()?;
        while self.store.pending_count()? > 0 {
            self.store.stage(self.config.batch_size)?;
            self.dump_staged()?;
        }
        Ok(())
    }

    /// Write staged paths to a new list file and label them with its name.
    fn dump_staged(&mut self) -> Result<Option<PathBuf>, CatalogError> {
        let paths = self.store.staged_paths()?;
        if paths.is_empty() {
            return Ok(None);
        }

        let target = unique_dump_path(&self.config.output_dir);
        let mut writer = BufWriter::new(File::create(&target)?);
        for path in &paths {
            writeln!(writer, "{}", path)?;
        }
        writer.flush()?;

        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.store.assign_batch(&name)?;
        self.store.checkpoint()?;

        debug!(file = %target.display(), paths = paths.len(), "List file written");
        self.summary.dumps.push(target.clone());
        Ok(Some(target))
    }

    /// Clean, log the table size and commit.
    pub fn close(mut self) -> Result<CatalogSummary, CatalogError> {
        self.clean()?;
        self.summary.table_size = self.store.len()?;
        info!("Nbr file in db: {}", self.summary.table_size);
        self.store.close()?;
        Ok(self.summary)
    }
}

/// `<dir>/dicom_<YYYYmmdd_HHMMSSffffff>.txt`, suffixed when taken.
fn unique_dump_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%6f").to_string();
    let mut candidate = dir.join(format!("dicom_{}.txt", stamp));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("dicom_{}_{}.txt", stamp, n));
        n += 1;
    }
    candidate
}
