//! SQLite table of discovered file paths.
//!
//! Rows start with a NULL `batch`, are staged with the `TMP_` marker and end
//! up labelled with the name of the list file they were dumped to.

use std::path::Path;

use rusqlite::{params, Connection};

use super::CatalogError;

/// Marker for rows selected for the next dump.
pub const STAGED_MARKER: &str = "TMP_";

/// Handle on the catalog table, with an open write transaction.
pub struct CatalogStore {
    conn: Connection,
    table: String,
}

impl CatalogStore {
    /// Open (or create) the database and table.
    pub fn open(db_file: &Path, table: &str) -> Result<Self, CatalogError> {
        let conn = Connection::open(db_file)?;
        Self::with_connection(conn, table)
    }

    #[cfg(test)]
    pub fn open_in_memory(table: &str) -> Result<Self, CatalogError> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self, CatalogError> {
        validate_table_name(table)?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                path TEXT PRIMARY KEY,
                access_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                batch TEXT
            );
            CREATE INDEX IF NOT EXISTS {table}_idx ON {table} (path) WHERE batch IS NULL;
            CREATE INDEX IF NOT EXISTS {table}_idx_tmp ON {table} (batch);
            BEGIN;"
        ))?;

        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Insert a path unless it is already catalogued.
    ///
    /// Returns `true` when a new row was added.
    pub fn insert(&self, path: &str) -> Result<bool, CatalogError> {
        let changed = self.conn.execute(
            &format!("INSERT OR IGNORE INTO {} (path) VALUES (?1)", self.table),
            params![path],
        )?;
        Ok(changed > 0)
    }

    /// Mark up to `limit` unbatched rows, in path order, as staged.
    pub fn stage(&self, limit: usize) -> Result<usize, CatalogError> {
        let table = &self.table;
        let staged = self.conn.execute(
            &format!(
                "UPDATE {table} SET batch = ?1 WHERE path IN \
                 (SELECT path FROM {table} WHERE batch IS NULL ORDER BY path LIMIT ?2)"
            ),
            params![STAGED_MARKER, limit as i64],
        )?;
        Ok(staged)
    }

    /// Paths currently staged, in path order.
    pub fn staged_paths(&self) -> Result<Vec<String>, CatalogError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT path FROM {} WHERE batch = ?1 ORDER BY path",
            self.table
        ))?;
        let rows = stmt.query_map(params![STAGED_MARKER], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }

    /// Label every staged row with `batch`.
    pub fn assign_batch(&self, batch: &str) -> Result<usize, CatalogError> {
        let assigned = self.conn.execute(
            &format!("UPDATE {} SET batch = ?1 WHERE batch = ?2", self.table),
            params![batch, STAGED_MARKER],
        )?;
        Ok(assigned)
    }

    /// Rows not yet written to a list file (unbatched or staged).
    pub fn pending_count(&self) -> Result<usize, CatalogError> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE batch IS NULL OR batch = ?1",
                self.table
            ),
            params![STAGED_MARKER],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn unbatched_count(&self) -> Result<usize, CatalogError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE batch IS NULL", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn len(&self) -> Result<usize, CatalogError> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                    row.get(0)
                })?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, CatalogError> {
        Ok(self.len()? == 0)
    }

    /// Commit what has been done so far and start a new transaction.
    pub fn checkpoint(&self) -> Result<(), CatalogError> {
        self.conn.execute_batch("COMMIT; BEGIN;")?;
        Ok(())
    }

    /// Commit and close the connection.
    pub fn close(self) -> Result<(), CatalogError> {
        self.conn.execute_batch("COMMIT;")?;
        self.conn.close().map_err(|(_, e)| CatalogError::from(e))
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(table: &str) -> Result<(), CatalogError> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CatalogError::invalid_table(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_ignores_duplicates() {
        let store = CatalogStore::open_in_memory("pacs_file_paths").unwrap();

        assert!(store.insert("/data/a").unwrap());
        assert!(!store.insert("/data/a").unwrap());
        assert!(store.insert("/data/b").unwrap());
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.unbatched_count().unwrap(), 2);
    }

    #[test]
    fn test_stage_and_assign() {
        let store = CatalogStore::open_in_memory("paths").unwrap();
        for path in ["/c", "/a", "/d", "/b"] {
            store.insert(path).unwrap();
        }

        assert_eq!(store.stage(2).unwrap(), 2);
        assert_eq!(store.staged_paths().unwrap(), vec!["/a", "/b"]);
        assert_eq!(store.pending_count().unwrap(), 4);

        assert_eq!(store.assign_batch("dicom_1.txt").unwrap(), 2);
        assert!(store.staged_paths().unwrap().is_empty());
        assert_eq!(store.pending_count().unwrap(), 2);
        assert_eq!(store.unbatched_count().unwrap(), 2);
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("file2list.db");

        let store = CatalogStore::open(&db, "pacs_file_paths").unwrap();
        store.insert("/data/a").unwrap();
        store.checkpoint().unwrap();
        store.insert("/data/b").unwrap();
        store.close().unwrap();

        let store = CatalogStore::open(&db, "pacs_file_paths").unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_invalid_table_name() {
        for name in ["", "1paths", "paths; DROP TABLE x", "a-b"] {
            assert!(matches!(
                CatalogStore::open_in_memory(name),
                Err(CatalogError::InvalidTable(_))
            ));
        }
    }
}
