//! SQLite backend: file-backed (connection per operation, WAL) or a shared in-memory database.

use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::{
    INSERT_ERROR_SQL, INSERT_INDEXED_SQL, INSERT_PROCESSED_SQL, SCHEMA, StateStore, WAL_PRAGMAS,
};
use crate::engine::tools::{now_ns, path_to_db_string};
use crate::error::StoreError;
use crate::types::{IndexedPage, StoreCounts, SubmissionErrorRow};
use crate::utils::config::DB_INSERT_BATCH_SIZE;

/// Workers and the walker write concurrently; wait this long on a locked database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

enum Location {
    File(PathBuf),
    Memory(Mutex<Connection>),
}

pub struct SqliteStore {
    location: Location,
}

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch(WAL_PRAGMAS)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

impl SqliteStore {
    /// Open or create the state DB at `path`, applying schema and WAL once up front.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        apply_wal_and_schema(&conn)?;
        Ok(SqliteStore {
            location: Location::File(path.to_path_buf()),
        })
    }

    /// In-memory DB with the same schema (no WAL pragmas needed).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            location: Location::Memory(Mutex::new(conn)),
        })
    }

    /// Run `f` on a connection scoped to this call. File backends open and close a fresh one.
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        match &self.location {
            Location::File(path) => {
                let mut conn = Connection::open(path)?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                Ok(f(&mut conn)?)
            }
            Location::Memory(conn) => {
                let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
                Ok(f(&mut guard)?)
            }
        }
    }
}

fn count(conn: &Connection, table: &str) -> rusqlite::Result<usize> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
    Ok(n.max(0) as usize)
}

impl StateStore for SqliteStore {
    fn is_processed(&self, container: &Path) -> Result<bool, StoreError> {
        let key = path_to_db_string(container);
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT 1 FROM processed_files WHERE path = ?1",
                [key.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
        })
    }

    fn mark_processed(&self, container: &Path) -> Result<(), StoreError> {
        let key = path_to_db_string(container);
        self.with_conn(|conn| {
            conn.execute(INSERT_PROCESSED_SQL, (key.as_str(), now_ns()))
                .map(|_| ())
        })
    }

    fn record_indexed(&self, pages: &[IndexedPage]) -> Result<usize, StoreError> {
        if pages.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            for chunk in pages.chunks(DB_INSERT_BATCH_SIZE) {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare_cached(INSERT_INDEXED_SQL)?;
                    for p in chunk {
                        stmt.execute((
                            p.url.as_str(),
                            p.time_ns,
                            p.mime_type.as_str(),
                            p.container.as_str(),
                            p.offset as i64,
                        ))?;
                    }
                }
                tx.commit()?;
            }
            Ok(pages.len())
        })
    }

    fn record_error(&self, row: &SubmissionErrorRow) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                INSERT_ERROR_SQL,
                (
                    row.url.as_str(),
                    row.time_ns,
                    row.mime_type.as_str(),
                    row.container.as_str(),
                    row.offset as i64,
                    row.message.as_str(),
                ),
            )
            .map(|_| ())
        })
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        self.with_conn(|conn| {
            Ok(StoreCounts {
                processed_files: count(conn, "processed_files")?,
                indexed_pages: count(conn, "indexed_pages")?,
                submission_errors: count(conn, "submission_errors")?,
            })
        })
    }
}
