//! Persisted submitter state: processed containers, indexed pages, submission errors.

mod postgres;
mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use std::path::Path;
use std::sync::Arc;

use crate::error::StoreError;
use crate::types::{IndexedPage, StoreCounts, SubmissionErrorRow};
use crate::utils::config::DatabaseConfig;

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Schema for the three persisted relations.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS processed_files (
    path TEXT PRIMARY KEY,
    processed_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS indexed_pages (
    url TEXT NOT NULL,
    indexed_at INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    container TEXT NOT NULL,
    record_offset INTEGER NOT NULL,
    PRIMARY KEY (url, indexed_at)
);

CREATE TABLE IF NOT EXISTS submission_errors (
    url TEXT NOT NULL,
    failed_at INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    container TEXT NOT NULL,
    record_offset INTEGER NOT NULL,
    message TEXT NOT NULL,
    PRIMARY KEY (url, failed_at)
);
"#;

pub(crate) const INSERT_PROCESSED_SQL: &str =
    "INSERT OR IGNORE INTO processed_files (path, processed_at) VALUES (?1, ?2)";

pub(crate) const INSERT_INDEXED_SQL: &str = "INSERT OR REPLACE INTO indexed_pages \
     (url, indexed_at, mime_type, container, record_offset) VALUES (?1, ?2, ?3, ?4, ?5)";

pub(crate) const INSERT_ERROR_SQL: &str = "INSERT OR REPLACE INTO submission_errors \
     (url, failed_at, mime_type, container, record_offset, message) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

/// Backend for the persisted relations. Implementations acquire their connection per call.
pub trait StateStore: Send + Sync {
    /// True once `mark_processed` has been called for this container path.
    fn is_processed(&self, container: &Path) -> Result<bool, StoreError>;

    /// Record the container as fully processed. Marking twice is a no-op.
    fn mark_processed(&self, container: &Path) -> Result<(), StoreError>;

    /// Write a batch of successes in one transaction. Returns rows written.
    fn record_indexed(&self, pages: &[IndexedPage]) -> Result<usize, StoreError>;

    /// Write one failure immediately.
    fn record_error(&self, row: &SubmissionErrorRow) -> Result<(), StoreError>;

    fn counts(&self) -> Result<StoreCounts, StoreError>;
}

/// Persistence backend named by `[database] provider`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// Embedded SQLite file at the given path.
    Sqlite(std::path::PathBuf),
    /// Client-server PostgreSQL database at the given connection URL.
    Postgres(String),
    /// Single in-memory SQLite database, lost at exit.
    Memory,
}

impl StoreBackend {
    pub fn from_config(cfg: &DatabaseConfig) -> Result<Self, StoreError> {
        match cfg.provider.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(StoreBackend::Sqlite(cfg.connection.clone().into())),
            "postgres" | "postgresql" | "pg" => match cfg.connection.trim() {
                "" => Err(StoreError::MissingConnection(cfg.provider.clone())),
                url => Ok(StoreBackend::Postgres(url.to_string())),
            },
            "memory" => Ok(StoreBackend::Memory),
            other => Err(StoreError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Open the configured backend and ensure the schema exists.
pub fn open_state_store(cfg: &DatabaseConfig) -> Result<Arc<dyn StateStore>, StoreError> {
    let store: Arc<dyn StateStore> = match StoreBackend::from_config(cfg)? {
        StoreBackend::Sqlite(path) => Arc::new(SqliteStore::open(&path)?),
        StoreBackend::Postgres(url) => Arc::new(PostgresStore::connect(&url)?),
        StoreBackend::Memory => Arc::new(SqliteStore::open_in_memory()?),
    };
    Ok(store)
}
