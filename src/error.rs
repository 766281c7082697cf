//! Error taxonomy for scanning, per-record processing, index transport and persisted state.

use std::path::PathBuf;
use thiserror::Error;

/// Container could not be opened or parsed. Not fatal: the container stays unmarked and is retried next cycle.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot open container {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error in {path} at byte {offset}: {source}")]
    Read {
        path: PathBuf,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {path} at byte {offset}: {reason}")]
    Malformed {
        path: PathBuf,
        offset: u64,
        reason: String,
    },
}

/// Failure on a single record after admission. Persisted to `submission_errors`; never fatal.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("submission failed: {0}")]
    Transport(#[from] TransportError),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Index unreachable or protocol failure. Non-2xx responses are logged, not raised.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Persisted state failure. Fatal at startup; during a cycle the affected write is skipped.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("database runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("unsupported persistence provider '{0}' (expected sqlite, postgres or memory)")]
    UnsupportedProvider(String),

    #[error("provider '{0}' needs a [database] connection string")]
    MissingConnection(String),

    #[error("state store lock poisoned")]
    Poisoned,
}
