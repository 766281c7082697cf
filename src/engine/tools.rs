//! Path and time utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Path as stored in the state DB and sent to the index (forward slashes on every platform).
pub fn path_to_db_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Nanoseconds since the Unix epoch; 0 if the clock is before the epoch.
pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Rewrite a container path from the scan root to the virtual cache prefix.
/// Paths outside `scan_root` are returned unchanged.
pub fn cache_path(container: &str, scan_root: &str, cache_prefix: &str) -> String {
    match container.strip_prefix(scan_root) {
        Some(rest) if !scan_root.is_empty() => format!("{cache_prefix}{rest}"),
        _ => container.to_string(),
    }
}

/// True when the crawler is still writing this container.
pub fn is_in_progress(path: &Path, suffix: &str) -> bool {
    !suffix.is_empty()
        && path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(suffix))
            .unwrap_or(false)
}

/// True for the state database at `db` and its `-wal`/`-shm`/`-journal` companions.
pub fn is_state_file(path: &Path, db: &Path) -> bool {
    path.to_string_lossy()
        .strip_prefix(db.to_string_lossy().as_ref())
        .map(|rest| matches!(rest, "" | "-wal" | "-shm" | "-journal"))
        .unwrap_or(false)
}

/// Canonicalize the scan root and make sure it is a directory.
pub fn check_root_and_canonicalize(path: &Path) -> Result<PathBuf> {
    let root = path
        .canonicalize()
        .with_context(|| format!("canonicalize root {}", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("root is not a directory: {}", root.display());
    }
    Ok(root)
}
