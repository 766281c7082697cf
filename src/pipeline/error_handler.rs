use log::{debug, warn};
use std::path::PathBuf;

/// Log directory entries the walk could not read. They are retried on the next cycle.
pub fn report_skipped_paths(skipped: &[(PathBuf, String)]) {
    if skipped.is_empty() {
        return;
    }
    warn!(
        "Skipped {} paths due to permission errors or access issues",
        skipped.len()
    );
    for (path, msg) in skipped {
        debug!("  skipped: {} ({})", path.display(), msg);
    }
}
