//! Directory walk and per-container processing: filter records, dispatch admitted ones to the pool,
//! then barrier, mark, commit, flush.

use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use super::context::SubmitContext;
use super::error_handler::report_skipped_paths;
use super::pool::WorkerPool;
use crate::engine::tools::{is_in_progress, is_state_file};
use crate::extract::{RecordFilter, Verdict};
use crate::source::RecordSource;
use crate::types::{CycleReport, SubmissionDocument};

/// One result from a directory walk: either a path to consider or an error with optional path.
pub enum WalkOutcome {
    Ok(PathBuf),
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`]. Directories are dropped; only files are containers.
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> Option<WalkOutcome> {
    match r {
        Ok(entry) if entry.file_type().is_dir() => None,
        Ok(entry) => Some(WalkOutcome::Ok(entry.into_path())),
        Err(err) => Some(WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        }),
    }
}

/// Depth-first walk of `root`, entries of each directory in file-name order.
pub fn walkdir_iter(root: &Path, follow_links: bool) -> impl Iterator<Item = WalkOutcome> {
    walkdir::WalkDir::new(root)
        .follow_links(follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_map(to_outcome_walkdir)
}

/// Record counts for one container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContainerTally {
    pub dispatched: u64,
    pub filtered: u64,
    /// Successes written to `indexed_pages` by this container's flush.
    pub flushed: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerResult {
    Processed(ContainerTally),
    SkippedInProgress,
    SkippedProcessed,
    /// The processed-state lookup failed; try again next cycle.
    SkippedUnknown,
    /// Open or parse failure; left unmarked so the next cycle retries it.
    Failed { reason: String, tally: ContainerTally },
}

/// Walks the scan root once, handing each container's admitted records to the pool.
pub struct DirectoryWalker<'a> {
    pub root: &'a Path,
    pub in_progress_suffix: &'a str,
    pub follow_links: bool,
    /// Files under the root that belong to the submitter itself (state DB and its WAL files).
    pub exclude: &'a [PathBuf],
    pub filter: &'a RecordFilter,
    pub source: &'a dyn RecordSource,
    pub pool: &'a WorkerPool<SubmissionDocument>,
    pub ctx: &'a SubmitContext,
}

impl DirectoryWalker<'_> {
    /// Process every container under the root, adding the totals to `report`.
    pub fn walk(&self, report: &mut CycleReport) {
        let mut skipped_paths = Vec::new();
        for outcome in walkdir_iter(self.root, self.follow_links) {
            let path = match outcome {
                WalkOutcome::Ok(path) => path,
                WalkOutcome::Err { msg, path } => {
                    skipped_paths.push((path.unwrap_or_else(|| self.root.to_path_buf()), msg));
                    continue;
                }
            };
            if self.exclude.iter().any(|db| is_state_file(&path, db)) {
                continue;
            }
            match self.process_container(&path) {
                ContainerResult::Processed(tally) => {
                    report.containers_processed += 1;
                    add_tally(report, tally);
                }
                ContainerResult::Failed { tally, .. } => {
                    report.containers_failed += 1;
                    add_tally(report, tally);
                }
                ContainerResult::SkippedInProgress
                | ContainerResult::SkippedProcessed
                | ContainerResult::SkippedUnknown => report.containers_skipped += 1,
            }
        }
        report_skipped_paths(&skipped_paths);
    }

    /// Submit one container. Returns only after every dispatched record has finished.
    pub fn process_container(&self, path: &Path) -> ContainerResult {
        if is_in_progress(path, self.in_progress_suffix) {
            info!("skipping {} (still being written)", path.display());
            return ContainerResult::SkippedInProgress;
        }
        match self.ctx.store.is_processed(path) {
            Ok(true) => {
                debug!("skipping {} (already processed)", path.display());
                return ContainerResult::SkippedProcessed;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("state lookup failed for {}, skipping: {}", path.display(), e);
                return ContainerResult::SkippedUnknown;
            }
        }

        let records = match self.source.open(path) {
            Ok(records) => records,
            Err(e) => {
                warn!("cannot read {}: {}", path.display(), e);
                return ContainerResult::Failed {
                    reason: e.to_string(),
                    tally: ContainerTally::default(),
                };
            }
        };
        info!("processing {}", path.display());

        let mut tally = ContainerTally::default();
        let mut scan_error = None;
        for item in records {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    scan_error = Some(e.to_string());
                    break;
                }
            };
            match self.filter.check(&record) {
                Verdict::Admit => {
                    if let Err(doc) = self.pool.dispatch(SubmissionDocument::from_record(record)) {
                        scan_error = Some(format!("no worker left to submit {}", doc.url));
                        break;
                    }
                    tally.dispatched += 1;
                }
                verdict => {
                    debug!(
                        "filtered {} ({}, status {}): {:?}",
                        record.url, record.mime_type, record.status, verdict
                    );
                    tally.filtered += 1;
                }
            }
        }

        // Barrier: nothing below may run while a record of this container is in flight.
        self.pool.wait_idle();

        if let Some(reason) = scan_error {
            tally.flushed = self.ctx.flush_indexed();
            warn!(
                "{} left unprocessed after {} records: {}",
                path.display(),
                tally.dispatched + tally.filtered,
                reason
            );
            return ContainerResult::Failed { reason, tally };
        }

        if let Err(e) = self.ctx.store.mark_processed(path) {
            warn!("could not mark {} processed: {}", path.display(), e);
        }
        if let Err(e) = self.ctx.client.commit() {
            warn!("commit after {} failed: {}", path.display(), e);
        }
        tally.flushed = self.ctx.flush_indexed();
        debug!(
            "{}: {} dispatched, {} filtered, {} indexed",
            path.display(),
            tally.dispatched,
            tally.filtered,
            tally.flushed
        );
        ContainerResult::Processed(tally)
    }
}

fn add_tally(report: &mut CycleReport, tally: ContainerTally) {
    report.records_dispatched += tally.dispatched;
    report.records_filtered += tally.filtered;
    report.submitted += tally.flushed;
}
