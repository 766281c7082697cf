//! Cycle controller: one walk of the scan root per cycle, each with a fresh worker pool,
//! then sleep and repeat (or stop after one cycle in batch mode).

use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::context::SubmitContext;
use super::pool::WorkerPool;
use super::walk::DirectoryWalker;
use crate::engine::tools::path_to_db_string;
use crate::extract::{ContentExtractor, RecordFilter};
use crate::index_client::IndexClient;
use crate::payload::{CustomFields, DocumentBuilder};
use crate::source::RecordSource;
use crate::state::StateStore;
use crate::types::{CycleReport, SubmissionDocument};

/// Scheduling and walk settings for every cycle.
#[derive(Clone, Debug)]
pub struct CycleSettings {
    /// Canonical scan root.
    pub root: PathBuf,
    pub workers: usize,
    pub queue_capacity: usize,
    pub shutdown_timeout: Duration,
    pub in_progress_suffix: String,
    pub follow_links: bool,
    /// Paths under the root never treated as containers.
    pub exclude: Vec<PathBuf>,
    /// Pause between cycles; zero runs a single cycle.
    pub delay: Duration,
}

/// Collaborators shared by all cycles.
#[derive(Clone)]
pub struct Components {
    pub source: Arc<dyn RecordSource>,
    pub store: Arc<dyn StateStore>,
    pub client: Arc<dyn IndexClient>,
    pub extractor: Arc<ContentExtractor>,
    pub builder: Arc<DocumentBuilder>,
    pub custom: Arc<dyn CustomFields>,
    pub filter: RecordFilter,
}

pub struct CycleController {
    settings: CycleSettings,
    components: Components,
    submitted: u64,
    cycles: u64,
}

impl CycleController {
    pub fn new(settings: CycleSettings, components: Components) -> Self {
        CycleController {
            settings,
            components,
            submitted: 0,
            cycles: 0,
        }
    }

    /// Documents submitted in the most recent cycle.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// One full pass over the scan root.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.submitted = 0;
        self.cycles += 1;
        let started = Instant::now();
        let c = &self.components;
        let s = &self.settings;
        info!("cycle {} starting on {}", self.cycles, path_to_db_string(&s.root));

        let ctx = Arc::new(SubmitContext::new(
            Arc::clone(&c.extractor),
            Arc::clone(&c.builder),
            Arc::clone(&c.custom),
            Arc::clone(&c.client),
            Arc::clone(&c.store),
        ));
        let worker_ctx = Arc::clone(&ctx);
        let pool = WorkerPool::new(s.workers, s.queue_capacity, move |doc: SubmissionDocument| {
            worker_ctx.process(doc);
        });

        let mut report = CycleReport::default();
        DirectoryWalker {
            root: &s.root,
            in_progress_suffix: &s.in_progress_suffix,
            follow_links: s.follow_links,
            exclude: &s.exclude,
            filter: &c.filter,
            source: c.source.as_ref(),
            pool: &pool,
            ctx: &ctx,
        }
        .walk(&mut report);

        pool.wait_idle();
        if !pool.shutdown(s.shutdown_timeout) {
            warn!("worker pool did not stop within {:?}", s.shutdown_timeout);
        }
        if let Err(e) = c.client.commit() {
            warn!("final commit failed: {}", e);
        }
        report.submitted += ctx.flush_indexed();
        report.failed = ctx.failed();
        self.submitted = report.submitted;

        info!(
            "cycle {} done in {:.1?}: submitted {} documents ({} failed, {} filtered); \
             containers: {} processed, {} skipped, {} failed",
            self.cycles,
            started.elapsed(),
            report.submitted,
            report.failed,
            report.records_filtered,
            report.containers_processed,
            report.containers_skipped,
            report.containers_failed
        );
        report
    }

    /// Run cycles forever, sleeping `delay` between them. With a zero delay, runs once and returns
    /// that cycle's report.
    pub fn run(&mut self) -> CycleReport {
        loop {
            let report = self.run_cycle();
            if self.settings.delay.is_zero() {
                return report;
            }
            info!("next cycle in {}s", self.settings.delay.as_secs());
            thread::sleep(self.settings.delay);
        }
    }
}
