//! arcsubmit: continuous web-archive submitter.
//!
//! Walks a tree of ARC containers, filters and extracts every captured document, posts it to a
//! search index and keeps crash-consistent dedup state, one container at a time.

pub mod engine;
pub mod error;
pub mod extract;
pub mod index_client;
pub mod payload;
pub mod pipeline;
pub mod source;
pub mod state;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::tools::{check_root_and_canonicalize, path_to_db_string};
use crate::extract::{ContentExtractor, RecordFilter};
use crate::index_client::IndexClient;
use crate::payload::{CustomFields, DocumentBuilder};
use crate::pipeline::{Components, CycleController, CycleSettings};
use crate::source::RecordSource;
use crate::state::{StateStore, StoreBackend};
use crate::utils::config::SubmitterConfig;

/// Result alias used by public arcsubmit API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Run options from the command line.
#[derive(Clone, Debug)]
pub struct RunOpts {
    pub root: PathBuf,
    pub cache_prefix: String,
    pub workers: usize,
    /// Zero runs a single cycle.
    pub delay: Duration,
}

/// Pluggable collaborators: container reader, state, index and the custom-field hook.
pub struct Backends {
    pub source: Arc<dyn RecordSource>,
    pub store: Arc<dyn StateStore>,
    pub client: Arc<dyn IndexClient>,
    pub custom: Arc<dyn CustomFields>,
}

/// Wire a [`CycleController`] from options, a validated config and the chosen backends.
///
/// The scan root is canonicalized here; both the processed-container keys and the cache path
/// rewrite use the canonical form. A state database inside the root is never treated as a container.
pub fn build_controller(
    opts: &RunOpts,
    config: &SubmitterConfig,
    backends: Backends,
) -> Result<CycleController> {
    let root = check_root_and_canonicalize(&opts.root)?;
    let builder = DocumentBuilder::new(
        config.field_mapping(),
        &path_to_db_string(&root),
        &opts.cache_prefix,
    );

    let exclude = match StoreBackend::from_config(&config.database)? {
        StoreBackend::Sqlite(db) => db.canonicalize().ok().into_iter().collect(),
        StoreBackend::Postgres(_) | StoreBackend::Memory => Vec::new(),
    };

    let settings = CycleSettings {
        root,
        workers: opts.workers.max(1),
        queue_capacity: config.queue_capacity(opts.workers),
        shutdown_timeout: config.shutdown_timeout(),
        in_progress_suffix: config.in_progress_suffix(),
        follow_links: config.follow_links(),
        exclude,
        delay: opts.delay,
    };
    debug!("cycle settings: {:?}", settings);

    let components = Components {
        source: backends.source,
        store: backends.store,
        client: backends.client,
        extractor: Arc::new(ContentExtractor::default()),
        builder: Arc::new(builder),
        custom: backends.custom,
        filter: RecordFilter::new(config.allowed_mime_types()),
    };
    Ok(CycleController::new(settings, components))
}
