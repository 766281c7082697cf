//! CLI command handler: load config, open state, then run cycles until stopped.

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::arg_parser::Cli;
use crate::index_client::HttpIndexClient;
use crate::payload::NoCustomFields;
use crate::source::ArcSource;
use crate::state::open_state_store;
use crate::utils::config::SubmitterConfig;
use crate::utils::setup_logging;
use crate::{Backends, RunOpts, build_controller};

fn setup_opts(cli: &Cli) -> RunOpts {
    setup_logging(cli.verbose);
    RunOpts {
        root: cli.root.clone(),
        cache_prefix: cli.cache_prefix.clone(),
        workers: cli.workers as usize,
        delay: Duration::from_secs(cli.delay_secs),
    }
}

/// Validate everything up front, then hand over to the cycle controller. Returns only in batch mode.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    let config_path = cli.config_path();
    let config = SubmitterConfig::load(&config_path)?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        config
    );

    let store = open_state_store(&config.database)
        .with_context(|| format!("open state store '{}'", config.database.connection))?;
    let counts = store.counts().context("read state store")?;
    info!(
        "state: {} processed containers, {} indexed pages, {} submission errors",
        counts.processed_files, counts.indexed_pages, counts.submission_errors
    );

    let client = HttpIndexClient::new(&cli.index_url, config.request_timeout())
        .context("build index client")?;
    info!(
        "submitting to {} with {} workers",
        client.url(),
        opts.workers
    );

    let backends = Backends {
        source: Arc::new(ArcSource),
        store,
        client: Arc::new(client),
        custom: Arc::new(NoCustomFields),
    };
    let mut controller = build_controller(&opts, &config, backends)?;
    let report = controller.run();
    debug!("last cycle: {:?}", report);
    Ok(())
}
