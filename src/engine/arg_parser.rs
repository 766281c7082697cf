use clap::Parser;
use std::path::PathBuf;

use crate::utils::config::{DEFAULT_CYCLE_DELAY_SECS, PackagePaths};

/// Continuous web-archive submitter.
#[derive(Clone, Debug, Parser)]
#[command(name = "arcsubmit")]
#[command(
    about = "Walk a tree of ARC containers and post every captured document to a search index."
)]
pub struct Cli {
    /// Update endpoint of the search index, e.g. http://localhost:8983/solr/update
    #[arg(value_name = "INDEX_URL", value_parser = parse_index_url)]
    pub index_url: String,

    /// Directory tree holding the containers.
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Replaces ROOT in the cache path sent with each document.
    #[arg(value_name = "CACHE_PREFIX")]
    pub cache_prefix: String,

    /// Concurrent submissions.
    #[arg(value_name = "WORKERS", value_parser = clap::value_parser!(u32).range(1..))]
    pub workers: u32,

    /// Seconds between cycles; 0 runs a single cycle and exits.
    #[arg(value_name = "DELAY_SECS", default_value_t = DEFAULT_CYCLE_DELAY_SECS)]
    pub delay_secs: u64,

    /// Submitter config file (field names, MIME allow-set, database).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Config path, defaulting to the package config file in the working directory.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(PackagePaths::get().config_filename()))
    }
}

fn parse_index_url(s: &str) -> Result<String, String> {
    let url = reqwest::Url::parse(s).map_err(|e| format!("invalid index URL '{s}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(s.to_string()),
        other => Err(format!("unsupported scheme '{other}' (expected http or https)")),
    }
}
