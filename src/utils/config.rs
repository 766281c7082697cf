//! Application configuration: tuning constants and the submitter config file.
//! Constants in one place; the TOML file supplies field names, MIME allow-set and persistence.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::state::StoreBackend;
use crate::types::FieldMapping;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    db_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: "submitter.toml".to_string(),
                db_filename: format!("{pkg}.db"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Default SQLite file when `[database] connection` is empty.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }
}

// ---- Scheduling ----

/// Default seconds between cycles when the CLI omits DELAY_SECS.
pub const DEFAULT_CYCLE_DELAY_SECS: u64 = 600;

/// Wait queue capacity per worker when `[scan] queue_capacity` is 0.
pub const QUEUE_SLOTS_PER_WORKER: usize = 4;

/// How long pool shutdown waits for workers before assuming they are done.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 60 * 60;

/// Rows per transaction when flushing buffered successes.
pub const DB_INSERT_BATCH_SIZE: usize = 1000;

/// Suffix the crawler puts on containers it is still writing.
pub const DEFAULT_IN_PROGRESS_SUFFIX: &str = ".open";

// ---- Config file ----

/// `[fields]`: destination index field per semantic role.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FieldsSection {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "type")]
    pub mime_type: String,
    #[serde(default)]
    pub cache: String,
    #[serde(default)]
    pub offset: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MimeSection {
    #[serde(default)]
    pub allow: Vec<String>,
}

/// `[database]`: persistence backend and its connection descriptor.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub connection: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            provider: default_provider(),
            connection: String::new(),
        }
    }
}

fn default_provider() -> String {
    "sqlite".to_string()
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ScanSection {
    pub in_progress_suffix: Option<String>,
    pub follow_links: Option<bool>,
    pub queue_capacity: Option<usize>,
    pub shutdown_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct IndexSection {
    /// Per-request timeout. Absent means requests never time out.
    pub timeout_secs: Option<u64>,
}

/// Parsed `submitter.toml`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SubmitterConfig {
    #[serde(default)]
    pub fields: FieldsSection,
    #[serde(default)]
    pub mime: MimeSection,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub index: IndexSection,
}

impl SubmitterConfig {
    /// Read and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let cfg = Self::parse(&s).with_context(|| format!("config file {}", path.display()))?;
        Ok(cfg)
    }

    /// Parse and validate config text.
    pub fn parse(s: &str) -> Result<Self> {
        let mut cfg: SubmitterConfig = toml::from_str(s).context("parse TOML")?;
        let embedded = matches!(
            cfg.database.provider.trim().to_ascii_lowercase().as_str(),
            "sqlite" | "sqlite3"
        );
        if embedded && cfg.database.connection.trim().is_empty() {
            cfg.database.connection = PackagePaths::get().db_filename().to_string();
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// url, text, type and cache field names are required, and at least one MIME type.
    pub fn validate(&self) -> Result<()> {
        let f = &self.fields;
        let missing: Vec<&str> = [
            ("url", &f.url),
            ("text", &f.text),
            ("type", &f.mime_type),
            ("cache", &f.cache),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect();
        if !missing.is_empty() {
            bail!("[fields] missing required names: {}", missing.join(", "));
        }
        if self.allowed_mime_types().is_empty() {
            bail!("[mime] allow must list at least one MIME type");
        }
        StoreBackend::from_config(&self.database).context("[database] provider")?;
        Ok(())
    }

    pub fn field_mapping(&self) -> FieldMapping {
        let f = &self.fields;
        FieldMapping {
            url: f.url.trim().to_string(),
            title: f.title.trim().to_string(),
            text: f.text.trim().to_string(),
            mime_type: f.mime_type.trim().to_string(),
            cache: f.cache.trim().to_string(),
            offset: f.offset.trim().to_string(),
        }
    }

    pub fn allowed_mime_types(&self) -> HashSet<String> {
        self.mime
            .allow
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect()
    }

    pub fn in_progress_suffix(&self) -> String {
        self.scan
            .in_progress_suffix
            .clone()
            .unwrap_or_else(|| DEFAULT_IN_PROGRESS_SUFFIX.to_string())
    }

    pub fn follow_links(&self) -> bool {
        self.scan.follow_links.unwrap_or(false)
    }

    /// Wait queue capacity: configured value, or [`QUEUE_SLOTS_PER_WORKER`] per worker.
    pub fn queue_capacity(&self, workers: usize) -> usize {
        match self.scan.queue_capacity {
            Some(n) if n > 0 => n,
            _ => workers.max(1) * QUEUE_SLOTS_PER_WORKER,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(
            self.scan
                .shutdown_timeout_secs
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.index.timeout_secs.map(Duration::from_secs)
    }
}
