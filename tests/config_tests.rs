//! Config file, command line and path helper tests.

use arcsubmit::engine::Cli;
use arcsubmit::engine::tools::{cache_path, is_in_progress, is_state_file, path_to_db_string};
use arcsubmit::utils::config::{
    DEFAULT_CYCLE_DELAY_SECS, PackagePaths, QUEUE_SLOTS_PER_WORKER, SubmitterConfig,
};
use clap::Parser;
use std::path::{Path, PathBuf};

const FULL: &str = r#"
[fields]
url = "url"
title = "title"
text = "content"
type = "filetype"
cache = "cache"
offset = "offset"

[mime]
allow = ["text/html", "application/pdf"]

[database]
provider = "sqlite"
connection = "state.db"

[scan]
queue_capacity = 16
"#;

fn parse_cli(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("arcsubmit").chain(args.iter().copied()))
}

#[test]
fn test_parses_full_config() {
    let cfg = SubmitterConfig::parse(FULL).unwrap();
    let m = cfg.field_mapping();
    assert_eq!(m.mime_type, "filetype");
    assert_eq!(m.text, "content");
    assert_eq!(cfg.allowed_mime_types().len(), 2);
    assert_eq!(cfg.queue_capacity(3), 16);
    assert_eq!(cfg.in_progress_suffix(), ".open");
    assert_eq!(cfg.request_timeout(), None);
}

#[test]
fn test_missing_required_field_names_fail() {
    let s = FULL.replace("cache = \"cache\"", "cache = \"\"");
    let err = SubmitterConfig::parse(&s).unwrap_err();
    assert!(format!("{err:#}").contains("cache"));
}

#[test]
fn test_title_and_offset_are_optional() {
    let s = FULL
        .replace("title = \"title\"", "")
        .replace("offset = \"offset\"", "");
    let cfg = SubmitterConfig::parse(&s).unwrap();
    assert!(cfg.field_mapping().title.is_empty());
}

#[test]
fn test_empty_allow_set_fails() {
    let s = FULL.replace(r#"allow = ["text/html", "application/pdf"]"#, "allow = []");
    assert!(SubmitterConfig::parse(&s).is_err());
}

#[test]
fn test_unsupported_provider_fails() {
    let s = FULL.replace("provider = \"sqlite\"", "provider = \"oracle\"");
    let err = SubmitterConfig::parse(&s).unwrap_err();
    assert!(format!("{err:#}").contains("oracle"));
}

#[test]
fn test_postgres_provider_needs_a_connection_url() {
    let url = "postgres://arcsubmit@db.internal/arcsubmit";
    let with_url = FULL
        .replace("provider = \"sqlite\"", "provider = \"postgresql\"")
        .replace("connection = \"state.db\"", &format!("connection = \"{url}\""));
    let cfg = SubmitterConfig::parse(&with_url).unwrap();
    assert_eq!(cfg.database.connection, url);

    // No package-file default for a server database.
    let without = FULL
        .replace("provider = \"sqlite\"", "provider = \"postgres\"")
        .replace("connection = \"state.db\"", "");
    let err = SubmitterConfig::parse(&without).unwrap_err();
    assert!(format!("{err:#}").contains("postgres"));
}

#[test]
fn test_default_queue_capacity_scales_with_workers() {
    let s = FULL.replace("queue_capacity = 16", "");
    let cfg = SubmitterConfig::parse(&s).unwrap();
    assert_eq!(cfg.queue_capacity(3), 3 * QUEUE_SLOTS_PER_WORKER);
}

#[test]
fn test_empty_connection_defaults_to_package_db() {
    let s = FULL.replace("connection = \"state.db\"", "");
    let cfg = SubmitterConfig::parse(&s).unwrap();
    assert_eq!(cfg.database.connection, PackagePaths::get().db_filename());
}

#[test]
fn test_cli_positional_arguments_with_default_delay() {
    let cli = parse_cli(&["http://localhost:8983/solr/update", "/arcs", "/cache", "4"]).unwrap();
    assert_eq!(cli.workers, 4);
    assert_eq!(cli.delay_secs, DEFAULT_CYCLE_DELAY_SECS);
    assert_eq!(cli.config_path(), PathBuf::from("submitter.toml"));
}

#[test]
fn test_cli_zero_delay_and_config_flag() {
    let cli = parse_cli(&["http://h/u", "/arcs", "c", "1", "0", "-c", "x.toml", "-v"]).unwrap();
    assert_eq!(cli.delay_secs, 0);
    assert_eq!(cli.config_path(), PathBuf::from("x.toml"));
    assert!(cli.verbose);
}

#[test]
fn test_cli_rejects_bad_arguments() {
    assert!(parse_cli(&["http://h/u", "/arcs"]).is_err());
    assert!(parse_cli(&["http://h/u", "/arcs", "c", "0"]).is_err());
    assert!(parse_cli(&["not a url", "/arcs", "c", "2"]).is_err());
    assert!(parse_cli(&["ftp://h/u", "/arcs", "c", "2"]).is_err());
}

#[test]
fn test_cache_path_rewrites_root_prefix() {
    assert_eq!(
        cache_path("/data/arcs/2009/a.arc.gz", "/data/arcs", "/cache"),
        "/cache/2009/a.arc.gz"
    );
    assert_eq!(cache_path("/data/arcs/y", "/data/arcs", "cache"), "cache/y");
    assert_eq!(cache_path("/elsewhere/y", "/data/arcs", "cache"), "/elsewhere/y");
    assert_eq!(cache_path("/data/y", "", "cache"), "/data/y");
}

#[test]
fn test_in_progress_suffix_matches_file_name() {
    assert!(is_in_progress(Path::new("/a/b/crawl-1.arc.gz.open"), ".open"));
    assert!(!is_in_progress(Path::new("/a/b/crawl-1.arc.gz"), ".open"));
    assert!(!is_in_progress(Path::new("/a/b/crawl-1.arc.gz"), ""));
}

#[test]
fn test_state_db_and_wal_files_are_recognised() {
    let db = Path::new("/arcs/arcsubmit.db");
    assert!(is_state_file(Path::new("/arcs/arcsubmit.db"), db));
    assert!(is_state_file(Path::new("/arcs/arcsubmit.db-wal"), db));
    assert!(is_state_file(Path::new("/arcs/arcsubmit.db-shm"), db));
    assert!(!is_state_file(Path::new("/arcs/arcsubmit.db.arc"), db));
    assert!(!is_state_file(Path::new("/arcs/a.arc"), db));
    assert_eq!(path_to_db_string(Path::new("a\\b\\c.arc")), "a/b/c.arc");
}
