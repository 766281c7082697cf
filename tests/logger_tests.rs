//! Logger setup. Own test binary: the global logger can only be installed once per process.

use arcsubmit::utils::setup_logging;
use log::{Level, LevelFilter};

#[test]
fn test_rust_log_overrides_crate_level() {
    // SAFETY: only test in this binary; set before any thread reads the environment.
    unsafe { std::env::set_var("RUST_LOG", "arcsubmit=error") };
    setup_logging(true);
    assert!(!log::log_enabled!(target: "arcsubmit::pipeline", Level::Info));
    assert!(log::log_enabled!(target: "arcsubmit::pipeline", Level::Error));
    assert_eq!(log::max_level(), LevelFilter::Warn);
}
