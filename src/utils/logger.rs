//! Log setup for the long-running submitter: one timestamped, coloured line per event.

use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Error => "ERROR".red(),
        Level::Warn => "WARN".yellow(),
        Level::Info => "INFO".green(),
        Level::Debug | Level::Trace => "debug".dimmed(),
    }
}

/// Our crate logs at Info (Debug with `verbose`); dependencies only at Warn.
/// `RUST_LOG` directives are applied last, so they override both defaults.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .parse_default_env()
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME").cyan();
            let ts = buf.timestamp_seconds();
            let tag = level_tag(record.level());
            match record.level() {
                // Problems carry the emitting module so worker and walker messages can be told apart.
                Level::Error | Level::Warn => writeln!(
                    buf,
                    "{} [{} {} {}] {}",
                    ts,
                    name,
                    tag,
                    record.target().white(),
                    record.args()
                ),
                _ => writeln!(buf, "{} [{} {}] {}", ts, name, tag, record.args()),
            }
        })
        .init();
}
