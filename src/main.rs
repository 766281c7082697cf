//! arcsubmit CLI: submit web-archive containers to a search index, cycle after cycle.

use anyhow::Result;
use arcsubmit::engine::arg_parser::Cli;
use arcsubmit::engine::handle_run;
use clap::Parser;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
