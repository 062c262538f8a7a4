//! Collexer CLI: index a document collection into a SQLite-backed index.

use anyhow::Result;
use clap::Parser;
use collexer::engine::arg_parser::Cli;
use collexer::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
