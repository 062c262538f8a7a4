//! Collexer: parallel document-collection indexer, one worker per segment file.

pub mod collection;
pub mod engine;
pub mod generator;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

/// Result alias used by public collexer API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: index the collection described by `config` and return the final counters.
///
/// Logging is left to the caller; the CLI installs its logger before calling in. For the
/// document count, segment count and timing, use [`pipeline::run`] instead.
///
/// ```ignore
/// let mut config = collexer::RunConfig::new("corpus", "index", "JsonCollection");
/// config.threads = 4;
/// let counters = collexer::index_collection(&config)?;
/// println!("{} indexed, {} errors", counters.indexed, counters.errors);
/// ```
pub fn index_collection(config: &RunConfig) -> Result<Counters> {
    pipeline::run(config).map(|summary| summary.counters)
}
