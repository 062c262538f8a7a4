//! Engine module: CLI, counters, index sink, progress, and path tools

pub mod arg_parser;
pub mod cli;
pub mod counters;
pub mod db_ops;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{build_config, handle_run};
pub use counters::CounterAggregate;
pub use db_ops::{IndexSink, SinkConfig, SinkStats, SqliteSink, load_documents, open_db};
pub use tools::path_relative_to;
