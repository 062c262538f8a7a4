pub mod collexer_toml;
pub mod config;
pub mod logger;

pub use config::*;
pub use logger::setup_logging;
