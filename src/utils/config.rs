//! Application configuration constants.
//! Tuning and defaults in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    db_filename: String,
    settings_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                db_filename: format!("{pkg}.db"),
                settings_filename: format!("{pkg}.toml"),
            }
        })
    }

    /// Database file created inside the index directory.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    /// Optional settings file looked up in the input directory.
    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }
}

// ---- Run defaults ----

pub const DEFAULT_THREADS: usize = 8;
/// Sink memory buffer (MB).
pub const DEFAULT_MEMORY_BUFFER_MB: usize = 2048;
pub const DEFAULT_GENERATOR: &str = "DefaultDocumentGenerator";

/// Documentation examples use `/path/to/...`; rewritten to this prefix.
pub const DOC_PATH_PREFIX: &str = "/path/to";
pub const DOC_PATH_REPLACEMENT: &str = "collections";

// ---- Progress / batching ----

pub struct ProgressConsts;

impl ProgressConsts {
    /// Worker flushes its local count into the shared `indexed` counter this often.
    pub const INDEXED_FLUSH_BATCH: u64 = 10_000;
    /// How often the coordinator logs progress while waiting.
    pub const REPORT_INTERVAL: Duration = Duration::from_secs(60);
}

// ---- Database ----

pub struct SinkConsts;

impl SinkConsts {
    /// Pages between automatic WAL checkpoints (background merge cadence).
    pub const WAL_AUTOCHECKPOINT: u32 = 10_000;
    /// Upper bound on the SQLite page cache, in KiB.
    pub const MAX_CACHE_KIB: usize = 4 * 1024 * 1024;
}
