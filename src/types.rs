//! Public and internal types for the collexer API and pipeline.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::config::{DEFAULT_GENERATOR, DEFAULT_MEMORY_BUFFER_MB, DEFAULT_THREADS};

/// One unit read out of a segment. `id` may be empty when the record carried none.
#[derive(Clone, Debug, Default)]
pub struct SourceDocument {
    pub id: String,
    pub contents: String,
    /// Original record text as it appeared in the segment.
    pub raw: String,
    /// Extra named string fields carried by the record.
    pub fields: BTreeMap<String, String>,
    /// False when the collection knows the record cannot be indexed (e.g. no id).
    pub indexable: bool,
    /// Set by collections that mark records as intentionally skipped.
    pub skip: bool,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, contents: impl Into<String>) -> Self {
        let contents = contents.into();
        Self {
            id: id.into(),
            raw: contents.clone(),
            contents,
            fields: BTreeMap::new(),
            indexable: true,
            skip: false,
        }
    }

    pub fn indexable(&self) -> bool {
        self.indexable
    }
}

/// Document ready for the sink. Built by a generator, never inspected by the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexDocument {
    pub id: String,
    pub contents: Option<String>,
    pub raw: Option<String>,
    pub fields: BTreeMap<String, String>,
}

/// Classification returned by a generator for one source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Generated {
    Ok(IndexDocument),
    Empty,
    Skipped,
    Invalid(String),
}

/// Final counter values, read after every worker has joined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub indexed: u64,
    pub unindexable: u64,
    pub empty: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl Counters {
    pub fn total(&self) -> u64 {
        self.indexed + self.unindexable + self.empty + self.skipped + self.errors
    }
}

/// What [`run`](crate::pipeline::run) hands back once the sink is committed.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub counters: Counters,
    /// Documents held by the sink after commit (may be lower than `indexed` with unique ids).
    pub document_count: u64,
    pub segments: usize,
    pub elapsed: Duration,
}

/// Deterministic subset selection over the segment list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardSpec {
    pub count: usize,
    pub current: usize,
}

impl ShardSpec {
    pub fn new(count: usize, current: usize) -> crate::Result<Self> {
        if count == 0 {
            anyhow::bail!("shard count must be at least 1");
        }
        if current >= count {
            anyhow::bail!("shard current {} is out of range for {} shards", current, count);
        }
        Ok(Self { count, current })
    }

    /// Sharding only takes effect with more than one shard.
    pub fn is_active(&self) -> bool {
        self.count > 1
    }
}

/// Ranking mode the sink is configured with before any writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Similarity {
    #[default]
    Bm25,
    Bm25Accurate,
    Impact,
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Similarity::Bm25 => "bm25",
            Similarity::Bm25Accurate => "bm25-accurate",
            Similarity::Impact => "impact",
        };
        f.write_str(s)
    }
}

/// How chatty the run is. Verbose enables per-segment debug lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Verbosity::Verbose,
            (false, true) => Verbosity::Quiet,
            _ => Verbosity::Normal,
        }
    }

    pub fn is_verbose(&self) -> bool {
        *self == Verbosity::Verbose
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            Verbosity::Quiet => log::LevelFilter::Warn,
            Verbosity::Normal => log::LevelFilter::Info,
            Verbosity::Verbose => log::LevelFilter::Debug,
        }
    }
}

/// Options handed to every generator instance.
#[derive(Clone, Debug, Default)]
pub struct GeneratorOptions {
    /// Extra source fields to carry into the index document.
    pub fields: Vec<String>,
    pub store_contents: bool,
    pub store_raw: bool,
}

/// Immutable snapshot of every run option. Owned by the coordinator, read by workers.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Collection root directory.
    pub input: PathBuf,
    /// Directory holding the index database.
    pub index: PathBuf,
    /// Registered collection name (see [`crate::collection::registry`]).
    pub collection: String,
    /// Registered generator name (see [`crate::generator::registry`]).
    pub generator: String,
    /// Worker pool size.
    pub threads: usize,
    /// Upsert by document id instead of appending.
    pub unique_docid: bool,
    /// File with one allowed document id per line.
    pub whitelist: Option<PathBuf>,
    /// Sink memory buffer in MB.
    pub memory_buffer_mb: usize,
    /// Merge the index down to one segment after commit.
    pub optimize: bool,
    pub shard: Option<ShardSpec>,
    pub similarity: Similarity,
    pub generator_opts: GeneratorOptions,
    pub verbosity: Verbosity,
    /// Show a kdam bar over completed segments.
    pub progress_bar: bool,
}

impl RunConfig {
    pub fn new(
        input: impl Into<PathBuf>,
        index: impl Into<PathBuf>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            index: index.into(),
            collection: collection.into(),
            generator: DEFAULT_GENERATOR.to_string(),
            threads: DEFAULT_THREADS,
            unique_docid: false,
            whitelist: None,
            memory_buffer_mb: DEFAULT_MEMORY_BUFFER_MB,
            optimize: false,
            shard: None,
            similarity: Similarity::default(),
            generator_opts: GeneratorOptions::default(),
            verbosity: Verbosity::default(),
            progress_bar: false,
        }
    }
}

/// Allowed document ids. When configured, nothing else reaches the sink.
pub type Whitelist = HashSet<String>;
