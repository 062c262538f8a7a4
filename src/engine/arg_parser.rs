use clap::Parser;
use std::path::PathBuf;

use crate::Similarity;

/// Parallel document-collection indexer.
#[derive(Clone, Debug, Parser)]
#[command(name = "collexer")]
#[command(about = "Index a document collection, one worker per segment file.")]
pub struct Cli {
    /// Location of the input collection.
    #[arg(long, short, value_name = "PATH")]
    pub input: PathBuf,

    /// Collection name (JsonCollection, TrecCollection, TextCollection).
    #[arg(long, short, value_name = "NAME")]
    pub collection: Option<String>,

    /// Index directory.
    #[arg(long, value_name = "PATH")]
    pub index: Option<PathBuf>,

    /// Document generator name. Default: DefaultDocumentGenerator.
    #[arg(long, short, value_name = "NAME")]
    pub generator: Option<String>,

    /// Number of indexing threads. Default: 8.
    #[arg(long, short = 't', value_name = "NUM", value_parser = clap::value_parser!(u32).range(1..))]
    pub threads: Option<u32>,

    /// Replace documents sharing an id instead of adding duplicates (slower).
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub unique_docid: Option<bool>,

    /// File with one document id per line; only these ids are indexed.
    #[arg(long, short, value_name = "FILE")]
    pub whitelist: Option<PathBuf>,

    /// Memory buffer size (in MB). Default: 2048.
    #[arg(long, value_name = "MB")]
    pub memory_buffer: Option<usize>,

    /// Merge the index into a single segment after indexing; costly for large collections.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub optimize: Option<bool>,

    /// Number of shards to partition the collection into.
    #[arg(long, value_name = "N", requires = "shard_current")]
    pub shard_count: Option<usize>,

    /// Shard to index in this run (from 0).
    #[arg(long, value_name = "N", requires = "shard_count")]
    pub shard_current: Option<usize>,

    /// Ranking mode recorded in the index.
    #[arg(long, value_enum)]
    pub similarity: Option<Similarity>,

    /// Extra fields to index besides contents. Can specify multiple: --fields title author
    #[arg(long, num_args = 1..)]
    pub fields: Vec<String>,

    /// Store full document contents.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub store_contents: Option<bool>,

    /// Store raw source documents.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub store_raw: Option<bool>,

    /// Per-segment debug logging; noisy for collections with many small files.
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only warnings and errors.
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Show a progress bar over segments.
    #[arg(long)]
    pub progress: bool,
}

