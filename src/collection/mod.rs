//! Document collections: how a root directory splits into segments and how each segment
//! yields [`SourceDocument`]s.
//!
//! Collections are resolved by name from a static [`registry`]; each entry is a plain
//! factory function.

mod json;
mod shard;
mod text;
mod trec;

pub use json::JsonCollection;
pub use shard::{shard_of, shard_segments};
pub use text::TextCollection;
pub use trec::TrecCollection;

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::tools::{is_os_hidden_file, path_relative_to, path_to_key_string};
use crate::utils::config::PackagePaths;
use crate::{ShardSpec, SourceDocument};

/// One independently processable unit of the collection (a file).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SegmentDescriptor {
    /// Path relative to the collection root, `/`-separated. Sort key and shard key.
    pub rel: String,
    pub path: PathBuf,
}

impl fmt::Display for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rel)
    }
}

/// An open segment. Dropping it releases the underlying file handle.
pub trait Segment: Iterator<Item = SourceDocument> + Send {
    /// Records the segment passed over on its own (control records, blocks without ids).
    fn skipped_count(&self) -> u64 {
        0
    }

    /// True when iteration stopped early on a malformed stream.
    fn error_status(&self) -> bool {
        false
    }
}

pub trait DocumentCollection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether a file under the root belongs to this collection.
    fn accepts(&self, _path: &Path) -> bool {
        true
    }

    fn open_segment(&self, segment: &SegmentDescriptor) -> Result<Box<dyn Segment>>;

    /// Every segment under `root`, sorted by relative path.
    fn segment_paths(&self, root: &Path) -> Result<Vec<SegmentDescriptor>> {
        list_segment_files(root, |p| self.accepts(p))
    }

    /// The deterministic subset of [`Self::segment_paths`] owned by `shard`.
    fn segment_paths_sharded(
        &self,
        root: &Path,
        shard: ShardSpec,
    ) -> Result<Vec<SegmentDescriptor>> {
        Ok(shard_segments(self.segment_paths(root)?, shard))
    }
}

/// Builds a collection instance.
pub type CollectionFactory = fn() -> Box<dyn DocumentCollection>;

fn json_collection() -> Box<dyn DocumentCollection> {
    Box::new(JsonCollection)
}

fn trec_collection() -> Box<dyn DocumentCollection> {
    Box::new(TrecCollection)
}

fn text_collection() -> Box<dyn DocumentCollection> {
    Box::new(TextCollection)
}

static REGISTRY: &[(&str, CollectionFactory)] = &[
    ("JsonCollection", json_collection),
    ("TrecCollection", trec_collection),
    ("TextCollection", text_collection),
];

/// Registered collection names and factories.
pub fn registry() -> &'static [(&'static str, CollectionFactory)] {
    REGISTRY
}

/// Look up a collection by its registered name.
pub fn resolve_collection(name: &str) -> Result<Box<dyn DocumentCollection>> {
    registry()
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, factory)| factory())
        .ok_or_else(|| {
            let known: Vec<&str> = registry().iter().map(|(n, _)| *n).collect();
            anyhow::anyhow!(
                "unknown collection '{}' (known: {})",
                name,
                known.join(", ")
            )
        })
}

/// Walk `root` for regular files accepted by `accept`; hidden OS files and the settings
/// file are left out. Sorted by relative path so listings are reproducible.
pub fn list_segment_files<F>(root: &Path, accept: F) -> Result<Vec<SegmentDescriptor>>
where
    F: Fn(&Path) -> bool,
{
    let settings = PackagePaths::get().settings_filename();
    let mut segments = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if is_os_hidden_file(&path) || path.file_name().is_some_and(|n| n == settings) {
            continue;
        }
        if !accept(&path) {
            continue;
        }
        let rel = path_relative_to(&path, root).unwrap_or_else(|| path.clone());
        segments.push(SegmentDescriptor {
            rel: path_to_key_string(&rel),
            path,
        });
    }
    segments.sort();
    Ok(segments)
}

/// Lower-cased extension of `path`, if any.
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
