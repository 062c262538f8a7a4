//! Plain-text collection: every file is one document, keyed by its path without extension.

use anyhow::{Context, Result};
use std::path::Path;

use super::{DocumentCollection, Segment, SegmentDescriptor};
use crate::SourceDocument;

pub struct TextCollection;

impl DocumentCollection for TextCollection {
    fn name(&self) -> &'static str {
        "TextCollection"
    }

    fn open_segment(&self, segment: &SegmentDescriptor) -> Result<Box<dyn Segment>> {
        let bytes = std::fs::read(&segment.path)
            .with_context(|| format!("read segment {}", segment.path.display()))?;
        let id = doc_id_for(&segment.rel);
        Ok(Box::new(match String::from_utf8(bytes) {
            Ok(text) => TextSegment {
                doc: Some(SourceDocument::new(id, text)),
                error: false,
            },
            Err(_) => TextSegment {
                doc: None,
                error: true,
            },
        }))
    }
}

/// Relative path with its final extension removed.
fn doc_id_for(rel: &str) -> String {
    let path = Path::new(rel);
    match (path.parent(), path.file_stem()) {
        (Some(parent), Some(stem)) if !parent.as_os_str().is_empty() => {
            format!("{}/{}", parent.to_string_lossy(), stem.to_string_lossy())
        }
        (_, Some(stem)) => stem.to_string_lossy().into_owned(),
        _ => rel.to_string(),
    }
}

pub struct TextSegment {
    doc: Option<SourceDocument>,
    /// Set when the file is not valid UTF-8.
    error: bool,
}

impl Iterator for TextSegment {
    type Item = SourceDocument;

    fn next(&mut self) -> Option<SourceDocument> {
        self.doc.take()
    }
}

impl Segment for TextSegment {
    fn error_status(&self) -> bool {
        self.error
    }
}
