//! TREC SGML collection: `<DOC> ... </DOC>` blocks keyed by `<DOCNO>`.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use super::{DocumentCollection, Segment, SegmentDescriptor, extension_of};
use crate::SourceDocument;

const DOC_OPEN: &str = "<DOC>";
const DOC_CLOSE: &str = "</DOC>";

pub struct TrecCollection;

impl DocumentCollection for TrecCollection {
    fn name(&self) -> &'static str {
        "TrecCollection"
    }

    fn accepts(&self, path: &Path) -> bool {
        !matches!(
            extension_of(path).as_deref(),
            Some("json" | "jsonl" | "toml" | "db")
        )
    }

    fn open_segment(&self, segment: &SegmentDescriptor) -> Result<Box<dyn Segment>> {
        let bytes = std::fs::read(&segment.path)
            .with_context(|| format!("read segment {}", segment.path.display()))?;
        Ok(Box::new(TrecSegment::new(
            String::from_utf8_lossy(&bytes).into_owned(),
        )))
    }
}

pub struct TrecSegment {
    text: String,
    pos: usize,
    skipped: u64,
    error: bool,
}

impl TrecSegment {
    pub fn new(text: String) -> Self {
        Self {
            text,
            pos: 0,
            skipped: 0,
            error: false,
        }
    }
}

/// Text between `<tag>` and `</tag>` inside `block`, trimmed.
fn tag_body<'a>(block: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = block.find(&open)? + open.len();
    let end = start + block[start..].find(&close)?;
    Some(block[start..end].trim())
}

/// Build a document from one block body, or None when it has no DOCNO.
fn parse_block(block: &str) -> Option<SourceDocument> {
    let id = tag_body(block, "DOCNO")?;
    if id.is_empty() {
        return None;
    }
    let contents = match tag_body(block, "TEXT") {
        Some(t) => t.to_string(),
        None => {
            let after_docno = block.find("</DOCNO>").map(|i| i + "</DOCNO>".len())?;
            block[after_docno..].trim().to_string()
        }
    };
    let mut fields = BTreeMap::new();
    if let Some(title) = tag_body(block, "TITLE").or_else(|| tag_body(block, "HEADLINE")) {
        fields.insert("title".to_string(), title.to_string());
    }
    Some(SourceDocument {
        id: id.to_string(),
        contents,
        raw: block.to_string(),
        fields,
        indexable: true,
        skip: false,
    })
}

impl Iterator for TrecSegment {
    type Item = SourceDocument;

    fn next(&mut self) -> Option<SourceDocument> {
        while !self.error {
            let rest = &self.text[self.pos..];
            let start = rest.find(DOC_OPEN)?;
            let body_start = start + DOC_OPEN.len();
            let Some(len) = rest[body_start..].find(DOC_CLOSE) else {
                // Unterminated block: the stream is truncated.
                self.error = true;
                return None;
            };
            let block = &rest[body_start..body_start + len];
            let parsed = parse_block(block);
            self.pos += body_start + len + DOC_CLOSE.len();
            match parsed {
                Some(doc) => return Some(doc),
                None => self.skipped += 1,
            }
        }
        None
    }
}

impl Segment for TrecSegment {
    fn skipped_count(&self) -> u64 {
        self.skipped
    }

    fn error_status(&self) -> bool {
        self.error
    }
}
