//! JSON collection: each file holds JSON objects (one per line, concatenated, or in arrays)
//! with an `id` and a `contents` field.

use anyhow::{Context, Result};
use serde_json::{Deserializer, Value};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::{DocumentCollection, Segment, SegmentDescriptor, extension_of};
use crate::SourceDocument;

pub struct JsonCollection;

impl DocumentCollection for JsonCollection {
    fn name(&self) -> &'static str {
        "JsonCollection"
    }

    fn accepts(&self, path: &Path) -> bool {
        matches!(extension_of(path).as_deref(), Some("json" | "jsonl"))
    }

    fn open_segment(&self, segment: &SegmentDescriptor) -> Result<Box<dyn Segment>> {
        let file = File::open(&segment.path)
            .with_context(|| format!("open segment {}", segment.path.display()))?;
        Ok(Box::new(JsonSegment::new(BufReader::new(file))))
    }
}

type ValueStream<R> = serde_json::StreamDeserializer<'static, serde_json::de::IoRead<R>, Value>;

pub struct JsonSegment<R: Read> {
    stream: ValueStream<R>,
    /// Documents from an array value still to be yielded.
    pending: VecDeque<Value>,
    error: bool,
}

impl<R: Read> JsonSegment<R> {
    pub fn new(reader: R) -> Self {
        Self {
            stream: Deserializer::from_reader(reader).into_iter::<Value>(),
            pending: VecDeque::new(),
            error: false,
        }
    }

    fn next_value(&mut self) -> Option<Value> {
        loop {
            if let Some(v) = self.pending.pop_front() {
                return Some(v);
            }
            if self.error {
                return None;
            }
            match self.stream.next()? {
                Ok(Value::Array(items)) => self.pending.extend(items),
                Ok(v) => return Some(v),
                Err(e) => {
                    log::debug!("malformed JSON record: {}", e);
                    self.error = true;
                    return None;
                }
            }
        }
    }
}

/// Map one JSON value onto a source document. Non-objects and objects without an id are
/// kept but marked non-indexable.
fn to_source_document(value: Value) -> SourceDocument {
    let raw = value.to_string();
    let Value::Object(map) = value else {
        return SourceDocument {
            raw,
            indexable: false,
            ..SourceDocument::default()
        };
    };
    let mut doc = SourceDocument {
        raw,
        indexable: true,
        ..SourceDocument::default()
    };
    for (key, v) in map {
        match v {
            Value::String(s) if key == "id" => doc.id = s,
            Value::Number(n) if key == "id" => doc.id = n.to_string(),
            Value::String(s) if key == "contents" => doc.contents = s,
            Value::Bool(b) if key == "skip" => doc.skip = b,
            Value::String(s) => {
                doc.fields.insert(key, s);
            }
            _ => {}
        }
    }
    if doc.id.is_empty() {
        doc.indexable = false;
    }
    doc
}

impl<R: Read> Iterator for JsonSegment<R> {
    type Item = SourceDocument;

    fn next(&mut self) -> Option<SourceDocument> {
        self.next_value().map(to_source_document)
    }
}

impl<R: Read + Send> Segment for JsonSegment<R> {
    fn error_status(&self) -> bool {
        self.error
    }
}
