//! Document generators: turn one [`SourceDocument`] into an [`IndexDocument`] or a
//! classification ([`Generated`]).
//!
//! Generators are not shared between workers; each worker builds its own instance from
//! the registered factory.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::{GeneratorOptions, Generated, IndexDocument, SourceDocument};

pub trait DocumentGenerator: Send {
    fn generate(&mut self, doc: &SourceDocument) -> Generated;
}

/// Builds a generator instance for one worker.
pub type GeneratorFactory = fn(&GeneratorOptions) -> Box<dyn DocumentGenerator>;

fn default_generator(opts: &GeneratorOptions) -> Box<dyn DocumentGenerator> {
    Box::new(DefaultDocumentGenerator::new(opts.clone()))
}

fn passthrough_generator(opts: &GeneratorOptions) -> Box<dyn DocumentGenerator> {
    Box::new(PassthroughDocumentGenerator::new(opts.clone()))
}

static REGISTRY: &[(&str, GeneratorFactory)] = &[
    ("DefaultDocumentGenerator", default_generator),
    ("PassthroughDocumentGenerator", passthrough_generator),
];

/// Registered generator names and factories.
pub fn registry() -> &'static [(&'static str, GeneratorFactory)] {
    REGISTRY
}

/// Look up a generator factory by its registered name.
pub fn resolve_generator(name: &str) -> Result<GeneratorFactory> {
    registry()
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, factory)| *factory)
        .ok_or_else(|| {
            let known: Vec<&str> = registry().iter().map(|(n, _)| *n).collect();
            anyhow::anyhow!(
                "unknown generator '{}' (known: {})",
                name,
                known.join(", ")
            )
        })
}

/// Extra fields listed in `wanted`, taken from the source document when present.
fn selected_fields(doc: &SourceDocument, wanted: &[String]) -> BTreeMap<String, String> {
    wanted
        .iter()
        .filter_map(|name| doc.fields.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

/// Standard generator: requires an id, rejects blank contents, keeps listed fields.
pub struct DefaultDocumentGenerator {
    opts: GeneratorOptions,
}

impl DefaultDocumentGenerator {
    pub fn new(opts: GeneratorOptions) -> Self {
        Self { opts }
    }
}

impl DocumentGenerator for DefaultDocumentGenerator {
    fn generate(&mut self, doc: &SourceDocument) -> Generated {
        let id = doc.id.trim();
        if id.is_empty() {
            return Generated::Invalid("document has no id".to_string());
        }
        if doc.skip {
            return Generated::Skipped;
        }
        if doc.contents.trim().is_empty() {
            return Generated::Empty;
        }
        Generated::Ok(IndexDocument {
            id: id.to_string(),
            // Contents are always indexed; `store_contents` only decides whether the
            // stored copy keeps the full text.
            contents: Some(if self.opts.store_contents {
                doc.contents.clone()
            } else {
                doc.contents.trim().to_string()
            }),
            raw: self.opts.store_raw.then(|| doc.raw.clone()),
            fields: selected_fields(doc, &self.opts.fields),
        })
    }
}

/// Generator for pre-tokenized collections: keeps contents and raw verbatim and never
/// reports a document as empty.
pub struct PassthroughDocumentGenerator {
    opts: GeneratorOptions,
}

impl PassthroughDocumentGenerator {
    pub fn new(opts: GeneratorOptions) -> Self {
        Self { opts }
    }
}

impl DocumentGenerator for PassthroughDocumentGenerator {
    fn generate(&mut self, doc: &SourceDocument) -> Generated {
        if doc.id.is_empty() {
            return Generated::Invalid("document has no id".to_string());
        }
        if doc.skip {
            return Generated::Skipped;
        }
        Generated::Ok(IndexDocument {
            id: doc.id.clone(),
            contents: Some(doc.contents.clone()),
            raw: Some(doc.raw.clone()),
            fields: selected_fields(doc, &self.opts.fields),
        })
    }
}
