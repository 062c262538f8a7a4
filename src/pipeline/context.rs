//! Shared, read-only state handed to every segment worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::collection::DocumentCollection;
use crate::engine::counters::CounterAggregate;
use crate::engine::db_ops::IndexSink;
use crate::generator::{DocumentGenerator, GeneratorFactory};
use crate::{GeneratorOptions, Whitelist};

/// Everything a worker needs besides its segment. Tasks share only the sink and counters
/// through this; generator instances and batch counts stay task-local.
pub struct WorkerContext {
    pub collection: Arc<dyn DocumentCollection>,
    pub generator: GeneratorFactory,
    pub generator_opts: GeneratorOptions,
    pub sink: Arc<dyn IndexSink>,
    pub counters: Arc<CounterAggregate>,
    pub whitelist: Option<Arc<Whitelist>>,
    /// Upsert by id instead of appending.
    pub unique_docid: bool,
    /// Per-segment debug lines.
    pub verbose: bool,
    pub cancel: Arc<AtomicBool>,
}

impl WorkerContext {
    /// Fresh generator for one worker invocation.
    pub fn new_generator(&self) -> Box<dyn DocumentGenerator> {
        (self.generator)(&self.generator_opts)
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// False when a whitelist is configured and `id` is not on it.
    pub fn allowed(&self, id: &str) -> bool {
        self.whitelist.as_ref().is_none_or(|w| w.contains(id))
    }
}
