//! Segment worker: stream one segment through the generator and filters into the sink.

use anyhow::Result;
use log::{debug, error, warn};

use crate::Generated;
use crate::collection::{Segment, SegmentDescriptor};
use crate::engine::counters::CounterAggregate;
use crate::generator::DocumentGenerator;
use crate::utils::config::ProgressConsts;

use super::context::WorkerContext;
use super::pool::TaskOutcome;

/// What a finished segment reports back to its task wrapper.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SegmentReport {
    /// Documents written to the sink from this segment.
    pub added: u64,
    /// Stopped early on a cancellation request.
    pub cancelled: bool,
}

/// Task body for one segment. Never fails past this point: errors are logged against the
/// segment and the task still counts as completed.
pub fn run_segment_task(ctx: &WorkerContext, segment: &SegmentDescriptor) -> TaskOutcome {
    match index_segment(ctx, segment) {
        Ok(report) if report.cancelled => TaskOutcome::Cancelled,
        Ok(_) => TaskOutcome::Completed,
        Err(e) => {
            error!("{}: Unexpected error: {:#}", segment, e);
            TaskOutcome::Completed
        }
    }
}

/// Index every document of `segment`. The segment handle is dropped on every exit path.
pub fn index_segment(ctx: &WorkerContext, segment: &SegmentDescriptor) -> Result<SegmentReport> {
    let mut generator = ctx.new_generator();
    let mut docs = ctx.collection.open_segment(segment)?;

    let mut report = SegmentReport::default();
    {
        let mut batch = IndexedBatch::new(&ctx.counters);
        write_documents(ctx, &mut *generator, &mut *docs, &mut report, &mut batch)?;
    }

    if report.cancelled {
        debug!("{}: cancelled after {} docs", segment, report.added);
        return Ok(report);
    }

    let skipped = docs.skipped_count();
    if skipped > 0 {
        // Expected for some collections (e.g. control records).
        ctx.counters.add_skipped(skipped);
        warn!("{}: {} docs skipped.", segment, skipped);
    }
    if docs.error_status() {
        ctx.counters.incr_errors();
        warn!("{}: error iterating through segment.", segment);
    }

    if ctx.verbose {
        debug!("{}: {} docs added.", segment, report.added);
    }
    Ok(report)
}

/// Documents written to the sink but not yet folded into the shared `indexed` counter.
/// Whatever is pending is flushed on drop, so an error or a panic part way through a
/// segment still leaves `indexed` matching what the sink holds.
struct IndexedBatch<'a> {
    counters: &'a CounterAggregate,
    pending: u64,
}

impl<'a> IndexedBatch<'a> {
    fn new(counters: &'a CounterAggregate) -> Self {
        Self {
            counters,
            pending: 0,
        }
    }

    fn push(&mut self) {
        self.pending += 1;
        if self.pending >= ProgressConsts::INDEXED_FLUSH_BATCH {
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.counters.add_indexed(self.pending);
        self.pending = 0;
    }
}

impl Drop for IndexedBatch<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Per-document loop.
fn write_documents(
    ctx: &WorkerContext,
    generator: &mut dyn DocumentGenerator,
    docs: &mut dyn Segment,
    report: &mut SegmentReport,
    batch: &mut IndexedBatch<'_>,
) -> Result<()> {
    for source in docs {
        if ctx.cancel_requested() {
            report.cancelled = true;
            break;
        }
        if !source.indexable() {
            ctx.counters.incr_unindexable();
            continue;
        }

        let doc = match generator.generate(&source) {
            Generated::Ok(doc) => doc,
            Generated::Empty => {
                ctx.counters.incr_empty();
                continue;
            }
            Generated::Skipped => {
                ctx.counters.add_skipped(1);
                continue;
            }
            Generated::Invalid(reason) => {
                ctx.counters.incr_errors();
                if ctx.verbose {
                    debug!("invalid document '{}': {}", source.id, reason);
                }
                continue;
            }
        };

        if !ctx.allowed(&source.id) {
            ctx.counters.add_skipped(1);
            continue;
        }

        if ctx.unique_docid {
            ctx.sink.update_document(&doc.id, &doc)?;
        } else {
            ctx.sink.add_document(&doc)?;
        }
        report.added += 1;
        batch.push();
    }
    Ok(())
}
