//! Coordinator: resolve the run, fan segments out to the pool, wait, then finalize the sink.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, select, tick};
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::collection::{DocumentCollection, SegmentDescriptor, resolve_collection};
use crate::engine::counters::CounterAggregate;
use crate::engine::db_ops::{IndexSink, SinkConfig, SqliteSink};
use crate::engine::progress::ProgressReporter;
use crate::engine::tools::{
    check_input_root, format_hms, load_whitelist, resolve_input_path, with_commas,
};
use crate::generator::resolve_generator;
use crate::utils::config::{ProgressConsts, SinkConsts};
use crate::{Counters, RunConfig, RunSummary};

use super::context::WorkerContext;
use super::pool::{TaskOutcome, WorkerPool};
use super::worker::run_segment_task;

/// How often the wait loop looks at the cancellation flag.
const CANCEL_POLL: Duration = Duration::from_millis(200);

/// Tally of task reports gathered by the wait loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    pub submitted: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Cancellation was requested while waiting.
    pub interrupted: bool,
}

impl Completion {
    /// The only state in which committing is allowed.
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.completed == self.submitted
    }
}

/// Index the collection described by `config`; see [`run_with_cancel`].
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    run_with_cancel(config, Arc::new(AtomicBool::new(false)))
}

/// Index the collection described by `config`. Setting `cancel` stops queued segments,
/// interrupts running ones between documents, and makes the run fail without committing.
pub fn run_with_cancel(config: &RunConfig, cancel: Arc<AtomicBool>) -> Result<RunSummary> {
    let start = Instant::now();
    log_parameters(config);

    let input = check_input_root(&resolve_input_path(&config.input))?;
    let collection: Arc<dyn DocumentCollection> = Arc::from(resolve_collection(&config.collection)?);
    let generator = resolve_generator(&config.generator)?;
    let whitelist = match &config.whitelist {
        Some(path) => {
            let ids = load_whitelist(path)?;
            info!("Whitelist loaded: {} ids", with_commas(ids.len() as u64));
            Some(Arc::new(ids))
        }
        None => None,
    };

    let sink: Arc<dyn IndexSink> = Arc::new(SqliteSink::open(
        &config.index,
        SinkConfig {
            similarity: config.similarity,
            memory_buffer_mb: config.memory_buffer_mb,
            autocheckpoint_pages: SinkConsts::WAL_AUTOCHECKPOINT,
        },
    )?);
    let counters = Arc::new(CounterAggregate::new());

    let ctx = Arc::new(WorkerContext {
        collection,
        generator,
        generator_opts: config.generator_opts.clone(),
        sink: Arc::clone(&sink),
        counters: Arc::clone(&counters),
        whitelist,
        unique_docid: config.unique_docid,
        verbose: config.verbosity.is_verbose(),
        cancel: Arc::clone(&cancel),
    });

    let indexed = index_and_commit(config, &input, &ctx, cancel);

    // Closed exactly once, whatever happened above. Committed data stands if this fails.
    if let Err(e) = sink.close() {
        error!("closing index: {:#}", e);
    }

    let (segments, document_count) = indexed?;
    let counters = counters.snapshot();
    let elapsed = start.elapsed();
    log_summary(&counters, document_count, elapsed);

    Ok(RunSummary {
        counters,
        document_count,
        segments,
        elapsed,
    })
}

/// List and schedule segments, wait for every task, then commit (and merge). Returns the
/// segment count and the sink's document count after commit.
fn index_and_commit(
    config: &RunConfig,
    input: &Path,
    ctx: &Arc<WorkerContext>,
    cancel: Arc<AtomicBool>,
) -> Result<(usize, u64)> {
    let segments = build_segment_list(ctx.collection.as_ref(), input, config)?;
    let segment_cnt = segments.len();
    info!(
        "{} {} found",
        with_commas(segment_cnt as u64),
        if segment_cnt == 1 { "file" } else { "files" }
    );

    let mut pool = WorkerPool::new(config.threads, Arc::clone(&cancel))?;
    info!("Thread pool with {} threads initialized.", pool.threads());
    info!("Starting to index...");
    for segment in segments {
        let ctx = Arc::clone(ctx);
        pool.submit(segment.rel.clone(), move || run_segment_task(&ctx, &segment));
    }
    let (handle, done_rx) = pool.finish_submissions();

    let reporter = ProgressReporter::new(segment_cnt, Arc::clone(&ctx.counters), config.progress_bar);
    let completion = wait_for_completion(
        handle.submitted,
        &done_rx,
        &cancel,
        &reporter,
        ProgressConsts::REPORT_INTERVAL,
    );
    reporter.finish();
    debug!("{:?}", completion);

    let document_count = commit_if_complete(ctx.sink.as_ref(), &completion, config.optimize)?;
    Ok((segment_cnt, document_count))
}

/// Commit (and merge when `optimize`) only if every submitted task completed and nothing
/// was cancelled. Otherwise fail and leave the sink uncommitted. Returns the stored
/// document count after commit.
pub fn commit_if_complete(
    sink: &dyn IndexSink,
    completion: &Completion,
    optimize: bool,
) -> Result<u64> {
    if completion.interrupted {
        anyhow::bail!(
            "Indexing cancelled: {} of {} segments completed; nothing committed",
            completion.completed,
            completion.submitted
        );
    }
    if !completion.is_complete() {
        anyhow::bail!(
            "{} segments submitted but {} completed; refusing to commit",
            completion.submitted,
            completion.completed
        );
    }

    sink.commit().context("commit index")?;
    if optimize {
        sink.force_merge(1).context("merge index")?;
    }
    Ok(sink.stats()?.document_count)
}

/// Full segment list, or the deterministic shard subset when sharding is active.
pub fn build_segment_list(
    collection: &dyn DocumentCollection,
    input: &Path,
    config: &RunConfig,
) -> Result<Vec<SegmentDescriptor>> {
    info!("Initializing collection in {}", input.display());
    match config.shard {
        Some(shard) if shard.is_active() => {
            info!("Shard {} of {}", shard.current, shard.count);
            collection.segment_paths_sharded(input, shard)
        }
        _ => collection.segment_paths(input),
    }
}

/// Block until `submitted` task reports have arrived on `done_rx`, or the channel
/// disconnects early. Progress is logged on its own timer; `cancel` is checked on a short
/// poll and marks the result interrupted.
pub fn wait_for_completion(
    submitted: usize,
    done_rx: &Receiver<TaskOutcome>,
    cancel: &AtomicBool,
    reporter: &ProgressReporter,
    report_interval: Duration,
) -> Completion {
    let mut completion = Completion {
        submitted,
        ..Completion::default()
    };
    let report_tick = tick(report_interval);
    let cancel_tick = tick(CANCEL_POLL);

    while completion.completed + completion.cancelled < completion.submitted {
        select! {
            recv(done_rx) -> msg => match msg {
                Ok(TaskOutcome::Completed) => {
                    completion.completed += 1;
                    reporter.segment_done();
                }
                Ok(TaskOutcome::Cancelled) => completion.cancelled += 1,
                // Every sender is gone: nothing further can arrive.
                Err(_) => break,
            },
            recv(report_tick) -> _ => reporter.report(completion.completed),
            recv(cancel_tick) -> _ => {
                if cancel.load(Ordering::Relaxed) && !completion.interrupted {
                    warn!("Cancellation requested; stopping workers...");
                    completion.interrupted = true;
                }
            }
        }
    }
    if cancel.load(Ordering::Relaxed) {
        completion.interrupted = true;
    }
    completion
}

fn log_parameters(config: &RunConfig) {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        config
    );
    info!("============ Loading Parameters ============");
    info!("DocumentCollection path: {}", config.input.display());
    info!("CollectionClass: {}", config.collection);
    info!("Generator: {}", config.generator);
    info!("Threads: {}", config.threads);
    info!("Similarity: {}", config.similarity);
    info!("Store document \"contents\" field? {}", config.generator_opts.store_contents);
    info!("Store document \"raw\" field? {}", config.generator_opts.store_raw);
    info!("Additional fields to index: {:?}", config.generator_opts.fields);
    info!("Optimize (merge segments)? {}", config.optimize);
    info!("Unique docid? {}", config.unique_docid);
    info!(
        "Whitelist: {}",
        config
            .whitelist
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    info!("Index path: {}", config.index.display());
    info!("============ Indexing Collection ============");
}

fn log_summary(counters: &Counters, document_count: u64, elapsed: Duration) {
    if document_count != counters.indexed {
        warn!("Unexpected difference between number of indexed documents and index document count.");
    }
    info!(
        "Indexing Complete! {} documents indexed",
        with_commas(document_count)
    );
    info!("============ Final Counter Values ============");
    info!("indexed:     {:>12}", with_commas(counters.indexed));
    info!("unindexable: {:>12}", with_commas(counters.unindexable));
    info!("empty:       {:>12}", with_commas(counters.empty));
    info!("skipped:     {:>12}", with_commas(counters.skipped));
    info!("errors:      {:>12}", with_commas(counters.errors));
    info!(
        "Total {} documents indexed in {}",
        with_commas(document_count),
        format_hms(elapsed)
    );
}
