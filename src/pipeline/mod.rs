//! Indexing pipeline: shared worker context, segment worker, pool, and coordinator.

pub mod context;
pub mod orchestrator;
pub mod pool;
pub mod worker;

pub use context::WorkerContext;
pub use orchestrator::{
    Completion, build_segment_list, commit_if_complete, run, run_with_cancel,
    wait_for_completion,
};
pub use pool::{PoolHandle, TaskOutcome, WorkerPool};
pub use worker::{SegmentReport, index_segment, run_segment_task};
