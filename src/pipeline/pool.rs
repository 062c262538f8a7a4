//! Fixed-size worker pool: one task per segment, each reporting back on a completion channel.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::error;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// How a submitted task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Ran to the end of its segment (including segments that failed and were logged).
    Completed,
    /// Never started, or stopped early, because cancellation was requested.
    Cancelled,
}

/// Pool of `threads` workers. The pool owns scheduling; tasks are plain closures.
pub struct WorkerPool {
    pool: ThreadPool,
    cancel: Arc<AtomicBool>,
    done_tx: Sender<TaskOutcome>,
    done_rx: Receiver<TaskOutcome>,
    submitted: usize,
}

impl WorkerPool {
    pub fn new(threads: usize, cancel: Arc<AtomicBool>) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("indexer-{i}"))
            .build()
            .context("build worker pool")?;
        let (done_tx, done_rx) = unbounded();
        Ok(Self {
            pool,
            cancel,
            done_tx,
            done_rx,
            submitted: 0,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `task` under `name` (used in failure logs). A panicking task is logged and
    /// counted as completed; tasks not yet started when cancellation is requested report
    /// [`TaskOutcome::Cancelled`] without running.
    pub fn submit<F>(&mut self, name: String, task: F)
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        let done_tx = self.done_tx.clone();
        let cancel = Arc::clone(&self.cancel);
        self.submitted += 1;
        self.pool.spawn(move || {
            let outcome = if cancel.load(Ordering::Relaxed) {
                TaskOutcome::Cancelled
            } else {
                match panic::catch_unwind(AssertUnwindSafe(task)) {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        error!("{}: worker panicked", name);
                        TaskOutcome::Completed
                    }
                }
            };
            let _ = done_tx.send(outcome);
        });
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Ask queued and running tasks to stop. Nothing already written is undone.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Stop accepting tasks and return the completion receiver. The channel disconnects
    /// once every submitted task has reported (or been dropped by the pool).
    pub fn finish_submissions(self) -> (PoolHandle, Receiver<TaskOutcome>) {
        let WorkerPool {
            pool,
            cancel: _,
            done_tx,
            done_rx,
            submitted,
        } = self;
        drop(done_tx);
        (
            PoolHandle {
                _pool: pool,
                submitted,
            },
            done_rx,
        )
    }
}

/// Keeps the pool alive while the coordinator waits on the completion channel.
pub struct PoolHandle {
    _pool: ThreadPool,
    pub submitted: usize,
}
