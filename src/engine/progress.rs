//! Progress reporting while the pool drains: a periodic log line and an optional kdam bar.

use kdam::{Animation, Bar, BarExt};
use log::info;
use std::sync::{Arc, Mutex};

use super::counters::CounterAggregate;
use super::tools::with_commas;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " files"
    )))
}

/// Advance the bar by `n` finished segments.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.lock() {
        let _ = pb.update(n);
    }
}

/// Line logged by the coordinator while waiting. Single-segment runs only have a document
/// count to show; multi-segment runs also show the share of finished segments.
pub fn progress_line(total_segments: usize, completed: usize, indexed: u64) -> String {
    if total_segments == 1 {
        format!("{} documents indexed", with_commas(indexed))
    } else {
        let pct = if total_segments == 0 {
            100.0
        } else {
            completed as f64 / total_segments as f64 * 100.0
        };
        format!(
            "{:.2}% of files completed, {} documents indexed",
            pct,
            with_commas(indexed)
        )
    }
}

/// Reporting state owned by the wait loop.
pub struct ProgressReporter {
    total_segments: usize,
    counters: Arc<CounterAggregate>,
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(total_segments: usize, counters: Arc<CounterAggregate>, with_bar: bool) -> Self {
        let bar = with_bar.then(|| {
            create_progress_bar(ProgressBarConfig::new(
                total_segments,
                "Indexing",
                Animation::Classic,
            ))
        });
        Self {
            total_segments,
            counters,
            bar,
        }
    }

    /// One segment task reported back.
    pub fn segment_done(&self) {
        if let Some(bar) = &self.bar {
            update_progress_bar(bar, 1);
        }
    }

    /// Timer tick: log where the run stands.
    pub fn report(&self, completed: usize) {
        info!(
            "{}",
            progress_line(self.total_segments, completed, self.counters.indexed())
        );
    }

    /// Close out the bar line so later log output starts clean.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar
            && let Ok(mut b) = bar.lock()
        {
            let _ = b.refresh();
            eprintln!();
        }
    }
}
