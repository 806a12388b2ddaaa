//! Progress reporting and cancellation support.
//!
//! Probing every video in a large collection is slow, and so is walking an
//! epoch of batches. This module provides [`ProgressCallback`] for observing
//! both, [`CancellationToken`] for stopping an index build early, and
//! [`ProgressInfo`] for the snapshots handed to callbacks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framefold::{FolderOptions, ProgressCallback, ProgressInfo, VideoFolder};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let options = FolderOptions::new().with_progress(Arc::new(PrintProgress));
//! let dataset = VideoFolder::open_with_options("data/train", &options)?;
//! # Ok::<(), framefold::FramefoldError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Scanning class directories and probing video frame counts.
    Indexing,
    /// Producing collated batches from a [`VideoLoader`](crate::VideoLoader).
    Loading,
}

/// A snapshot of progress.
///
/// Delivered to [`ProgressCallback::on_progress`] at a cadence controlled by
/// [`FolderOptions::with_progress_interval`](crate::FolderOptions::with_progress_interval).
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items (probed videos or batches) have been processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Number of frames accounted for so far (running index total while
    /// indexing, frames delivered while loading).
    pub frames: u64,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] because probing may run on
/// rayon worker threads and loading may run on a blocking Tokio thread.
///
/// Callbacks observe but cannot halt the operation. Use
/// [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during an operation.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default when nothing is
/// configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone the token and share it between threads; calling
/// [`cancel`](CancellationToken::cancel) on any clone makes the index
/// builder stop before its next probe.
///
/// # Example
///
/// ```
/// use framefold::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks progress timing and emits callbacks every `interval` items.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    frames: u64,
    interval: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        interval: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            frames: 0,
            interval: interval.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item covering `frames` frames, firing the
    /// callback when the interval is reached.
    pub(crate) fn advance(&mut self, frames: u64) {
        self.current += 1;
        self.frames += frames;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.interval {
            self.report();
            self.items_since_last_report = 0;
        }
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report();
    }

    fn report(&self) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                let per_item = elapsed.div_f64(self.current as f64);
                per_item.mul_f64(remaining as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            frames: self.frames,
        };

        self.callback.on_progress(&info);
    }
}
