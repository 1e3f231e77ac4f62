//! Injectable progress reporting for iteration steps.
//!
//! [`ForEachStep`](crate::ForEachStep) advances a reporter once per processed
//! element and completes it when the loop ends. The core only requires these
//! two operations; concrete rendering (console bar, log line, no-op) belongs
//! to the surrounding application.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Minimal progress capability: advance by one, mark complete.
///
/// Reporting is a pure side effect with no influence on pipeline data.
pub trait ProgressReporter: Send + Sync {
    /// Called once per processed element or iteration.
    fn advance(&self);

    /// Called once when the iteration finishes.
    fn complete(&self);
}

/// The default reporter: does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn advance(&self) {}

    fn complete(&self) {}
}

/// A reporter that logs progress through the `tracing` subscriber.
///
/// Emits a `debug` event per element and an `info` event on completion,
/// labelled with the configured description.
#[derive(Debug)]
pub struct TracingProgress {
    desc: String,
    count: AtomicUsize,
}

impl TracingProgress {
    /// Create a tracing reporter with the given display label.
    pub fn new(desc: impl Into<String>) -> Self {
        Self {
            desc: desc.into(),
            count: AtomicUsize::new(0),
        }
    }
}

impl ProgressReporter for TracingProgress {
    fn advance(&self) {
        let done = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(desc = %self.desc, done, "progress");
    }

    fn complete(&self) {
        let done = self.count.load(Ordering::Relaxed);
        tracing::info!(desc = %self.desc, done, "progress complete");
    }
}

/// A progress notification delivered to a [`ClosureProgress`] callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// One element or iteration finished; carries the running count.
    Advanced(usize),
    /// The whole iteration finished; carries the final count.
    Completed(usize),
}

/// A reporter driving a user-supplied closure.
///
/// # Example
///
/// ```rust
/// use stepchain::progress::{ClosureProgress, ProgressReporter, ProgressUpdate};
///
/// let reporter = ClosureProgress::new(|update| {
///     if let ProgressUpdate::Completed(n) = update {
///         println!("processed {n} items");
///     }
/// });
/// reporter.advance();
/// reporter.complete();
/// ```
pub struct ClosureProgress<F> {
    f: F,
    count: AtomicUsize,
}

impl<F> ClosureProgress<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Create a reporter from the given callback.
    pub fn new(f: F) -> Self {
        Self {
            f,
            count: AtomicUsize::new(0),
        }
    }
}

impl<F> ProgressReporter for ClosureProgress<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn advance(&self) {
        let done = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        (self.f)(ProgressUpdate::Advanced(done));
    }

    fn complete(&self) {
        let done = self.count.load(Ordering::Relaxed);
        (self.f)(ProgressUpdate::Completed(done));
    }
}
