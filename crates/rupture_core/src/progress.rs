//! Sweep progress tracking and cooperative cancellation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Receives the current completed count
pub type ProgressObserver = Arc<dyn Fn(usize) + Send + Sync>;

/// Counts completed grid points and carries the cancellation flag.
///
/// Clones share the same counters, so a host can keep one handle while the
/// sweep ticks another. The observer fires only when progress crosses a
/// multiple of the threshold percentage, and once on reaching the total.
#[derive(Clone)]
pub struct ProgressReporter {
    current: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
    /// Index of the last threshold bucket reported
    reported: Arc<AtomicUsize>,
    threshold: f64,
    label: Option<Arc<str>>,
    observer: Option<ProgressObserver>,
}

impl ProgressReporter {
    pub const DEFAULT_THRESHOLD: f64 = 5.0;

    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            reported: Arc::new(AtomicUsize::new(0)),
            threshold: Self::DEFAULT_THRESHOLD,
            label: None,
            observer: None,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Percentage step between observer calls; clamped to (0, 100]
    #[must_use]
    pub fn with_threshold(mut self, percent: f64) -> Self {
        self.threshold = if percent.is_finite() && percent > 0.0 {
            percent.min(100.0)
        } else {
            Self::DEFAULT_THRESHOLD
        };
        self
    }

    /// Prefix used in log lines
    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(Arc::from(label));
        self
    }

    /// Set the total, zero the count and clear cancellation
    pub fn reset(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.current.store(0, Ordering::Relaxed);
        self.reported.store(0, Ordering::Relaxed);
        self.cancelled.store(false, Ordering::Relaxed);
    }

    /// Advance by `amount`, clamped to the total
    pub fn tick(&self, amount: usize) {
        let total = self.total();
        let previous = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_add(amount).min(total))
            })
            .unwrap_or_else(|c| c);
        let now = previous.saturating_add(amount).min(total);
        if now == previous || total == 0 {
            return;
        }

        let bucket = self.bucket(now, total);
        let crossed = self.reported.fetch_max(bucket, Ordering::Relaxed) < bucket;
        let finished = now == total;
        if !(crossed || finished) {
            return;
        }

        tracing::debug!(
            label = self.label.as_deref().unwrap_or("sweep"),
            current = now,
            total,
            "progress {:.0}%",
            100.0 * now as f64 / total as f64
        );
        if let Some(observer) = &self.observer {
            observer(now);
        }
    }

    fn bucket(&self, current: usize, total: usize) -> usize {
        let percent = 100.0 * current as f64 / total as f64;
        (percent / self.threshold).floor() as usize
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed fraction in [0, 1]; zero before the first reset
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.current() as f64 / total as f64,
        }
    }

    /// A handle that can only cancel, for observers and other threads
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancelled.clone())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("current", &self.current())
            .field("total", &self.total())
            .field("cancelled", &self.is_cancelled())
            .field("threshold", &self.threshold)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Sets the cancellation flag of the reporter it came from
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording(threshold: f64) -> (ProgressReporter, Arc<Mutex<Vec<usize>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = ProgressReporter::new()
            .with_threshold(threshold)
            .with_observer(move |n| sink.lock().unwrap().push(n));
        (progress, seen)
    }

    #[test]
    fn test_observer_fires_per_threshold() {
        let (progress, seen) = recording(5.0);
        progress.reset(1000);
        for _ in 0..1000 {
            progress.tick(1);
        }
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 20);
        assert_eq!(seen.first(), Some(&50));
        assert_eq!(seen.last(), Some(&1000));
    }

    #[test]
    fn test_small_total_reports_every_crossing_once() {
        let (progress, seen) = recording(25.0);
        progress.reset(3);
        for _ in 0..5 {
            progress.tick(1);
        }
        assert_eq!(progress.current(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_tick_clamps_to_total() {
        let progress = ProgressReporter::new();
        progress.reset(10);
        progress.tick(7);
        progress.tick(7);
        assert_eq!(progress.current(), 10);
        assert_eq!(progress.fraction(), 1.0);
    }

    #[test]
    fn test_reset_clears_cancel() {
        let progress = ProgressReporter::new();
        let handle = progress.cancel_handle();
        handle.cancel();
        assert!(progress.is_cancelled());
        progress.reset(4);
        assert!(!progress.is_cancelled());
        assert!(!handle.is_cancelled());
        assert_eq!(progress.current(), 0);
    }
}
