//! Rolling latency average used for follower selection.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

/// Number of samples in the rolling window.
pub(crate) const LATENCY_WINDOW: usize = 100;

/// A windowed mean over the last N latency samples.
///
/// The circular buffer and the running sum are maintained with atomics so
/// the reader pump can record samples while the follower selector reads the
/// average. Ranking tolerates the transient skew of unsynchronized updates.
#[derive(Debug)]
pub(crate) struct RollingAverage {
    samples: Box<[AtomicI64]>,
    sum: AtomicI64,
    index: AtomicUsize,
    count: AtomicUsize,
}

impl RollingAverage {
    pub(crate) fn new(window: usize) -> Self {
        let samples = (0..window).map(|_| AtomicI64::new(0)).collect();
        Self {
            samples,
            sum: AtomicI64::new(0),
            index: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        }
    }

    /// Feeds one sample, evicting the oldest once the window is full.
    pub(crate) fn record(&self, sample: Duration) {
        let new = sample.as_nanos().min(i64::MAX as u128) as i64;
        let idx = self.index.load(Ordering::Relaxed);
        let old = self.samples[idx].swap(new, Ordering::Relaxed);
        self.sum.fetch_add(new - old, Ordering::Relaxed);
        self.index
            .store((idx + 1) % self.samples.len(), Ordering::Relaxed);
        if self.count.load(Ordering::Relaxed) < self.samples.len() {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns `sum / min(count, window)`, or zero before the first sample.
    pub(crate) fn average(&self) -> Duration {
        let count = self.count.load(Ordering::Relaxed).min(self.samples.len());
        if count == 0 {
            return Duration::ZERO;
        }
        let sum = self.sum.load(Ordering::Relaxed).max(0);
        Duration::from_nanos((sum / count as i64) as u64)
    }
}
