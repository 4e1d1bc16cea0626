//! Per-stage counters.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

/// Counters a stage updates as elements pass through it.
///
/// Shared behind an `Arc` between the stage task and whoever inspects it.
#[derive(Debug, Default)]
pub struct StageMetrics {
    /// Elements delivered downstream.
    forwarded: AtomicU64,
    /// Elements discarded (routing misses, cancelled admissions).
    dropped: AtomicU64,
    /// Time spent waiting before elements could be forwarded, in microseconds.
    waited_us: AtomicU64,
    /// Last time an element was forwarded.
    last_forward: RwLock<Option<Instant>>,
}

impl StageMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a forwarded element.
    pub fn record_forward(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        *self.last_forward.write() = Some(Instant::now());
    }

    /// Records a discarded element.
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records time spent waiting for admission.
    pub fn record_wait(&self, waited: std::time::Duration) {
        let micros = u64::try_from(waited.as_micros()).unwrap_or(u64::MAX);
        self.waited_us.fetch_add(micros, Ordering::Relaxed);
    }

    /// Returns the number of forwarded elements.
    #[must_use]
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Returns the number of discarded elements.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns the total admission wait.
    #[must_use]
    pub fn waited(&self) -> std::time::Duration {
        std::time::Duration::from_micros(self.waited_us.load(Ordering::Relaxed))
    }

    /// Returns when an element was last forwarded.
    #[must_use]
    pub fn last_forward(&self) -> Option<Instant> {
        *self.last_forward.read()
    }

    /// Returns the drop rate as a percentage of all elements seen.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn drop_rate(&self) -> f64 {
        let forwarded = self.forwarded();
        let dropped = self.dropped();
        let total = forwarded + dropped;
        if total == 0 {
            0.0
        } else {
            (dropped as f64 / total as f64) * 100.0
        }
    }

    /// Converts metrics to a dictionary.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "forwarded": self.forwarded(),
            "dropped": self.dropped(),
            "waited_ms": self.waited_us.load(Ordering::Relaxed) / 1000,
            "drop_rate_percent": (self.drop_rate() * 100.0).round() / 100.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metrics_counts() {
        let metrics = StageMetrics::new();
        metrics.record_forward();
        metrics.record_forward();
        metrics.record_forward();
        metrics.record_drop();

        assert_eq!(metrics.forwarded(), 3);
        assert_eq!(metrics.dropped(), 1);
        assert!((metrics.drop_rate() - 25.0).abs() < f64::EPSILON);
        assert!(metrics.last_forward().is_some());
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = StageMetrics::new();
        assert!(metrics.drop_rate().abs() < f64::EPSILON);
        assert!(metrics.last_forward().is_none());
    }

    #[test]
    fn test_metrics_to_dict() {
        let metrics = StageMetrics::new();
        metrics.record_forward();
        metrics.record_wait(Duration::from_millis(1500));

        let dict = metrics.to_dict();
        assert_eq!(dict["forwarded"], 1);
        assert_eq!(dict["dropped"], 0);
        assert_eq!(dict["waited_ms"], 1500);
    }
}
