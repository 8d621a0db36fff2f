use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler operational metrics, reset by `stop()`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueMetrics {
    /// Batches that settled successfully.
    pub batches_completed: u64,
    /// Batches rejected because a task failed.
    pub batches_failed: u64,
    /// Tasks whose results were appended to the finished set.
    pub tasks_completed: u64,
    /// Rolling mean of batch wall time (invoke to joint settle).
    pub avg_batch_duration: Duration,
    /// When the last batch settled, successfully or not.
    pub last_batch_at: Option<DateTime<Utc>>,
    /// Progress callbacks that panicked.
    pub callback_panics: u64,
}

impl QueueMetrics {
    /// Record a batch that settled successfully.
    pub fn record_batch(&mut self, tasks: usize, duration: Duration) {
        self.batches_completed += 1;
        self.tasks_completed += tasks as u64;
        self.last_batch_at = Some(Utc::now());

        let count = self.batches_completed;
        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        self.avg_batch_duration = if count == 1 {
            duration
        } else {
            let prev_nanos = self.avg_batch_duration.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
    }

    /// Record a batch that failed.
    pub fn record_failure(&mut self) {
        self.batches_failed += 1;
        self.last_batch_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_single_batch() {
        let mut m = QueueMetrics::default();
        m.record_batch(3, Duration::from_millis(100));

        assert_eq!(m.batches_completed, 1);
        assert_eq!(m.tasks_completed, 3);
        assert!(m.last_batch_at.is_some());
        assert_eq!(m.avg_batch_duration, Duration::from_millis(100));
    }

    #[test]
    fn record_multiple_batches_averages() {
        let mut m = QueueMetrics::default();
        m.record_batch(1, Duration::from_millis(100));
        m.record_batch(2, Duration::from_millis(200));

        assert_eq!(m.tasks_completed, 3);
        // Average of 100ms and 200ms = 150ms
        let avg = m.avg_batch_duration.as_millis();
        assert!((140..=160).contains(&avg), "expected ~150ms, got {}ms", avg);
    }

    #[test]
    fn failures_counted_separately() {
        let mut m = QueueMetrics::default();
        m.record_failure();
        assert_eq!(m.batches_failed, 1);
        assert_eq!(m.batches_completed, 0);
        assert!(m.last_batch_at.is_some());
    }
}
