//! Runtime options: interval, concurrency cap and progress callback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use taskq_core::QueueConfig;
use tracing::debug;

use crate::runner::Scheduler;

/// Progress callback, invoked with each settled batch's results and the
/// scheduler that ran it.
pub type Callback<T> = Arc<dyn Fn(&[T], &Scheduler<T>) + Send + Sync>;

/// A partial options update for [`Scheduler::options`].
///
/// Zero values for `interval_ms` or `max` are ignored, leaving the previous
/// value in place.
pub struct QueueOptions<T> {
    pub interval_ms: Option<u64>,
    pub max: Option<usize>,
    pub cb: Option<Callback<T>>,
}

impl<T> Default for QueueOptions<T> {
    fn default() -> Self {
        Self {
            interval_ms: None,
            max: None,
            cb: None,
        }
    }
}

impl<T> QueueOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = Some(interval_ms);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn callback<F>(mut self, cb: F) -> Self
    where
        F: Fn(&[T], &Scheduler<T>) + Send + Sync + 'static,
    {
        self.cb = Some(Arc::new(cb));
        self
    }
}

impl<T> fmt::Debug for QueueOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueOptions")
            .field("interval_ms", &self.interval_ms)
            .field("max", &self.max)
            .field("cb", &self.cb.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Effective settings. These survive `stop()`: a stopped scheduler comes back
/// with the configuration it had, including accepted option updates.
pub(crate) struct Settings<T> {
    pub(crate) config: QueueConfig,
    pub(crate) cb: Option<Callback<T>>,
}

impl<T> Settings<T> {
    pub(crate) fn new(config: &QueueConfig) -> Self {
        Self {
            config: config.normalized(),
            cb: None,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    pub(crate) fn max(&self) -> usize {
        self.config.max
    }

    /// Merge a partial update, ignoring invalid values.
    pub(crate) fn apply(&mut self, update: QueueOptions<T>) {
        match update.interval_ms {
            Some(ms) if ms > 0 => self.config.interval_ms = ms,
            Some(ms) => debug!(interval_ms = ms, "ignored non-positive interval"),
            None => {}
        }
        match update.max {
            Some(max) if max > 0 => self.config.max = max,
            Some(max) => debug!(max, "ignored non-positive max"),
            None => {}
        }
        if let Some(cb) = update.cb {
            self.cb = Some(cb);
        }
    }
}
