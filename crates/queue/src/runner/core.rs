use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use taskq_core::QueueConfig;
use tracing::debug;

use crate::handle::RunHandle;
use crate::metrics::QueueMetrics;
use crate::options::{QueueOptions, Settings};
use crate::state::{RunState, SchedulerSnapshot, SchedulerState};
use crate::task::Submission;

/// Everything the scheduler owns, guarded by one mutex. Each public
/// operation and each dispatch step holds it for one transition only, never
/// across an await.
pub(super) struct Inner<T> {
    pub(super) run: RunState<T>,
    pub(super) settings: Settings<T>,
    pub(super) metrics: QueueMetrics,
}

/// Bounded-concurrency priority scheduler.
///
/// Admitted tasks are pulled in batches of at most `max`, highest priority
/// first. A batch runs concurrently and must settle as a whole before the
/// next one is pulled, `interval` later. Results accumulate across batches
/// and are delivered through the run handle returned by [`Scheduler::result`].
///
/// The handle is cheap to clone; clones share the same state. `run()` and
/// `resume()` spawn onto the current Tokio runtime.
pub struct Scheduler<T> {
    pub(super) inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Scheduler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Scheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a scheduler. `max` below one is raised to one.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                run: RunState::new(),
                settings: Settings::new(&config),
                metrics: QueueMetrics::default(),
            })),
        }
    }

    /// Every critical section leaves the state consistent, so a poisoned
    /// lock is still usable.
    pub(super) fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a submission with priority 0.
    pub fn add(&self, submission: impl Into<Submission<T>>) -> &Self {
        self.add_with_priority(submission, 0)
    }

    /// Admit a submission. Collections are expanded recursively and every
    /// leaf is admitted with the same `priority`; empty submissions are a
    /// no-op. Nothing starts executing.
    pub fn add_with_priority(&self, submission: impl Into<Submission<T>>, priority: i64) -> &Self {
        let mut ops = Vec::new();
        submission.into().flatten_into(&mut ops);
        if ops.is_empty() {
            return self;
        }

        let mut inner = self.lock();
        let ids = inner.run.admit(ops, priority);
        debug!(
            admitted = ids.len(),
            priority,
            pending = inner.run.pending_len(),
            "tasks admitted"
        );
        self
    }

    /// Update interval, max or callback in place. Zero values are ignored.
    pub fn options(&self, update: QueueOptions<T>) -> &Self {
        self.lock().settings.apply(update);
        self
    }

    /// Current run handle, or an already-settled empty one if no run has
    /// ever started.
    pub fn result(&self) -> RunHandle<T> {
        self.lock().run.result()
    }

    pub fn state(&self) -> SchedulerState {
        self.lock().run.state()
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.lock().run.snapshot()
    }

    pub fn metrics(&self) -> QueueMetrics {
        self.lock().metrics.clone()
    }

    /// Effective configuration, including accepted option updates.
    pub fn config(&self) -> QueueConfig {
        self.lock().settings.config.clone()
    }
}

impl<T> Default for Scheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl<T> fmt::Debug for Scheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Scheduler")
            .field("state", &inner.run.state())
            .field("pending", &inner.run.pending_len())
            .field("config", &inner.settings.config)
            .finish()
    }
}
