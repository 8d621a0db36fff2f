use crate::state::Resume;

use super::Scheduler;

impl<T> Scheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start a run. A no-op while running or paused; allowed again once the
    /// previous run finished. With nothing pending the run finishes at once.
    pub fn run(&self) -> &Self {
        let epoch = self.lock().run.start_run();
        if let Some(epoch) = epoch {
            self.spawn_dispatch(epoch);
        }
        self
    }

    /// Request a pause. Only legal while running; the in-flight batch runs to
    /// completion, then the run handle resolves with the results so far.
    pub fn pause(&self) -> &Self {
        self.lock().run.request_pause();
        self
    }

    /// Continue a paused run from the current pending set under a fresh
    /// run handle. Ignored unless paused.
    pub fn resume(&self) -> &Self {
        let decision = self.lock().run.resume();
        if let Resume::Dispatch(epoch) = decision {
            self.spawn_dispatch(epoch);
        }
        self
    }

    /// Discard all pending, in-flight and finished work and return to a
    /// freshly constructed state with the same configuration. An unsettled
    /// run handle is rejected with `SchedulerError::Stopped`. Tasks already
    /// dispatched keep running but their outcome is dropped.
    pub fn stop(&self) -> &Self {
        let mut inner = self.lock();
        inner.run.reset();
        inner.metrics = Default::default();
        self
    }
}
