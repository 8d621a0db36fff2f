//! Scheduler lifecycle.
//!
//! [`RunState`] is the value object the scheduler guards with its mutex:
//! lifecycle state, the pending/in-flight/finished sets, the dirty flag and
//! the current run handle. It only changes through the transition methods
//! below, each of which is one critical section of the dispatch loop or of a
//! public operation. Nothing here awaits.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{SchedulerError, TaskError};
use crate::handle::{RunHandle, RunResolver};
use crate::pending::PendingSet;
use crate::task::{Deferred, Task, TaskId, TaskTicket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    /// Freshly constructed, or just stopped.
    Init,
    /// A batch has been pulled and work remains.
    Running,
    /// Pause requested; takes effect at the next batch boundary.
    Paused,
    /// Assigned by `stop()` inside the same critical section that rebuilds
    /// the state as `Init`, so it is never observable from outside.
    Stopped,
    /// The last run consumed every pending task.
    Finished,
}

impl SchedulerState {
    /// `run()` starts a run only when not already running and either no
    /// run has ever started or the previous one finished.
    pub fn can_start_run(self, has_handle: bool) -> bool {
        self != SchedulerState::Running && (!has_handle || self == SchedulerState::Finished)
    }

    pub fn can_pause(self) -> bool {
        self == SchedulerState::Running
    }

    pub fn can_resume(self) -> bool {
        self == SchedulerState::Paused
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Init => "init",
            SchedulerState::Running => "running",
            SchedulerState::Paused => "paused",
            SchedulerState::Stopped => "stopped",
            SchedulerState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Read-only view of the scheduler's sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    pub state: SchedulerState,
    pub pending: Vec<TaskTicket>,
    pub in_flight: Vec<TaskTicket>,
    pub finished: usize,
    pub dirty: bool,
    pub has_run_handle: bool,
}

/// What `resume()` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Not paused; nothing happened.
    Ignored,
    /// The paused batch had not settled yet; the pause is withdrawn and the
    /// live dispatch loop keeps its handle.
    Withdrawn,
    /// Nothing pending; a fresh handle was installed and stays unsettled.
    Idle,
    /// A fresh handle was installed; spawn a dispatch loop for this epoch.
    Dispatch(u64),
}

/// Decision taken once a batch has settled and the callback has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterBatch {
    /// Work remains: wait `interval`, then pull again.
    Continue,
    /// Pause took effect; the handle resolved with results so far.
    Paused,
    /// Pending set drained; the handle resolved.
    Finished,
    /// The scheduler was stopped while this loop was running.
    Stale,
}

pub struct RunState<T> {
    state: SchedulerState,
    pending: PendingSet<T>,
    in_flight: Vec<TaskTicket>,
    finished: Vec<T>,
    next_id: u64,
    /// Bumped by every reset; loops from an earlier epoch discard their work.
    epoch: u64,
    /// A dispatch loop for the current epoch is alive.
    dispatching: bool,
    handle: Option<RunHandle<T>>,
    resolver: Option<RunResolver<T>>,
}

impl<T> RunState<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Init,
            pending: PendingSet::new(),
            in_flight: Vec::new(),
            finished: Vec::new(),
            next_id: 0,
            epoch: 0,
            dispatching: false,
            handle: None,
            resolver: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state,
            pending: self.pending.tickets(),
            in_flight: self.in_flight.clone(),
            finished: self.finished.len(),
            dirty: self.pending.is_dirty(),
            has_run_handle: self.handle.is_some(),
        }
    }

    /// Current run handle, or an already-settled empty one if no run has
    /// ever started.
    pub fn result(&self) -> RunHandle<T> {
        match &self.handle {
            Some(handle) => handle.clone(),
            None => RunHandle::ready(Ok(Vec::new())),
        }
    }

    /// Admit leaf operations with `priority`. Returns the ids assigned.
    pub fn admit(&mut self, ops: Vec<Deferred<T>>, priority: i64) -> Vec<TaskId> {
        let mut ids = Vec::with_capacity(ops.len());
        for op in ops {
            let id = TaskId(self.next_id);
            self.next_id += 1;
            self.pending.push(Task::new(id, priority, op));
            ids.push(id);
        }
        ids
    }

    /// Install a fresh handle, rejecting any unsettled predecessor.
    fn install_handle(&mut self) {
        if let Some(previous) = self.resolver.take() {
            previous.reject(SchedulerError::Abandoned);
        }
        let (resolver, handle) = RunHandle::channel();
        self.resolver = Some(resolver);
        self.handle = Some(handle);
    }

    fn resolve(&mut self) {
        if let Some(resolver) = self.resolver.take() {
            resolver.resolve(self.finished.clone());
        }
    }

    /// `run()`. Returns the epoch to dispatch for, or `None` when the call is
    /// a no-op or the run concluded immediately on an empty pending set.
    pub fn start_run(&mut self) -> Option<u64> {
        if self.dispatching || !self.state.can_start_run(self.handle.is_some()) {
            debug!(state = %self.state, dispatching = self.dispatching, "run ignored");
            return None;
        }
        self.install_handle();

        if self.pending.is_empty() {
            self.state = SchedulerState::Finished;
            self.resolve();
            info!(finished = self.finished.len(), "run finished with nothing pending");
            return None;
        }

        // Running before the loop is spawned: a second `run()` is a no-op and
        // an immediate `pause()` applies to the first batch.
        self.state = SchedulerState::Running;
        self.dispatching = true;
        info!(pending = self.pending.len(), "run started");
        Some(self.epoch)
    }

    /// `pause()`. Returns whether the state changed.
    pub fn request_pause(&mut self) -> bool {
        if !self.state.can_pause() {
            debug!(state = %self.state, "pause ignored");
            return false;
        }
        self.state = SchedulerState::Paused;
        info!(in_flight = self.in_flight.len(), "pause requested");
        true
    }

    /// `resume()`, the Continue operation.
    pub fn resume(&mut self) -> Resume {
        if !self.state.can_resume() {
            debug!(state = %self.state, "continue ignored");
            return Resume::Ignored;
        }

        if self.dispatching {
            self.state = SchedulerState::Running;
            info!("pause withdrawn before the batch settled");
            return Resume::Withdrawn;
        }

        self.install_handle();
        if self.pending.is_empty() {
            debug!("continue with nothing pending");
            return Resume::Idle;
        }

        self.state = SchedulerState::Running;
        self.dispatching = true;
        info!(pending = self.pending.len(), "run continued");
        Resume::Dispatch(self.epoch)
    }

    /// Pull the next batch: at most `max` tasks, highest priority first.
    /// `None` ends the loop (stale epoch or nothing pending).
    pub fn pull_batch(&mut self, epoch: u64, max: usize) -> Option<Vec<Task<T>>> {
        if epoch != self.epoch {
            return None;
        }
        if self.pending.is_empty() {
            self.dispatching = false;
            return None;
        }

        // A pause requested between `run()`/`resume()` and the first pull
        // still lets that batch go; it takes effect once the batch settles.
        if self.state != SchedulerState::Paused {
            self.state = SchedulerState::Running;
        }
        let batch = self.pending.take_batch(max.max(1));
        self.in_flight = batch.iter().map(Task::ticket).collect();
        debug!(
            batch = batch.len(),
            remaining = self.pending.len(),
            "batch dispatched"
        );
        Some(batch)
    }

    /// Record a batch that settled successfully. Returns `false` if the
    /// batch belongs to a stopped run.
    pub fn settle_batch(&mut self, epoch: u64, results: Vec<T>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.finished.extend(results);
        self.in_flight.clear();
        true
    }

    /// Decide what follows a settled batch (called after the callback).
    pub fn after_batch(&mut self, epoch: u64) -> AfterBatch {
        if epoch != self.epoch {
            return AfterBatch::Stale;
        }
        if self.state == SchedulerState::Paused {
            self.dispatching = false;
            self.resolve();
            info!(finished = self.finished.len(), pending = self.pending.len(), "run paused");
            return AfterBatch::Paused;
        }
        if !self.pending.is_empty() {
            return AfterBatch::Continue;
        }
        self.state = SchedulerState::Finished;
        self.dispatching = false;
        self.resolve();
        info!(finished = self.finished.len(), "run finished");
        AfterBatch::Finished
    }

    /// Check after the inter-batch delay whether the loop may pull again.
    /// A pause requested during the delay takes effect here.
    pub fn after_delay(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        if self.state == SchedulerState::Paused {
            self.dispatching = false;
            self.resolve();
            info!(finished = self.finished.len(), pending = self.pending.len(), "run paused");
            return false;
        }
        true
    }

    /// A task in the batch failed: reject the handle and abandon the run.
    /// Pending and in-flight sets are left as they are.
    pub fn fail_batch(&mut self, epoch: u64, error: TaskError) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.dispatching = false;
        if let Some(resolver) = self.resolver.take() {
            resolver.reject(SchedulerError::Task(error));
        }
        true
    }

    /// `stop()`: reject an unsettled handle and return to a fresh state.
    pub fn reset(&mut self) {
        self.state = SchedulerState::Stopped;
        if let Some(resolver) = self.resolver.take() {
            resolver.reject(SchedulerError::Stopped);
        }
        info!(
            pending = self.pending.len(),
            in_flight = self.in_flight.len(),
            "scheduler stopped"
        );
        let epoch = self.epoch + 1;
        *self = Self::new();
        self.epoch = epoch;
    }
}

impl<T> Default for RunState<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
