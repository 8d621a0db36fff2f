//! Pending set with lazy priority ordering.
//!
//! Admission appends and marks the set dirty. The set is re-sorted by
//! descending priority only when a batch is pulled while dirty, so a burst of
//! admissions costs one sort.

use crate::task::{Task, TaskTicket};

pub struct PendingSet<T> {
    tasks: Vec<Task<T>>,
    dirty: bool,
}

impl<T> Default for PendingSet<T> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            dirty: false,
        }
    }
}

impl<T> PendingSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task in admission order and re-arm the dirty flag.
    pub fn push(&mut self, task: Task<T>) {
        self.tasks.push(task);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sort by descending priority if anything was admitted since the last
    /// sort. Stable: ties keep admission order. Returns whether a sort ran.
    pub fn sort_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.tasks.sort_by(|a, b| b.priority().cmp(&a.priority()));
        self.dirty = false;
        true
    }

    /// Remove up to `max` tasks from the front, highest priority first.
    pub fn take_batch(&mut self, max: usize) -> Vec<Task<T>> {
        self.sort_if_dirty();
        let count = max.min(self.tasks.len());
        self.tasks.drain(..count).collect()
    }

    /// Identity of every pending task in current order.
    pub fn tickets(&self) -> Vec<TaskTicket> {
        self.tasks.iter().map(Task::ticket).collect()
    }
}
