//! Tasks and submissions.
//!
//! A [`Deferred`] is a zero-argument operation that, when invoked, starts an
//! asynchronous computation yielding `Result<T, TaskError>`. Admission wraps
//! each deferred operation in a [`Task`] that carries its priority and an
//! admission sequence number.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;

use crate::error::TaskError;

/// Future produced by invoking a task.
pub type TaskFuture<T> = BoxFuture<'static, Result<T, TaskError>>;

/// A deferred operation: nothing runs until [`Deferred::invoke`] is called.
pub struct Deferred<T> {
    op: Box<dyn FnOnce() -> TaskFuture<T> + Send>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Wrap a closure that produces the task's future.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self {
            op: Box::new(move || f().boxed()),
        }
    }

    /// A trivial operation that yields `value` unchanged.
    pub fn ready(value: T) -> Self {
        Self::new(move || async move { Ok(value) })
    }

    /// A trivial operation that fails with `error`.
    pub fn failing(error: TaskError) -> Self {
        Self::new(move || async move { Err(error) })
    }
}

impl<T> Deferred<T> {
    /// Start the operation.
    pub fn invoke(self) -> TaskFuture<T> {
        (self.op)()
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// Admission sequence number. Identity only; tasks are never deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// The observable identity of a task once its operation has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskTicket {
    pub id: TaskId,
    pub priority: i64,
}

/// A deferred operation admitted to the scheduler, with its priority.
/// Higher priority runs first.
#[derive(Debug)]
pub struct Task<T> {
    id: TaskId,
    priority: i64,
    op: Deferred<T>,
}

impl<T> Task<T> {
    pub fn new(id: TaskId, priority: i64, op: Deferred<T>) -> Self {
        Self { id, priority, op }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn ticket(&self) -> TaskTicket {
        TaskTicket {
            id: self.id,
            priority: self.priority,
        }
    }

    /// Consume the task and start its operation.
    pub fn invoke(self) -> TaskFuture<T> {
        self.op.invoke()
    }
}

/// A raw submission after adaptation: nothing, one operation, or a nested
/// collection of submissions that admission expands recursively.
#[derive(Debug)]
pub enum Submission<T> {
    Empty,
    One(Deferred<T>),
    Many(Vec<Submission<T>>),
}

impl<T> Submission<T> {
    /// Expand nested collections, appending every leaf operation to `out`
    /// in submission order.
    pub fn flatten_into(self, out: &mut Vec<Deferred<T>>) {
        match self {
            Submission::Empty => {}
            Submission::One(op) => out.push(op),
            Submission::Many(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }

    /// Number of leaf operations this submission expands to.
    pub fn leaf_count(&self) -> usize {
        match self {
            Submission::Empty => 0,
            Submission::One(_) => 1,
            Submission::Many(items) => items.iter().map(Submission::leaf_count).sum(),
        }
    }
}

impl<T> From<Deferred<T>> for Submission<T> {
    fn from(op: Deferred<T>) -> Self {
        Submission::One(op)
    }
}

impl<T, S: Into<Submission<T>>> From<Option<S>> for Submission<T> {
    fn from(item: Option<S>) -> Self {
        match item {
            Some(s) => s.into(),
            None => Submission::Empty,
        }
    }
}

impl<T, S: Into<Submission<T>>> From<Vec<S>> for Submission<T> {
    fn from(items: Vec<S>) -> Self {
        Submission::Many(items.into_iter().map(Into::into).collect())
    }
}
