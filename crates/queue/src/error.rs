//! Scheduler error types.

use thiserror::Error;

/// Failure reported by a task's deferred operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    /// The task's future panicked while the batch was awaited.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for TaskError {
    fn from(e: reqwest::Error) -> Self {
        TaskError::Http(e.to_string())
    }
}

/// Outcome error of a run, observed through the run handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A task in the in-flight batch failed; the whole run is abandoned.
    #[error("batch failed: {0}")]
    Task(#[from] TaskError),

    /// The scheduler was stopped before the run settled.
    #[error("scheduler stopped before the run settled")]
    Stopped,

    /// The run handle was replaced by a newer one before it settled.
    #[error("run handle superseded before it settled")]
    Abandoned,
}
