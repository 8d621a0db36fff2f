//! Bounded-concurrency priority task scheduler.
//!
//! Callers admit deferred operations with a priority; the [`Scheduler`] runs
//! them in batches of at most `max`, highest priority first, and collects the
//! results into one aggregate outcome per run.

pub mod adapter;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod options;
pub mod pending;
pub mod runner;
pub mod state;
pub mod task;

pub use adapter::{looks_like_url, HttpAdapter, RequestConfig};
pub use error::{SchedulerError, TaskError};
pub use handle::{RunHandle, RunOutcome, RunResolver};
pub use metrics::QueueMetrics;
pub use options::{Callback, QueueOptions};
pub use pending::PendingSet;
pub use runner::Scheduler;
pub use state::{SchedulerSnapshot, SchedulerState};
pub use task::{Deferred, Submission, Task, TaskFuture, TaskId, TaskTicket};
pub use taskq_core::QueueConfig;
