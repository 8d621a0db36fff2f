//! Run handles.
//!
//! A [`RunHandle`] is the aggregate outcome of one run. It is cloneable and
//! every clone settles with the same value. The paired [`RunResolver`] is held
//! by the scheduler; dropping it unsent settles the handle with
//! [`SchedulerError::Abandoned`].

use std::future::IntoFuture;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::SchedulerError;

/// Result of a run: all results accumulated so far, or the first batch failure.
pub type RunOutcome<T> = Result<Vec<T>, SchedulerError>;

#[derive(Clone)]
pub struct RunHandle<T> {
    inner: Shared<BoxFuture<'static, RunOutcome<T>>>,
}

impl<T> RunHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an unsettled handle and the resolver that settles it.
    pub fn channel() -> (RunResolver<T>, RunHandle<T>) {
        let (tx, rx) = oneshot::channel();
        let inner = rx
            .map(|received| received.unwrap_or(Err(SchedulerError::Abandoned)))
            .boxed()
            .shared();
        (RunResolver { tx }, RunHandle { inner })
    }

    /// A handle that is already settled with `outcome`.
    pub fn ready(outcome: RunOutcome<T>) -> Self {
        let inner = futures::future::ready(outcome).boxed().shared();
        RunHandle { inner }
    }

    /// Wait for the run to settle.
    pub async fn wait(self) -> RunOutcome<T> {
        self.inner.await
    }
}

impl<T> IntoFuture for RunHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = RunOutcome<T>;
    type IntoFuture = Shared<BoxFuture<'static, RunOutcome<T>>>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner
    }
}

/// Settles exactly one [`RunHandle`].
pub struct RunResolver<T> {
    tx: oneshot::Sender<RunOutcome<T>>,
}

impl<T> RunResolver<T> {
    pub fn resolve(self, results: Vec<T>) {
        // Nobody holding the handle is fine.
        let _ = self.tx.send(Ok(results));
    }

    pub fn reject(self, error: SchedulerError) {
        let _ = self.tx.send(Err(error));
    }
}
