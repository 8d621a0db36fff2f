use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use futures::future::try_join_all;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::error::TaskError;

use crate::options::Callback;
use crate::state::AfterBatch;
use crate::task::Task;

use super::Scheduler;

impl<T> Scheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(super) fn spawn_dispatch(&self, epoch: u64) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.dispatch(epoch).await;
        });
    }

    /// The batch loop. One loop is alive per epoch; a stopped scheduler
    /// bumps the epoch and the loop exits at its next step.
    async fn dispatch(&self, epoch: u64) {
        loop {
            let batch = {
                let mut inner = self.lock();
                let max = inner.settings.max();
                match inner.run.pull_batch(epoch, max) {
                    Some(batch) => batch,
                    None => return,
                }
            };

            let size = batch.len();
            let started = Instant::now();
            let futures: Vec<_> = batch.into_iter().map(Task::invoke).collect();

            let joined = AssertUnwindSafe(try_join_all(futures))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(&*payload))));

            let results = match joined {
                Ok(results) => results,
                Err(error) => {
                    let mut inner = self.lock();
                    if inner.run.fail_batch(epoch, error.clone()) {
                        inner.metrics.record_failure();
                        warn!(error = %error, batch = size, "batch failed, run abandoned");
                    }
                    return;
                }
            };

            let cb = {
                let mut inner = self.lock();
                if !inner.run.settle_batch(epoch, results.clone()) {
                    debug!(batch = size, "discarding batch from a stopped run");
                    return;
                }
                let elapsed = started.elapsed();
                inner.metrics.record_batch(size, elapsed);
                debug!(batch = size, elapsed_ms = elapsed.as_millis() as u64, "batch settled");
                inner.settings.cb.clone()
            };

            if let Some(cb) = cb {
                self.notify(&cb, &results);
            }

            let interval = {
                let mut inner = self.lock();
                match inner.run.after_batch(epoch) {
                    AfterBatch::Continue => inner.settings.interval(),
                    AfterBatch::Paused | AfterBatch::Finished | AfterBatch::Stale => return,
                }
            };

            if interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(interval).await;
            }

            if !self.lock().run.after_delay(epoch) {
                return;
            }
        }
    }

    /// Run the progress callback without the lock held. A panic is logged
    /// and the run carries on.
    fn notify(&self, cb: &Callback<T>, results: &[T]) {
        let outcome = catch_unwind(AssertUnwindSafe(|| cb(results, self)));
        if outcome.is_err() {
            warn!(batch = results.len(), "progress callback panicked");
            self.lock().metrics.callback_panics += 1;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
