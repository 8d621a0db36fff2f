//! Integration tests for the scheduler's public API.
//!
//! These drive admission, batch ordering, pause/continue, stop and failure
//! through `Scheduler` only. Task completion is gated with oneshot channels
//! so batch boundaries are deterministic.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::oneshot;
use tokio::time::timeout;

use taskq_queue::{
    Deferred, HttpAdapter, QueueConfig, QueueOptions, Scheduler, SchedulerError, SchedulerState,
    Submission, TaskError,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn scheduler(max: usize, interval_ms: u64) -> Scheduler<i64> {
    Scheduler::new(QueueConfig { interval_ms, max })
}

/// Record every batch handed to the progress callback.
fn record_batches(q: &Scheduler<i64>) -> Arc<Mutex<Vec<Vec<i64>>>> {
    let batches = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&batches);
    q.options(QueueOptions::new().callback(move |batch: &[i64], _: &Scheduler<i64>| {
        sink.lock().unwrap().push(batch.to_vec());
    }));
    batches
}

fn gated(value: i64) -> (oneshot::Sender<()>, Deferred<i64>) {
    let (tx, rx) = oneshot::channel::<()>();
    let op = Deferred::new(move || async move {
        let _ = rx.await;
        Ok(value)
    });
    (tx, op)
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    timeout(TIMEOUT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn nested_admission_flattens_fully() {
    let q = scheduler(1, 0);
    let nested: Submission<i64> = vec![
        Submission::from(Deferred::ready(1i64)),
        Submission::from(vec![vec![Deferred::ready(2i64), Deferred::ready(3i64)]]),
        Submission::Empty,
    ]
    .into();

    q.add(nested)
        .add(Option::<Deferred<i64>>::None)
        .add(vec![Some(Deferred::ready(4i64)), None]);

    assert_eq!(q.snapshot().pending.len(), 4);
    assert_eq!(q.state(), SchedulerState::Init);
}

#[tokio::test]
async fn priority_batches_two_then_one() {
    let q = scheduler(2, 0);
    let batches = record_batches(&q);

    for priority in [1i64, 5, 3] {
        q.add_with_priority(Deferred::ready(priority), priority);
    }
    q.run();

    let results = timeout(TIMEOUT, q.result()).await.unwrap().unwrap();
    assert_eq!(results, vec![5, 3, 1]);
    assert_eq!(*batches.lock().unwrap(), vec![vec![5, 3], vec![1]]);
    assert_eq!(q.state(), SchedulerState::Finished);
}

#[tokio::test]
async fn ties_run_in_admission_order() {
    let q = scheduler(3, 0);
    let batches = record_batches(&q);

    for value in 0..6i64 {
        let priority = if value >= 3 { 1 } else { 0 };
        q.add_with_priority(Deferred::ready(value), priority);
    }
    q.run();

    timeout(TIMEOUT, q.result()).await.unwrap().unwrap();
    assert_eq!(*batches.lock().unwrap(), vec![vec![3, 4, 5], vec![0, 1, 2]]);
}

#[tokio::test]
async fn pause_lets_in_flight_batch_finish_then_continue_drains() {
    let q = scheduler(2, 0);
    let (tx_a, a) = gated(10);
    let (tx_b, b) = gated(20);
    q.add_with_priority(vec![a, b], 9);
    q.add(vec![Deferred::ready(30i64), Deferred::ready(40i64), Deferred::ready(50i64)]);

    q.run();
    wait_until(|| q.snapshot().in_flight.len() == 2).await;

    q.pause();
    assert_eq!(q.state(), SchedulerState::Paused);
    tx_a.send(()).unwrap();
    tx_b.send(()).unwrap();

    let paused = timeout(TIMEOUT, q.result()).await.unwrap().unwrap();
    assert_eq!(paused, vec![10, 20]);
    assert_eq!(q.state(), SchedulerState::Paused);
    assert_eq!(q.snapshot().pending.len(), 3);

    // run() does not restart a paused scheduler.
    q.run();
    assert_eq!(q.snapshot().pending.len(), 3);

    q.resume();
    let resumed = timeout(TIMEOUT, q.result()).await.unwrap().unwrap();
    assert_eq!(resumed, vec![10, 20, 30, 40, 50]);
    assert_eq!(q.state(), SchedulerState::Finished);
}

#[tokio::test]
async fn continue_before_paused_batch_settles_keeps_one_loop() {
    let q = scheduler(1, 0);
    let batches = record_batches(&q);
    let (tx, gate) = gated(1);
    q.add_with_priority(gate, 1).add(Deferred::ready(2i64));

    q.run();
    wait_until(|| q.snapshot().in_flight.len() == 1).await;
    let handle = q.result();

    q.pause();
    q.resume();
    assert_eq!(q.state(), SchedulerState::Running);
    tx.send(()).unwrap();

    assert_eq!(timeout(TIMEOUT, handle).await.unwrap(), Ok(vec![1, 2]));
    assert_eq!(*batches.lock().unwrap(), vec![vec![1], vec![2]]);
}

#[tokio::test]
async fn stop_matches_a_fresh_scheduler() {
    let fresh = scheduler(2, 0);
    let q = scheduler(2, 0);
    q.add(vec![Deferred::ready(1i64), Deferred::ready(2i64), Deferred::ready(3i64)]);
    q.run();
    timeout(TIMEOUT, q.result()).await.unwrap().unwrap();

    q.stop();
    assert_eq!(q.snapshot(), fresh.snapshot());
    assert_eq!(q.result().await, Ok(Vec::new()));

    for q in [&q, &fresh] {
        q.add_with_priority(Deferred::ready(7i64), 1).add(Deferred::ready(8i64));
        q.run();
    }
    let a = timeout(TIMEOUT, q.result()).await.unwrap();
    let b = timeout(TIMEOUT, fresh.result()).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a, Ok(vec![7, 8]));
}

#[tokio::test]
async fn failure_in_first_batch_skips_second() {
    let q = scheduler(1, 0);
    let ran_second = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&ran_second);

    q.add_with_priority(
        Deferred::<i64>::failing(TaskError::Failed("upstream 500".into())),
        1,
    );
    q.add(Deferred::new(move || async move {
        *flag.lock().unwrap() = true;
        Ok(2i64)
    }));
    q.run();

    let outcome = timeout(TIMEOUT, q.result()).await.unwrap();
    assert_eq!(
        outcome,
        Err(SchedulerError::Task(TaskError::Failed("upstream 500".into())))
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!*ran_second.lock().unwrap());
    assert_eq!(q.snapshot().pending.len(), 1);
}

#[tokio::test]
async fn interval_separates_batches() {
    let q = scheduler(1, 30);
    q.add(vec![Deferred::ready(1i64), Deferred::ready(2i64), Deferred::ready(3i64)]);

    let started = Instant::now();
    q.run();
    let results = timeout(TIMEOUT, q.result()).await.unwrap().unwrap();

    assert_eq!(results, vec![1, 2, 3]);
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn pause_during_interval_takes_effect() {
    let q = scheduler(1, 100);
    q.add(vec![Deferred::ready(1i64), Deferred::ready(2i64)]);
    q.run();

    wait_until(|| q.snapshot().finished == 1).await;
    q.pause();

    let results = timeout(TIMEOUT, q.result()).await.unwrap().unwrap();
    assert_eq!(results, vec![1]);
    assert_eq!(q.state(), SchedulerState::Paused);
    assert_eq!(q.snapshot().pending.len(), 1);
}

#[tokio::test]
async fn rerun_after_finish_accumulates() {
    let q = scheduler(2, 0);
    q.add(Deferred::ready(1i64));
    q.run();
    assert_eq!(timeout(TIMEOUT, q.result()).await.unwrap(), Ok(vec![1]));

    q.add(Deferred::ready(2i64));
    q.run();
    assert_eq!(timeout(TIMEOUT, q.result()).await.unwrap(), Ok(vec![1, 2]));
}

#[tokio::test]
async fn json_passthrough_through_adapter() {
    let adapter = HttpAdapter::new();
    let q: Scheduler<serde_json::Value> = Scheduler::new(QueueConfig { interval_ms: 0, max: 2 });

    q.add(adapter.submission(json!(["alpha", 2, null, [{"k": "v"}]])));
    q.add_with_priority(adapter.submission(json!("first")), 10);
    assert_eq!(q.snapshot().pending.len(), 4);

    q.run();
    let results = timeout(TIMEOUT, q.result()).await.unwrap().unwrap();
    assert_eq!(results, vec![json!("first"), json!("alpha"), json!(2), json!({"k": "v"})]);
}
