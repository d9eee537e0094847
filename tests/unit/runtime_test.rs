//! Tests for executor adapters

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fleet_scheduler::core::{TaskExecutor, TaskState};
use fleet_scheduler::runtime::{ManualExecutor, ThreadPoolExecutor};

#[test]
fn test_cancelled_job_never_runs() {
    let executor = ManualExecutor::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);

    let handle = executor
        .submit(Box::new(move || {
            c.fetch_add(1, Ordering::Relaxed);
        }))
        .unwrap();
    assert_eq!(handle.state(), TaskState::Pending);
    assert!(handle.cancel());
    executor.run_until_idle();

    assert_eq!(counter.load(Ordering::Relaxed), 0);
    assert_eq!(handle.state(), TaskState::Cancelled);
    assert!(handle.is_done());
}

#[test]
fn test_finished_job_cannot_be_cancelled() {
    let executor = ManualExecutor::new();
    let handle = executor.submit(Box::new(|| {})).unwrap();
    executor.run_until_idle();

    assert_eq!(handle.state(), TaskState::Finished);
    assert!(!handle.cancel());
}

#[test]
fn test_thread_pool_submit_reports_finished() {
    let executor = ThreadPoolExecutor::new(2).unwrap();
    let handles: Vec<_> = (0..8)
        .map(|_| executor.submit(Box::new(|| {})).unwrap())
        .collect();
    executor.shutdown();

    assert!(handles.iter().all(|h| h.state() == TaskState::Finished));
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_executor_runs_jobs() {
    use fleet_scheduler::runtime::TokioExecutor;

    let executor = TokioExecutor::current().unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel();
    executor
        .spawn(Box::new(move || {
            tx.send(123).unwrap();
        }))
        .unwrap();

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}
