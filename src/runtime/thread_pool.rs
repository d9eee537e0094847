//! Executor backed by dedicated OS worker threads.
//!
//! Workers block on a channel receive; dropping the sender on shutdown
//! unblocks them and they exit. No polling.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::core::{Job, SchedulerError, TaskExecutor};

/// Runs jobs on a fixed set of named worker threads.
pub struct ThreadPoolExecutor {
    /// Job sender. `None` once shut down.
    job_tx: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    worker_count: usize,
}

impl ThreadPoolExecutor {
    /// Start `worker_count` worker threads.
    ///
    /// # Errors
    ///
    /// `Executor` if `worker_count` is zero or a thread cannot be spawned.
    pub fn new(worker_count: usize) -> Result<Self, SchedulerError> {
        if worker_count == 0 {
            return Err(SchedulerError::Executor(
                "worker_count must be greater than 0".into(),
            ));
        }
        let (job_tx, job_rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            workers.push(spawn_worker(worker_id, job_rx.clone())?);
        }
        info!(worker_count, "thread pool executor started");
        Ok(Self {
            job_tx: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            shutdown: AtomicBool::new(false),
            worker_count,
        })
    }

    /// Start one worker per available CPU.
    ///
    /// # Errors
    ///
    /// `Executor` if a thread cannot be spawned.
    pub fn with_default_workers() -> Result<Self, SchedulerError> {
        Self::new(num_cpus::get().max(1))
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Stop accepting jobs, let workers drain the queue and join them.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.job_tx.lock() = None;
        let mut workers = self.workers.lock();
        for (idx, worker) in workers.drain(..).enumerate() {
            if worker.join().is_err() {
                warn!(worker_id = idx, "worker thread panicked");
            }
        }
        info!(worker_count = self.worker_count, "thread pool executor shut down");
    }
}

impl TaskExecutor for ThreadPoolExecutor {
    fn spawn(&self, job: Job) -> Result<(), SchedulerError> {
        let guard = self.job_tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(SchedulerError::Executor("executor has been shut down".into()));
        };
        tx.send(job)
            .map_err(|_| SchedulerError::Executor("worker channel closed".into()))
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        // Don't join here: the last reference may be dropped on a worker thread.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            *self.job_tx.lock() = None;
            debug!("thread pool executor dropped without explicit shutdown - workers will be detached");
        }
    }
}

impl std::fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolExecutor")
            .field("worker_count", &self.worker_count)
            .field("shutdown", &self.shutdown.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

fn spawn_worker(worker_id: usize, job_rx: Receiver<Job>) -> Result<JoinHandle<()>, SchedulerError> {
    thread::Builder::new()
        .name(format!("sched-worker-{worker_id}"))
        .spawn(move || {
            debug!(worker_id, "worker thread started");
            while let Ok(job) = job_rx.recv() {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!(worker_id, "job panicked");
                }
            }
            debug!(worker_id, "worker thread exiting");
        })
        .map_err(|e| SchedulerError::Executor(format!("failed to spawn worker thread: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(ThreadPoolExecutor::new(0).is_err());
    }

    #[test]
    fn test_jobs_run_before_shutdown_completes() {
        let executor = ThreadPoolExecutor::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let c = Arc::clone(&counter);
            executor
                .spawn(Box::new(move || {
                    c.fetch_add(1, Ordering::Relaxed);
                }))
                .unwrap();
        }
        executor.shutdown();
        assert_eq!(counter.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let executor = ThreadPoolExecutor::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        executor.spawn(Box::new(|| panic!("boom"))).unwrap();
        let c = Arc::clone(&counter);
        executor
            .spawn(Box::new(move || {
                c.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();
        executor.shutdown();
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_spawn_after_shutdown_fails() {
        let executor = ThreadPoolExecutor::new(1).unwrap();
        executor.shutdown();
        assert!(executor.spawn(Box::new(|| {})).is_err());
    }
}
