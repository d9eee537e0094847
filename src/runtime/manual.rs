//! Deterministic executor driven by the caller.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::{Job, SchedulerError, TaskExecutor};

/// Queues jobs until the caller runs them.
///
/// Used for simulations and tests that need to observe the scheduler between
/// task executions.
#[derive(Default)]
pub struct ManualExecutor {
    jobs: Mutex<VecDeque<Job>>,
}

impl ManualExecutor {
    /// Create an empty executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued jobs.
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Run the jobs queued right now; jobs they submit stay queued.
    /// Returns the number of jobs run.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<Job> = self.jobs.lock().drain(..).collect();
        let count = batch.len();
        for job in batch {
            job();
        }
        count
    }

    /// Run jobs until the queue is empty, including jobs submitted meanwhile.
    /// Returns the number of jobs run.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        loop {
            let Some(job) = self.jobs.lock().pop_front() else {
                return count;
            };
            job();
            count += 1;
        }
    }
}

impl TaskExecutor for ManualExecutor {
    fn spawn(&self, job: Job) -> Result<(), SchedulerError> {
        self.jobs.lock().push_back(job);
        Ok(())
    }
}

impl std::fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending_jobs", &self.pending_jobs())
            .finish()
    }
}
