//! Task executor abstraction and cancellable task handles.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::core::SchedulerError;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Submitted, not started.
    Pending,
    /// Currently executing.
    Running,
    /// Ran to completion (or panicked).
    Finished,
    /// Cancelled before it started; it will never run.
    Cancelled,
}

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const CANCELLED: u8 = 3;

/// Handle to a submitted job.
///
/// Cancelling prevents a job that has not started from ever running. A job
/// that is already running is not interrupted.
#[derive(Clone)]
pub struct TaskHandle {
    id: Uuid,
    state: Arc<AtomicU8>,
}

impl TaskHandle {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(AtomicU8::new(PENDING)),
        }
    }

    /// Correlation id of the job, used in logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        match self.state.load(Ordering::Acquire) {
            PENDING => TaskState::Pending,
            RUNNING => TaskState::Running,
            CANCELLED => TaskState::Cancelled,
            _ => TaskState::Finished,
        }
    }

    /// Cancel the job if it has not started. Returns whether it was cancelled.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the job finished or was cancelled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state(), TaskState::Finished | TaskState::Cancelled)
    }

    /// Whether the job was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    fn begin(&self) -> bool {
        self.state
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Marks the handle finished even if the job panics.
struct FinishOnDrop(TaskHandle);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.state.store(FINISHED, Ordering::Release);
    }
}

/// Facility that runs submitted jobs asynchronously.
///
/// `spawn` must not run the job on the caller's thread: the scheduler submits
/// follow-up work while holding its state lock, and the job takes that lock.
pub trait TaskExecutor: Send + Sync + 'static {
    /// Queue a job for asynchronous execution.
    ///
    /// # Errors
    ///
    /// `Executor` if the executor no longer accepts work.
    fn spawn(&self, job: Job) -> Result<(), SchedulerError>;

    /// Queue a job and return a handle that can cancel it before it starts.
    ///
    /// # Errors
    ///
    /// `Executor` if the executor no longer accepts work.
    fn submit(&self, job: Job) -> Result<TaskHandle, SchedulerError> {
        let handle = TaskHandle::new();
        let guard = handle.clone();
        self.spawn(Box::new(move || {
            if guard.begin() {
                let _finish = FinishOnDrop(guard);
                job();
            }
        }))?;
        Ok(handle)
    }
}
