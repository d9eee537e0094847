//! Tokio runtime executor implementation.

use tokio::runtime::Handle;

use crate::core::{Job, SchedulerError, TaskExecutor};

/// Executor that runs allocator tasks on a Tokio runtime's blocking pool.
///
/// Allocator tasks take the scheduler lock and call client code
/// synchronously, so they go to `spawn_blocking` rather than the async workers.
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Create an executor from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create an executor on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// `Executor` when called outside of a tokio runtime.
    pub fn current() -> Result<Self, SchedulerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SchedulerError::Executor(format!("no tokio runtime: {e}")))
    }
}

impl TaskExecutor for TokioExecutor {
    fn spawn(&self, job: Job) -> Result<(), SchedulerError> {
        // Detached; cancellation goes through the task handle.
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}
