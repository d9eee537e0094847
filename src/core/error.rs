//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::{ClientId, ResourceSet};

/// Errors produced by scheduler components.
///
/// Contention is never an error: a request that cannot be granted yet is
/// deferred. These variants cover caller mistakes and setup failures.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// An argument was malformed, e.g. an empty resource set.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The caller broke the claim/allocate protocol.
    #[error("protocol violation by {client}: {reason}")]
    ProtocolViolation {
        /// Offending client.
        client: ClientId,
        /// What was violated.
        reason: String,
    },
    /// Immediate allocation failed because resources are held by another client.
    #[error("could not allocate {resources:?} for {client}: resources unavailable")]
    ResourceAllocation {
        /// Requesting client.
        client: ClientId,
        /// Requested resources.
        resources: ResourceSet,
    },
    /// The scheduler has not been initialized or was terminated.
    #[error("scheduler not initialized")]
    NotInitialized,
    /// Configuration could not be parsed or validated.
    #[error("config error: {0}")]
    Config(String),
    /// Executor could not be created or has shut down.
    #[error("executor error: {0}")]
    Executor(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
