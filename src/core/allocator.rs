//! Allocator commands and the task that executes them against the pool.
//!
//! One [`AllocatorTask`] processes one [`AllocatorCommand`]. Decisions and
//! retry sweeps are serialized by the scheduler's decision lock, so a sweep
//! never runs between a veto and the deferral it causes. The state lock is
//! taken only for short critical sections and never held while calling into
//! clients or modules.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::scheduler::SchedulerCore;
use crate::core::{Client, Module, ResourceSet, SharedClient};

/// A unit of allocator work.
#[derive(Clone)]
pub enum AllocatorCommand {
    /// Try to grant `resources` to `client`.
    Allocate {
        /// Requesting client.
        client: SharedClient,
        /// Resources to grant; must be the head of the client's claim.
        resources: ResourceSet,
    },
    /// Re-attempt every deferred allocation, system-wide.
    RetryAllocates {
        /// Nominal originator, used for logging only.
        client: SharedClient,
    },
    /// Re-poll module preparation for an allocation already committed.
    CheckAllocationsPrepared {
        /// Client holding the resources.
        client: SharedClient,
        /// The committed resources.
        resources: ResourceSet,
    },
    /// Tell modules that resources were released.
    AllocationsReleased {
        /// Client that released the resources.
        client: SharedClient,
        /// The released resources.
        resources: ResourceSet,
    },
}

impl AllocatorCommand {
    /// The client this command acts for.
    #[must_use]
    pub fn client(&self) -> &SharedClient {
        match self {
            Self::Allocate { client, .. }
            | Self::RetryAllocates { client }
            | Self::CheckAllocationsPrepared { client, .. }
            | Self::AllocationsReleased { client, .. } => client,
        }
    }

    /// The resources this command concerns, if any.
    #[must_use]
    pub const fn resources(&self) -> Option<&ResourceSet> {
        match self {
            Self::Allocate { resources, .. }
            | Self::CheckAllocationsPrepared { resources, .. }
            | Self::AllocationsReleased { resources, .. } => Some(resources),
            Self::RetryAllocates { .. } => None,
        }
    }

    /// Short name of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Allocate { .. } => "allocate",
            Self::RetryAllocates { .. } => "retry_allocates",
            Self::CheckAllocationsPrepared { .. } => "check_allocations_prepared",
            Self::AllocationsReleased { .. } => "allocations_released",
        }
    }

    /// Whether task handles for this command are tracked per client, so that
    /// clearing the client's pending allocations cancels them.
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        matches!(
            self,
            Self::Allocate { .. } | Self::CheckAllocationsPrepared { .. }
        )
    }
}

impl fmt::Debug for AllocatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.kind());
        s.field("client", self.client().id());
        if let Some(resources) = self.resources() {
            s.field("resources", resources);
        }
        s.finish()
    }
}

/// Executes one [`AllocatorCommand`] against the scheduler state.
pub struct AllocatorTask {
    core: Arc<SchedulerCore>,
    command: AllocatorCommand,
    generation: u64,
}

impl AllocatorTask {
    /// `generation` is the client's pending-request generation at submission;
    /// a task from an older generation was cleared and must not take effect.
    pub(crate) const fn new(core: Arc<SchedulerCore>, command: AllocatorCommand, generation: u64) -> Self {
        Self {
            core,
            command,
            generation,
        }
    }

    /// The command this task executes.
    #[must_use]
    pub const fn command(&self) -> &AllocatorCommand {
        &self.command
    }

    /// Execute the command.
    pub fn run(self) {
        if !self.core.is_initialized() {
            debug!(command = ?self.command, "scheduler not initialized, dropping task");
            return;
        }
        match &self.command {
            AllocatorCommand::Allocate { client, resources } => {
                let _decision = self.core.decision_lock.lock();
                self.allocate(client, resources);
            }
            AllocatorCommand::RetryAllocates { client } => {
                let _decision = self.core.decision_lock.lock();
                self.retry_allocates(client.as_ref());
            }
            AllocatorCommand::CheckAllocationsPrepared { client, resources } => {
                let _decision = self.core.decision_lock.lock();
                self.check_allocations_prepared(client, resources);
            }
            AllocatorCommand::AllocationsReleased { client, resources } => {
                self.core.advisor.allocation_released(client.as_ref(), resources);
            }
        }
    }

    fn allocate(&self, client: &SharedClient, resources: &ResourceSet) {
        let id = client.id();
        {
            let mut state = self.core.state.lock();
            if state.pending.generation(id) != self.generation {
                debug!(client = %id, resources = ?resources, "allocation request was cleared");
                return;
            }
            if !state.pool.is_next_in_claim(id, resources) {
                warn!(client = %id, resources = ?resources, "not allocating: resources are not next in claim");
                return;
            }
            if !state.pool.resources_available_for_user(resources, id) {
                debug!(client = %id, resources = ?resources, "resources unavailable, deferring allocation");
                state.pending.add_deferred_allocation(self.command.clone());
                drop(state);
                self.core.record_audit(id, "defer", resources, Some("resources unavailable".into()));
                return;
            }
        }

        if !self.core.advisor.may_allocate(client.as_ref(), resources) {
            debug!(client = %id, resources = ?resources, "allocation vetoed, deferring");
            self.defer();
            self.core.record_audit(id, "defer", resources, Some("vetoed by module".into()));
            return;
        }

        // Synchronous facade calls may have changed the pool since the checks above.
        let modules = self.core.module_lock.lock();
        {
            let mut state = self.core.state.lock();
            if state.pending.generation(id) != self.generation {
                debug!(client = %id, resources = ?resources, "allocation request was cleared");
                return;
            }
            if !state.pool.is_next_in_claim(id, resources) {
                warn!(client = %id, resources = ?resources, "claim changed, dropping allocation");
                return;
            }
            if state.pool.allocate(id, resources).is_err() {
                debug!(client = %id, resources = ?resources, "resources taken meanwhile, deferring allocation");
                state.pending.add_deferred_allocation(self.command.clone());
                return;
            }
            if let Err(err) = state.pool.unclaim(id, resources) {
                warn!(client = %id, error = %err, "unclaim after allocation failed");
            }
        }
        info!(client = %id, resources = ?resources, "allocated resources");
        self.core.record_audit(id, "grant", resources, None);

        self.core.advisor.prepare_allocation(client.as_ref(), resources);
        drop(modules);
        self.check_allocations_prepared(client, resources);
    }

    fn defer(&self) {
        let mut state = self.core.state.lock();
        if state.pending.generation(self.command.client().id()) == self.generation {
            state.pending.add_deferred_allocation(self.command.clone());
        }
    }

    fn check_allocations_prepared(&self, client: &SharedClient, resources: &ResourceSet) {
        let id = client.id();
        if !self.core.advisor.has_prepared_allocation(client.as_ref(), resources) {
            debug!(client = %id, resources = ?resources, "allocation not prepared yet");
            return;
        }
        {
            let state = self.core.state.lock();
            let held = state.pool.allocated_resources(id);
            if !resources.is_subset(&held) {
                debug!(client = %id, resources = ?resources, "resources no longer held, skipping notification");
                return;
            }
        }

        if !client.on_allocation(resources) {
            warn!(client = %id, resources = ?resources, "client rejected allocation, releasing resources");
            let _modules = self.core.module_lock.lock();
            let freed = self.core.state.lock().pool.free(id, resources);
            self.core.advisor.allocation_released(client.as_ref(), &freed);
            self.core.record_audit(id, "reject", &freed, None);
            self.core.schedule_retry(Arc::clone(client));
        }
        self.core.publish_allocation_state(client.as_ref());
    }

    fn retry_allocates(&self, originator: &dyn Client) {
        let mut state = self.core.state.lock();
        let deferred = state.pending.drain_deferred_allocations();
        debug!(
            originator = %originator.id(),
            count = deferred.len(),
            "retrying deferred allocations"
        );
        for command in deferred {
            // Submitted under the state lock so a concurrent clear cancels it.
            if let Err(err) = self.core.submit_locked(&mut state, command) {
                warn!(error = %err, "could not resubmit deferred allocation");
            }
        }
    }
}

impl fmt::Debug for AllocatorTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocatorTask")
            .field("command", &self.command)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
