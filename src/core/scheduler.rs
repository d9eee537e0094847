//! Scheduler facade: the public claim/allocate/free API.
//!
//! Short, state-only operations (`claim`, `free`, `allocate_now`,
//! `may_allocate_now`) run synchronously under the global state lock.
//! Allocation decisions, which call out to modules and clients, are submitted
//! as [`AllocatorTask`]s to the task executor so callers never block on
//! another vehicle's allocation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, error, info};

use crate::core::{
    build_audit_event, AllocationAdvisor, AllocatorCommand, AllocatorTask, AuditSink, Client,
    ClientId, DummyClient, Module, PendingAllocationManager, ReservationPool, ResourceSet,
    SchedulerError, SharedClient, SharedModule, TaskExecutor, TaskHandle,
};

/// State guarded by the global lock.
#[derive(Debug, Default)]
pub(crate) struct SchedulerState {
    pub(crate) pool: ReservationPool,
    pub(crate) pending: PendingAllocationManager,
}

/// Shared internals of a [`Scheduler`], also driven by its tasks.
pub(crate) struct SchedulerCore {
    /// Global lock over the reservation pool, claims and pending requests.
    pub(crate) state: Mutex<SchedulerState>,
    /// Serializes allocation decisions. Never taken by synchronous facade calls.
    pub(crate) decision_lock: Mutex<()>,
    /// Held from a pool change until modules have been told about it, so
    /// module notifications arrive in pool order. Taken before `state`.
    /// Reentrant because module code may call back into the facade.
    pub(crate) module_lock: ReentrantMutex<()>,
    pub(crate) advisor: AllocationAdvisor,
    executor: Arc<dyn TaskExecutor>,
    dummy_client: SharedClient,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
    initialized: AtomicBool,
}

impl SchedulerCore {
    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Submit a task for `command`. The caller holds the state lock.
    pub(crate) fn submit_locked(
        self: &Arc<Self>,
        state: &mut SchedulerState,
        command: AllocatorCommand,
    ) -> Result<TaskHandle, SchedulerError> {
        let client_id = command.client().id().clone();
        let tracked = command.is_tracked();
        let generation = state.pending.generation(&client_id);
        let task = AllocatorTask::new(Arc::clone(self), command, generation);
        debug!(task = ?task, "submitting allocator task");
        let handle = self.executor.submit(Box::new(move || task.run()))?;
        if tracked {
            state.pending.add_allocation_future(&client_id, handle.clone());
        }
        Ok(handle)
    }

    pub(crate) fn submit(self: &Arc<Self>, command: AllocatorCommand) -> Result<TaskHandle, SchedulerError> {
        let mut state = self.state.lock();
        self.submit_locked(&mut state, command)
    }

    /// Schedule a sweep over all deferred allocations.
    pub(crate) fn schedule_retry(self: &Arc<Self>, originator: SharedClient) {
        if let Err(err) = self.submit(AllocatorCommand::RetryAllocates { client: originator }) {
            error!(error = %err, "could not schedule retry of deferred allocations");
        }
    }

    /// Tell modules what `client` holds and still claims.
    pub(crate) fn publish_allocation_state(&self, client: &dyn Client) {
        let _modules = self.module_lock.lock();
        let (allocated, claim) = {
            let state = self.state.lock();
            (
                state.pool.allocated_resources(client.id()),
                state.pool.claim_of(client.id()),
            )
        };
        self.advisor.set_allocation_state(client, &allocated, &claim);
    }

    pub(crate) fn record_audit(
        &self,
        client: &ClientId,
        action: &str,
        resources: &ResourceSet,
        detail: Option<String>,
    ) {
        if let Some(sink) = self.audit.lock().as_mut() {
            sink.record(build_audit_event(client, action, resources, detail));
        }
    }
}

/// Grants, tracks and revokes exclusive access to plant resources.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Scheduler {
    core: Arc<SchedulerCore>,
}

impl Scheduler {
    /// Create a scheduler running its tasks on `executor`, consulting `modules`.
    ///
    /// The scheduler must be [initialized](Self::initialize) before use.
    #[must_use]
    pub fn new(executor: Arc<dyn TaskExecutor>, modules: Vec<SharedModule>) -> Self {
        Self {
            core: Arc::new(SchedulerCore {
                state: Mutex::new(SchedulerState::default()),
                decision_lock: Mutex::new(()),
                module_lock: ReentrantMutex::new(()),
                advisor: AllocationAdvisor::new(modules),
                executor,
                dummy_client: Arc::new(DummyClient::new()),
                audit: Mutex::new(None),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        *self.core.audit.lock() = Some(audit);
        self
    }

    /// Reset all claims, reservations and pending work and start the modules.
    pub fn initialize(&self) {
        if self.core.initialized.load(Ordering::Acquire) {
            debug!("scheduler already initialized");
            return;
        }
        {
            let mut state = self.core.state.lock();
            state.pool.clear();
            state.pending.initialize();
        }
        self.core.advisor.initialize();
        self.core.initialized.store(true, Ordering::Release);
        info!(modules = self.core.advisor.modules().len(), "scheduler initialized");
    }

    /// Cancel pending work and stop the modules.
    pub fn terminate(&self) {
        if !self.core.initialized.swap(false, Ordering::AcqRel) {
            debug!("scheduler already terminated");
            return;
        }
        self.core.state.lock().pending.terminate();
        self.core.advisor.terminate();
        info!("scheduler terminated");
    }

    /// Whether the scheduler is initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }

    fn ensure_initialized(&self) -> Result<(), SchedulerError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SchedulerError::NotInitialized)
        }
    }

    /// Replace the client's claim with `claim` and notify modules.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the claim contains an empty set.
    pub fn claim(&self, client: &SharedClient, claim: Vec<ResourceSet>) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        if claim.iter().any(ResourceSet::is_empty) {
            return Err(SchedulerError::InvalidArgument(
                "claimed resource sets must not be empty".into(),
            ));
        }
        let summary: ResourceSet = claim.iter().flatten().cloned().collect();
        let _modules = self.core.module_lock.lock();
        self.core.state.lock().pool.set_claim(client.id(), claim);
        debug!(client = %client.id(), "claim replaced");
        self.core.record_audit(client.id(), "claim", &summary, None);
        self.core.publish_allocation_state(client.as_ref());
        Ok(())
    }

    /// Request the next claimed resource set. Returns immediately; the client
    /// is notified through `on_allocation` once the resources are granted.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty set, `ProtocolViolation` if `resources`
    /// is not the head of the client's claim.
    pub fn allocate(&self, client: &SharedClient, resources: ResourceSet) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        if resources.is_empty() {
            return Err(SchedulerError::InvalidArgument(
                "cannot allocate an empty resource set".into(),
            ));
        }
        let mut state = self.core.state.lock();
        if !state.pool.is_next_in_claim(client.id(), &resources) {
            return Err(SchedulerError::ProtocolViolation {
                client: client.id().clone(),
                reason: format!("{resources:?} is not the next claimed resource set"),
            });
        }
        self.core.submit_locked(
            &mut state,
            AllocatorCommand::Allocate {
                client: Arc::clone(client),
                resources,
            },
        )?;
        Ok(())
    }

    /// Whether `resources` are free or already held by `client`.
    ///
    /// Advisory only: no claim check, no module veto, no side effects.
    #[must_use]
    pub fn may_allocate_now(&self, client: &dyn Client, resources: &ResourceSet) -> bool {
        self.core
            .state
            .lock()
            .pool
            .resources_available_for_user(resources, client.id())
    }

    /// Allocate immediately, bypassing claims, deferral and module vetoes.
    ///
    /// # Errors
    ///
    /// `ResourceAllocation` if any resource is held by another client; no
    /// state changes in that case.
    pub fn allocate_now(&self, client: &SharedClient, resources: &ResourceSet) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        let _modules = self.core.module_lock.lock();
        self.core.state.lock().pool.allocate(client.id(), resources)?;
        info!(client = %client.id(), resources = ?resources, "allocated resources immediately");
        self.core.record_audit(client.id(), "allocate_now", resources, None);
        self.core.publish_allocation_state(client.as_ref());
        Ok(())
    }

    /// Release `resources` held by `client` and let waiting clients retry.
    ///
    /// Resources the client does not hold are skipped. If it holds none of
    /// them, nothing happens.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the scheduler is not running.
    pub fn free(&self, client: &SharedClient, resources: &ResourceSet) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        let _modules = self.core.module_lock.lock();
        let freed = self.core.state.lock().pool.free(client.id(), resources);
        self.after_free(client, &freed);
        Ok(())
    }

    /// Release everything `client` holds and drop its pending requests.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the scheduler is not running.
    pub fn free_all(&self, client: &SharedClient) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        let _modules = self.core.module_lock.lock();
        let freed = {
            let mut state = self.core.state.lock();
            let freed = state.pool.free_all(client.id());
            state.pending.clear_pending_allocations(client.id());
            freed
        };
        self.after_free(client, &freed);
        Ok(())
    }

    /// Runs with the module lock held.
    fn after_free(&self, client: &SharedClient, freed: &ResourceSet) {
        if freed.is_empty() {
            debug!(client = %client.id(), "nothing released");
            return;
        }
        info!(client = %client.id(), resources = ?freed, "released resources");
        self.core.record_audit(client.id(), "free", freed, None);
        AllocatorTask::new(
            Arc::clone(&self.core),
            AllocatorCommand::AllocationsReleased {
                client: Arc::clone(client),
                resources: freed.clone(),
            },
            0,
        )
        .run();
        self.core.publish_allocation_state(client.as_ref());
        self.core.schedule_retry(Arc::clone(client));
    }

    /// Cancel the client's queued and deferred requests; allocations stay.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the scheduler is not running.
    pub fn clear_pending_allocations(&self, client: &ClientId) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        self.core.state.lock().pending.clear_pending_allocations(client);
        Ok(())
    }

    /// Re-attempt all deferred allocations, e.g. after external conditions changed.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the scheduler is not running, `Executor` if the
    /// sweep could not be submitted.
    pub fn reschedule(&self) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        self.core.submit(AllocatorCommand::RetryAllocates {
            client: Arc::clone(&self.core.dummy_client),
        })?;
        Ok(())
    }

    /// Called by a module once its preparation for an allocation completed.
    ///
    /// If `resources` are already committed to `client`, the prepared check
    /// is re-run. Otherwise the module was holding back a deferred request,
    /// so a retry sweep is scheduled instead.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the scheduler is not running, `Executor` if the
    /// follow-up task could not be submitted.
    pub fn preparation_successful(
        &self,
        module: &dyn Module,
        client: &SharedClient,
        resources: ResourceSet,
    ) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        debug!(
            module = module.name(),
            client = %client.id(),
            resources = ?resources,
            "module finished preparation"
        );
        let mut state = self.core.state.lock();
        let committed = resources.is_subset(&state.pool.allocated_resources(client.id()));
        let command = if committed {
            AllocatorCommand::CheckAllocationsPrepared {
                client: Arc::clone(client),
                resources,
            }
        } else {
            AllocatorCommand::RetryAllocates {
                client: Arc::clone(client),
            }
        };
        self.core.submit_locked(&mut state, command)?;
        Ok(())
    }

    /// Resources held per client.
    #[must_use]
    pub fn allocations(&self) -> BTreeMap<ClientId, ResourceSet> {
        self.core.state.lock().pool.allocations()
    }

    /// Resources held by `client`.
    #[must_use]
    pub fn allocated_resources(&self, client: &ClientId) -> ResourceSet {
        self.core.state.lock().pool.allocated_resources(client)
    }

    /// The client's remaining claim, head first.
    #[must_use]
    pub fn claim_of(&self, client: &ClientId) -> Vec<ResourceSet> {
        self.core.state.lock().pool.claim_of(client)
    }

    /// Unfinished allocation tasks per client.
    #[must_use]
    pub fn pending_allocation_counts(&self) -> BTreeMap<ClientId, usize> {
        self.core.state.lock().pending.count_pending_allocation_futures()
    }

    /// Number of allocation requests waiting for a retry sweep.
    #[must_use]
    pub fn deferred_allocation_count(&self) -> usize {
        self.core.state.lock().pending.deferred_allocation_count()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("advisor", &self.core.advisor)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
