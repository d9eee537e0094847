//! Pluggable allocation policies and the advisor that chains them.
//!
//! A [`Module`] can veto allocations, ask for preparation time before a grant
//! is handed to the client, and observe allocation state changes. Orthogonal
//! policies (blocks, traffic lights, energy checks) plug in here without the
//! allocator knowing about them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::core::{Client, ResourceSet};

/// A policy hook participating in allocation decisions.
///
/// Every method may be called from any executor thread. Implementations
/// synchronize their own state. Invocation order among modules is unspecified.
pub trait Module: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Prepare the module for use.
    fn initialize(&self) {}

    /// Release the module's state.
    fn terminate(&self) {}

    /// Whether the module is ready.
    fn is_initialized(&self) -> bool {
        true
    }

    /// Veto gate evaluated before an allocation is committed.
    fn may_allocate(&self, _client: &dyn Client, _resources: &ResourceSet) -> bool {
        true
    }

    /// Start any preparation needed before the allocation is considered ready.
    ///
    /// Modules that finish asynchronously report back through
    /// `Scheduler::preparation_successful`.
    fn prepare_allocation(&self, _client: &dyn Client, _resources: &ResourceSet) {}

    /// Whether preparation for the allocation is complete.
    fn has_prepared_allocation(&self, _client: &dyn Client, _resources: &ResourceSet) -> bool {
        true
    }

    /// Resources held by `client` have been released.
    fn allocation_released(&self, _client: &dyn Client, _resources: &ResourceSet) {}

    /// The client's allocation state changed.
    fn set_allocation_state(
        &self,
        _client: &dyn Client,
        _allocated: &ResourceSet,
        _remaining_claim: &[ResourceSet],
    ) {
    }
}

/// Shared handle to a module.
pub type SharedModule = Arc<dyn Module>;

/// Runs every registered module and combines their answers with logical AND.
///
/// The advisor is itself a [`Module`], so chains nest and test uniformly.
pub struct AllocationAdvisor {
    modules: Vec<SharedModule>,
    initialized: AtomicBool,
}

impl AllocationAdvisor {
    /// Create an advisor over the given modules.
    #[must_use]
    pub fn new(modules: Vec<SharedModule>) -> Self {
        Self {
            modules,
            initialized: AtomicBool::new(false),
        }
    }

    /// Registered modules.
    #[must_use]
    pub fn modules(&self) -> &[SharedModule] {
        &self.modules
    }
}

impl std::fmt::Debug for AllocationAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationAdvisor")
            .field(
                "modules",
                &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("initialized", &self.initialized.load(Ordering::Acquire))
            .finish()
    }
}

impl Module for AllocationAdvisor {
    fn name(&self) -> &str {
        "allocation-advisor"
    }

    fn initialize(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }
        for module in &self.modules {
            module.initialize();
        }
        debug!(modules = self.modules.len(), "allocation advisor initialized");
    }

    fn terminate(&self) {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return;
        }
        for module in &self.modules {
            module.terminate();
        }
        debug!("allocation advisor terminated");
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn may_allocate(&self, client: &dyn Client, resources: &ResourceSet) -> bool {
        // Every module is asked, even after a veto.
        self.modules.iter().fold(true, |permitted, module| {
            let answer = module.may_allocate(client, resources);
            if !answer {
                debug!(
                    module = module.name(),
                    client = %client.id(),
                    resources = ?resources,
                    "module vetoed allocation"
                );
            }
            permitted & answer
        })
    }

    fn prepare_allocation(&self, client: &dyn Client, resources: &ResourceSet) {
        for module in &self.modules {
            module.prepare_allocation(client, resources);
        }
    }

    fn has_prepared_allocation(&self, client: &dyn Client, resources: &ResourceSet) -> bool {
        self.modules.iter().fold(true, |prepared, module| {
            prepared & module.has_prepared_allocation(client, resources)
        })
    }

    fn allocation_released(&self, client: &dyn Client, resources: &ResourceSet) {
        for module in &self.modules {
            module.allocation_released(client, resources);
        }
    }

    fn set_allocation_state(
        &self,
        client: &dyn Client,
        allocated: &ResourceSet,
        remaining_claim: &[ResourceSet],
    ) {
        for module in &self.modules {
            module.set_allocation_state(client, allocated, remaining_claim);
        }
    }
}
