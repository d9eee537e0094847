//! Deferred allocation requests and in-flight task handles.
//!
//! Not synchronized: the scheduler keeps the manager behind the same state
//! lock as the reservation pool, so clearing a client's requests can never
//! race with a retry sweep draining them.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::debug;

use crate::core::{AllocatorCommand, ClientId, TaskHandle};

/// Tracks allocations that could not be granted yet, and the task handles
/// submitted on each client's behalf.
#[derive(Debug, Default)]
pub struct PendingAllocationManager {
    deferred: VecDeque<AllocatorCommand>,
    futures: HashMap<ClientId, Vec<TaskHandle>>,
    generations: HashMap<ClientId, u64>,
}

impl PendingAllocationManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all state, cancelling outstanding handles.
    pub fn initialize(&mut self) {
        self.reset();
    }

    /// Reset all state, cancelling outstanding handles.
    pub fn terminate(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        for handle in self.futures.values().flatten() {
            handle.cancel();
        }
        self.futures.clear();
        self.deferred.clear();
        self.generations.clear();
    }

    /// Park an allocation request until the next retry sweep.
    pub fn add_deferred_allocation(&mut self, command: AllocatorCommand) {
        debug!(command = ?command, "deferring allocation");
        self.deferred.push_back(command);
    }

    /// Empty the deferred queue, returning its former contents in order.
    pub fn drain_deferred_allocations(&mut self) -> Vec<AllocatorCommand> {
        self.deferred.drain(..).collect()
    }

    /// Number of parked allocation requests.
    #[must_use]
    pub fn deferred_allocation_count(&self) -> usize {
        self.deferred.len()
    }

    /// Current request generation of `client`; bumped whenever its pending
    /// allocations are cleared, invalidating tasks that were already running.
    #[must_use]
    pub fn generation(&self, client: &ClientId) -> u64 {
        self.generations.get(client).copied().unwrap_or(0)
    }

    /// Track a task submitted for `client`, pruning handles that are done.
    ///
    /// Clients left without live handles are forgotten, generation included:
    /// every task that compares generations is tracked while it can still run.
    /// The generation of `client` itself is kept, its new task captured it.
    pub fn add_allocation_future(&mut self, client: &ClientId, handle: TaskHandle) {
        self.futures.retain(|_, handles| {
            handles.retain(|h| !h.is_done());
            !handles.is_empty()
        });
        let futures = &self.futures;
        self.generations.retain(|id, _| id == client || futures.contains_key(id));
        self.futures.entry(client.clone()).or_default().push(handle);
    }

    /// Abandon everything pending for `client`.
    ///
    /// Cancels handles that have not started, drops the client's deferred
    /// requests and forgets finished handles. Current allocations are untouched.
    pub fn clear_pending_allocations(&mut self, client: &ClientId) {
        let mut cancelled = 0_usize;
        if let Some(handles) = self.futures.get_mut(client) {
            for handle in handles.iter() {
                if handle.cancel() {
                    cancelled += 1;
                }
            }
            handles.retain(|h| !h.is_done());
            if handles.is_empty() {
                self.futures.remove(client);
            }
        }
        *self.generations.entry(client.clone()).or_insert(0) += 1;
        let before = self.deferred.len();
        self.deferred.retain(|command| command.client().id() != client);
        debug!(
            client = %client,
            cancelled,
            dropped_deferred = before - self.deferred.len(),
            "cleared pending allocations"
        );
    }

    /// Number of unfinished task handles per client.
    #[must_use]
    pub fn count_pending_allocation_futures(&self) -> BTreeMap<ClientId, usize> {
        self.futures
            .iter()
            .map(|(client, handles)| (client.clone(), handles.iter().filter(|h| !h.is_done()).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{resource_set, Client, ResourceSet, SharedClient, TaskState};
    use std::sync::Arc;

    struct TestClient(ClientId);

    impl Client for TestClient {
        fn id(&self) -> &ClientId {
            &self.0
        }

        fn on_allocation(&self, _resources: &ResourceSet) -> bool {
            true
        }
    }

    fn client(id: &str) -> SharedClient {
        Arc::new(TestClient(ClientId::new(id)))
    }

    fn allocate(client: &SharedClient, name: &str) -> AllocatorCommand {
        AllocatorCommand::Allocate {
            client: Arc::clone(client),
            resources: resource_set([name]),
        }
    }

    #[test]
    fn test_drain_returns_fifo_and_empties() {
        let v1 = client("V1");
        let mut manager = PendingAllocationManager::new();
        manager.add_deferred_allocation(allocate(&v1, "P1"));
        manager.add_deferred_allocation(allocate(&v1, "P2"));

        let drained = manager.drain_deferred_allocations();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].resources(), Some(&resource_set(["P1"])));
        assert_eq!(manager.deferred_allocation_count(), 0);
        assert!(manager.drain_deferred_allocations().is_empty());
    }

    #[test]
    fn test_clear_only_affects_given_client() {
        let v1 = client("V1");
        let v2 = client("V2");
        let mut manager = PendingAllocationManager::new();
        manager.add_deferred_allocation(allocate(&v1, "P1"));
        manager.add_deferred_allocation(allocate(&v2, "P2"));
        let h1 = TaskHandle::new();
        let h2 = TaskHandle::new();
        manager.add_allocation_future(v1.id(), h1.clone());
        manager.add_allocation_future(v2.id(), h2.clone());

        manager.clear_pending_allocations(v1.id());

        assert!(h1.is_cancelled());
        assert_eq!(h2.state(), TaskState::Pending);
        let remaining = manager.drain_deferred_allocations();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].client().id(), v2.id());
        let counts = manager.count_pending_allocation_futures();
        assert_eq!(counts.get(v2.id()), Some(&1));
        assert!(!counts.contains_key(v1.id()));
    }

    #[test]
    fn test_clear_bumps_generation_of_client_only() {
        let mut manager = PendingAllocationManager::new();
        let v1 = ClientId::new("V1");
        let v2 = ClientId::new("V2");
        assert_eq!(manager.generation(&v1), 0);
        manager.clear_pending_allocations(&v1);
        assert_eq!(manager.generation(&v1), 1);
        assert_eq!(manager.generation(&v2), 0);
    }

    #[test]
    fn test_add_future_prunes_done_handles() {
        let v1 = client("V1");
        let mut manager = PendingAllocationManager::new();
        let done = TaskHandle::new();
        done.cancel();
        manager.add_allocation_future(v1.id(), done);
        manager.add_allocation_future(v1.id(), TaskHandle::new());
        assert_eq!(manager.futures.get(v1.id()).map(Vec::len), Some(1));
    }

    #[test]
    fn test_add_future_forgets_idle_clients() {
        let v1 = client("V1");
        let v2 = client("V2");
        let v3 = client("V3");
        let mut manager = PendingAllocationManager::new();

        let finished = TaskHandle::new();
        manager.add_allocation_future(v2.id(), finished.clone());
        manager.clear_pending_allocations(v2.id());
        manager.clear_pending_allocations(v1.id());
        manager.add_allocation_future(v3.id(), TaskHandle::new());
        manager.clear_pending_allocations(v3.id());
        manager.add_allocation_future(v3.id(), TaskHandle::new());
        assert!(finished.is_cancelled());

        manager.add_allocation_future(v1.id(), TaskHandle::new());
        assert!(!manager.futures.contains_key(v2.id()));
        assert_eq!(manager.generation(v2.id()), 0);
        // The caller read V1's generation before handing over the handle.
        assert_eq!(manager.generation(v1.id()), 1);
        // V3 still has a live handle.
        assert_eq!(manager.generation(v3.id()), 1);
        assert_eq!(manager.futures.len(), 2);
    }

    #[test]
    fn test_terminate_cancels_and_is_idempotent() {
        let v1 = client("V1");
        let mut manager = PendingAllocationManager::new();
        let handle = TaskHandle::new();
        manager.add_allocation_future(v1.id(), handle.clone());
        manager.add_deferred_allocation(allocate(&v1, "P1"));

        manager.terminate();
        manager.terminate();
        assert!(handle.is_cancelled());
        assert_eq!(manager.deferred_allocation_count(), 0);
        assert!(manager.count_pending_allocation_futures().is_empty());

        manager.initialize();
        assert_eq!(manager.deferred_allocation_count(), 0);
    }
}
