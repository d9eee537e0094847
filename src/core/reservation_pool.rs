//! Reservation bookkeeping: who holds which resource, and who claimed what next.
//!
//! The pool has no concurrency policy of its own. The scheduler keeps it
//! behind its global state lock and every method here assumes that lock is held.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, warn};

use crate::core::{ClientId, Resource, ResourceSet, SchedulerError};

/// Current holder of a single resource.
#[derive(Debug, Clone)]
pub struct ReservationEntry {
    resource: Resource,
    holder: Option<ClientId>,
}

impl ReservationEntry {
    fn new(resource: Resource) -> Self {
        Self {
            resource,
            holder: None,
        }
    }

    /// The resource this entry tracks.
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Client currently holding the resource.
    #[must_use]
    pub const fn holder(&self) -> Option<&ClientId> {
        self.holder.as_ref()
    }

    /// Whether nobody holds the resource.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.holder.is_none()
    }

    /// Whether `client` holds the resource.
    #[must_use]
    pub fn is_held_by(&self, client: &ClientId) -> bool {
        self.holder.as_ref() == Some(client)
    }

    /// Whether `client` may take the resource: it is free or already theirs.
    #[must_use]
    pub fn is_available_for(&self, client: &ClientId) -> bool {
        self.holder.as_ref().is_none_or(|holder| holder == client)
    }

    fn allocate(&mut self, client: &ClientId) {
        self.holder = Some(client.clone());
    }

    fn free(&mut self) {
        self.holder = None;
    }
}

/// All reservation entries and all clients' claim sequences.
#[derive(Debug, Default)]
pub struct ReservationPool {
    entries: HashMap<Resource, ReservationEntry>,
    claims: HashMap<ClientId, VecDeque<ResourceSet>>,
}

impl ReservationPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `resource`, created on first reference.
    pub fn reservation_entry_for(&mut self, resource: &Resource) -> &mut ReservationEntry {
        self.entries
            .entry(resource.clone())
            .or_insert_with(|| ReservationEntry::new(resource.clone()))
    }

    /// Snapshot of the client's remaining claims, head first.
    #[must_use]
    pub fn claim_of(&self, client: &ClientId) -> Vec<ResourceSet> {
        self.claims
            .get(client)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Replace the client's claim sequence wholesale.
    pub fn set_claim(&mut self, client: &ClientId, claim: Vec<ResourceSet>) {
        if claim.is_empty() {
            self.claims.remove(client);
        } else {
            self.claims.insert(client.clone(), claim.into());
        }
    }

    /// Remove `resources` from the head of the client's claim.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` if `resources` is not the head of the claim.
    pub fn unclaim(&mut self, client: &ClientId, resources: &ResourceSet) -> Result<(), SchedulerError> {
        if !self.is_next_in_claim(client, resources) {
            return Err(SchedulerError::ProtocolViolation {
                client: client.clone(),
                reason: format!("{resources:?} is not the next claimed resource set"),
            });
        }
        if let Some(queue) = self.claims.get_mut(client) {
            queue.pop_front();
            if queue.is_empty() {
                self.claims.remove(client);
            }
        }
        Ok(())
    }

    /// Whether `resources` is the head of the client's claim.
    #[must_use]
    pub fn is_next_in_claim(&self, client: &ClientId, resources: &ResourceSet) -> bool {
        self.claims
            .get(client)
            .and_then(VecDeque::front)
            .is_some_and(|head| head == resources)
    }

    /// Whether every resource in the set is free or already held by `client`.
    #[must_use]
    pub fn resources_available_for_user(&self, resources: &ResourceSet, client: &ClientId) -> bool {
        resources.iter().all(|resource| {
            self.entries
                .get(resource)
                .is_none_or(|entry| entry.is_available_for(client))
        })
    }

    /// Mark every resource in the set as held by `client`.
    ///
    /// All-or-nothing: nothing changes if any resource is held by someone else.
    ///
    /// # Errors
    ///
    /// `ResourceAllocation` if a resource is held by another client.
    pub fn allocate(&mut self, client: &ClientId, resources: &ResourceSet) -> Result<(), SchedulerError> {
        if !self.resources_available_for_user(resources, client) {
            return Err(SchedulerError::ResourceAllocation {
                client: client.clone(),
                resources: resources.clone(),
            });
        }
        for resource in resources {
            self.reservation_entry_for(resource).allocate(client);
        }
        Ok(())
    }

    /// Resources currently held by `client`.
    #[must_use]
    pub fn allocated_resources(&self, client: &ClientId) -> ResourceSet {
        self.entries
            .values()
            .filter(|entry| entry.is_held_by(client))
            .map(|entry| entry.resource.clone())
            .collect()
    }

    /// Release the resources of the set that `client` actually holds.
    ///
    /// Resources held by nobody or by another client are skipped with a
    /// warning. Returns the resources that were released.
    pub fn free(&mut self, client: &ClientId, resources: &ResourceSet) -> ResourceSet {
        let mut freed = ResourceSet::new();
        for resource in resources {
            match self.entries.get_mut(resource) {
                Some(entry) if entry.is_held_by(client) => {
                    entry.free();
                    freed.insert(resource.clone());
                }
                Some(entry) => {
                    warn!(
                        client = %client,
                        resource = %resource,
                        holder = ?entry.holder(),
                        "not freeing resource not held by client"
                    );
                }
                None => {
                    warn!(client = %client, resource = %resource, "not freeing unknown resource");
                }
            }
        }
        debug!(client = %client, freed = ?freed, "freed resources");
        freed
    }

    /// Release everything `client` holds. Returns the released resources.
    pub fn free_all(&mut self, client: &ClientId) -> ResourceSet {
        let mut freed = ResourceSet::new();
        for entry in self.entries.values_mut() {
            if entry.is_held_by(client) {
                entry.free();
                freed.insert(entry.resource.clone());
            }
        }
        debug!(client = %client, freed = ?freed, "freed all resources");
        freed
    }

    /// Resources held per client.
    #[must_use]
    pub fn allocations(&self) -> BTreeMap<ClientId, ResourceSet> {
        let mut result: BTreeMap<ClientId, ResourceSet> = BTreeMap::new();
        for entry in self.entries.values() {
            if let Some(holder) = &entry.holder {
                result
                    .entry(holder.clone())
                    .or_default()
                    .insert(entry.resource.clone());
            }
        }
        result
    }

    /// Drop all claims and reservations.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.claims.clear();
    }
}
