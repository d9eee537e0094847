//! Single-vehicle blocks.
//!
//! A block is a named group of resources (e.g. a narrow corridor or a
//! crossing) that only one client may occupy at a time. While any client
//! holds a resource of the block, allocations of the block's resources to
//! other clients are vetoed and stay deferred.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::core::{Client, ClientId, Module, ResourceSet};

/// A named group of resources that only one client may occupy at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    name: String,
    resources: ResourceSet,
}

impl Block {
    /// Create a block.
    pub fn new(name: impl Into<String>, resources: ResourceSet) -> Self {
        Self {
            name: name.into(),
            resources,
        }
    }

    /// Block name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member resources.
    #[must_use]
    pub const fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    fn intersects(&self, resources: &ResourceSet) -> bool {
        !self.resources.is_disjoint(resources)
    }

    fn members_of(&self, resources: &ResourceSet) -> ResourceSet {
        self.resources.intersection(resources).cloned().collect()
    }
}

type Holdings = HashMap<ClientId, ResourceSet>;

/// Vetoes allocations that would put a second client into an occupied block.
pub struct BlockModule {
    blocks: Vec<Block>,
    holders: Mutex<HashMap<String, Holdings>>,
    initialized: AtomicBool,
}

impl BlockModule {
    /// Create a module enforcing the given blocks.
    #[must_use]
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            holders: Mutex::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Configured blocks.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Clients currently holding resources in the named block.
    #[must_use]
    pub fn occupants(&self, block: &str) -> Vec<ClientId> {
        let mut occupants: Vec<ClientId> = self
            .holders
            .lock()
            .get(block)
            .map(|holdings| holdings.keys().cloned().collect())
            .unwrap_or_default();
        occupants.sort();
        occupants
    }

    fn update_holding(holdings: &mut Holdings, client: &ClientId, held: ResourceSet) {
        if held.is_empty() {
            holdings.remove(client);
        } else {
            holdings.insert(client.clone(), held);
        }
    }
}

impl Module for BlockModule {
    fn name(&self) -> &str {
        "single-vehicle-blocks"
    }

    fn initialize(&self) {
        self.holders.lock().clear();
        self.initialized.store(true, Ordering::Release);
    }

    fn terminate(&self) {
        self.holders.lock().clear();
        self.initialized.store(false, Ordering::Release);
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn may_allocate(&self, client: &dyn Client, resources: &ResourceSet) -> bool {
        let holders = self.holders.lock();
        for block in self.blocks.iter().filter(|b| b.intersects(resources)) {
            let occupied_by_other = holders
                .get(&block.name)
                .is_some_and(|holdings| holdings.keys().any(|holder| holder != client.id()));
            if occupied_by_other {
                debug!(block = %block.name, client = %client.id(), "block occupied by another client");
                return false;
            }
        }
        true
    }

    fn prepare_allocation(&self, client: &dyn Client, resources: &ResourceSet) {
        let mut holders = self.holders.lock();
        for block in self.blocks.iter().filter(|b| b.intersects(resources)) {
            let holdings = holders.entry(block.name.clone()).or_default();
            holdings
                .entry(client.id().clone())
                .or_default()
                .extend(block.members_of(resources));
        }
    }

    fn allocation_released(&self, client: &dyn Client, resources: &ResourceSet) {
        let mut holders = self.holders.lock();
        for block in self.blocks.iter().filter(|b| b.intersects(resources)) {
            if let Some(holdings) = holders.get_mut(&block.name) {
                let remaining: ResourceSet = holdings
                    .get(client.id())
                    .map(|held| held.difference(resources).cloned().collect())
                    .unwrap_or_default();
                Self::update_holding(holdings, client.id(), remaining);
            }
        }
    }

    fn set_allocation_state(
        &self,
        client: &dyn Client,
        allocated: &ResourceSet,
        _remaining_claim: &[ResourceSet],
    ) {
        let mut holders = self.holders.lock();
        for block in &self.blocks {
            let holdings = holders.entry(block.name.clone()).or_default();
            Self::update_holding(holdings, client.id(), block.members_of(allocated));
        }
    }
}
