//! Resource consumers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::ResourceSet;

/// Stable identity of a resource consumer.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Arc<str>);

impl ClientId {
    /// Create a client identifier.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A consumer of plant resources, typically a vehicle controller.
///
/// Clients are owned by their own subsystem. The scheduler only calls into
/// them, and never while holding its state lock, so `on_allocation` may call
/// back into the scheduler (for example to free or allocate more).
pub trait Client: Send + Sync {
    /// Stable identifier of this client.
    fn id(&self) -> &ClientId;

    /// Name of the vehicle this client acts for, if any.
    fn related_vehicle(&self) -> Option<&str> {
        None
    }

    /// Called when `resources` have been granted.
    ///
    /// Returning `false` rejects the allocation: the resources are released
    /// again immediately and other waiting clients get a chance at them.
    fn on_allocation(&self, resources: &ResourceSet) -> bool;
}

/// Shared handle to a client.
pub type SharedClient = Arc<dyn Client>;

/// Reserved client used as the originator of internally triggered retry sweeps.
#[derive(Debug)]
pub struct DummyClient {
    id: ClientId,
}

impl DummyClient {
    /// Identifier reserved for the dummy client.
    pub const ID: &'static str = "__scheduler_dummy_client__";

    /// Create the dummy client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ClientId::new(Self::ID),
        }
    }
}

impl Default for DummyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Client for DummyClient {
    fn id(&self) -> &ClientId {
        &self.id
    }

    fn on_allocation(&self, _resources: &ResourceSet) -> bool {
        // Never claims anything, so a grant is always unexpected.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource_set;

    #[test]
    fn test_dummy_client_identity() {
        let dummy = DummyClient::new();
        assert_eq!(dummy.id().as_str(), DummyClient::ID);
        assert!(dummy.related_vehicle().is_none());
        assert!(!dummy.on_allocation(&resource_set(["P1"])));
    }

    #[test]
    fn test_client_id_display() {
        let id = ClientId::from("Vehicle-01");
        assert_eq!(id.to_string(), "Vehicle-01");
        assert_eq!(format!("{id:?}"), "Vehicle-01");
    }

    #[test]
    fn test_client_id_serde_as_plain_string() {
        let id = ClientId::new("Vehicle-02");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Vehicle-02\"");
        let back: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
