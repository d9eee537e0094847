//! Allocatable plant resources.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An allocatable plant element (a point or a path segment), identified by name.
///
/// Resources are supplied by the plant model. The scheduler never creates or
/// destroys them; it only records who holds them. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource {
    name: Arc<str>,
}

impl Resource {
    /// Create a resource handle for the given plant element name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    /// Name of the plant element.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Resource {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Resource {
    fn from(name: String) -> Self {
        Self {
            name: Arc::from(name),
        }
    }
}

/// A set of resources requested, claimed or held together.
///
/// Ordered so that equality, hashing and log output are deterministic.
pub type ResourceSet = BTreeSet<Resource>;

/// Build a [`ResourceSet`] from resource names.
pub fn resource_set<I, S>(names: I) -> ResourceSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names.into_iter().map(Resource::new).collect()
}
