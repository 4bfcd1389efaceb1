//! Suite-scoped resources
//!
//! Resources live on the [`Runner`] and are shared by every case it runs,
//! including cases the host schedules in parallel. The cache serializes
//! provider runs per name (see [`crate::registry`]) and cleanups are queued
//! on the runner, to run after its after-all hooks.

use crate::registry::{LazyCache, Provider, Registry};
use crate::runner::Runner;
use axiom_core::{Join, Scope};
use std::fmt;

/// Resource provider, receives the owning runner
pub type Resource = Provider<Runner>;

/// Resource registry as declared on runners
pub type ResourceRegistry = Registry<Runner>;

/// Resource registry plus the process-lifetime cache
pub struct Resources {
    registry: ResourceRegistry,
    cache: LazyCache,
}

impl Resources {
    pub fn new(registry: ResourceRegistry) -> Self {
        Self {
            registry,
            cache: LazyCache::new(Scope::Resource),
        }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &LazyCache {
        &self.cache
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new(ResourceRegistry::new())
    }
}

impl Join for Resources {
    /// Merge registries; the result always starts with an empty cache
    fn join(&self, other: &Self) -> Self {
        Self::new(self.registry.join(&other.registry))
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish()
    }
}
