//! Test-scoped fixtures
//!
//! A fixture is a named provider resolved lazily inside a running test. Each
//! [`Config`] owns its own [`Fixtures`], so a retry attempt starts with an
//! empty cache and re-runs every provider it needs. Cleanups are appended to
//! the config's after-test hooks.

use crate::config::Config;
use crate::registry::{LazyCache, Provider, Registry};
use axiom_core::{Join, Scope};
use std::fmt;

/// Fixture provider, receives the live config
pub type Fixture = Provider<Config>;

/// Fixture registry as declared on runners and cases
pub type FixtureRegistry = Registry<Config>;

/// Fixture registry plus the per-attempt cache
pub struct Fixtures {
    registry: FixtureRegistry,
    cache: LazyCache,
}

impl Fixtures {
    pub fn new(registry: FixtureRegistry) -> Self {
        Self {
            registry,
            cache: LazyCache::new(Scope::Fixture),
        }
    }

    pub fn registry(&self) -> &FixtureRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &LazyCache {
        &self.cache
    }
}

impl Default for Fixtures {
    fn default() -> Self {
        Self::new(FixtureRegistry::new())
    }
}

impl Join for Fixtures {
    /// Merge registries; the result always starts with an empty cache
    fn join(&self, other: &Self) -> Self {
        Self::new(self.registry.join(&other.registry))
    }
}

impl fmt::Debug for Fixtures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixtures")
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish()
    }
}
