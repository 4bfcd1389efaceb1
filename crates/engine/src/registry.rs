//! Named lazy providers and their memoized results
//!
//! The same machinery backs both fixtures (scope = [`Config`], one cache per
//! test attempt) and resources (scope = [`Runner`], one cache per runner,
//! shared by concurrently running cases).
//!
//! ## Resolution
//!
//! ```text
//! 1. cached?                -> downcast and return
//! 2. provider registered?   -> else NotFound
//! 3. same name in flight on this thread? -> Cycle
//! 4. init the per-name cell: run provider (map lock NOT held)
//!    - Ok  -> store value, hand cleanup to the caller exactly once
//!    - Err -> cell stays empty, ProviderFailure
//! 5. downcast and return
//! ```
//!
//! Only one caller runs a provider for a given name at a time; concurrent
//! callers for that name block on the cell and then observe the stored
//! value. Providers may resolve other names recursively. A cycle that spans
//! threads (A waits on B while B waits on A) is not detected and deadlocks.
//!
//! [`Config`]: crate::Config
//! [`Runner`]: crate::Runner

use axiom_core::{BoxError, Error, Join, Result, Scope, Value};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::debug;

/// Teardown callback that runs at most once, however many times it is invoked
#[derive(Clone)]
pub struct Cleanup {
    inner: Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
}

impl Cleanup {
    pub fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::new(f)))),
        }
    }

    /// Run the callback if it has not run yet. Returns whether it ran now.
    pub fn run(&self) -> bool {
        // Take outside the call so a re-entrant run() sees it as spent
        let f = self.inner.lock().take();
        match f {
            Some(f) => {
                f();
                true
            }
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// What a provider hands back: the value and an optional cleanup
#[derive(Debug)]
pub struct Provided {
    value: Value,
    cleanup: Option<Cleanup>,
}

impl Provided {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Value::new(value),
            cleanup: None,
        }
    }

    /// Provide an already shared value
    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value: Value::from_arc(value),
            cleanup: None,
        }
    }

    pub fn with_cleanup<F: FnOnce() + Send + 'static>(mut self, f: F) -> Self {
        self.cleanup = Some(Cleanup::new(f));
        self
    }
}

/// Result returned by a provider
pub type ProviderResult = std::result::Result<Provided, BoxError>;

/// Lazily invoked provider receiving the resolution scope
pub type Provider<S> = Arc<dyn Fn(&S) -> ProviderResult + Send + Sync>;

/// Name -> provider map
///
/// Join merges the maps with the incoming registry winning on collisions.
pub struct Registry<S> {
    providers: HashMap<String, Provider<S>>,
}

impl<S> Registry<S> {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Store or replace the provider for `name`
    pub fn register<F>(&mut self, name: impl Into<String>, provider: F)
    where
        F: Fn(&S) -> ProviderResult + Send + Sync + 'static,
    {
        self.providers.insert(name.into(), Arc::new(provider));
    }

    /// Store an already shared provider
    pub fn insert(&mut self, name: impl Into<String>, provider: Provider<S>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Provider<S>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Registry<S> {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
        }
    }
}

impl<S> Join for Registry<S> {
    fn join(&self, other: &Self) -> Self {
        let mut providers = self.providers.clone();
        providers.extend(other.providers.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        Self { providers }
    }
}

impl<S> fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

/// Removes the in-flight marker even if the provider panics
struct InFlight<'a> {
    resolving: &'a Mutex<HashMap<String, ThreadId>>,
    name: &'a str,
}

impl<'a> InFlight<'a> {
    fn enter(resolving: &'a Mutex<HashMap<String, ThreadId>>, name: &'a str) -> Self {
        resolving
            .lock()
            .insert(name.to_string(), thread::current().id());
        Self { resolving, name }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.resolving.lock().remove(self.name);
    }
}

/// Memoized results for one registry
///
/// A cache never merges with another cache; joining the owning fragment
/// always starts from an empty one.
pub struct LazyCache {
    scope: Scope,
    slots: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
    resolving: Mutex<HashMap<String, ThreadId>>,
}

impl LazyCache {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            slots: Mutex::new(HashMap::new()),
            resolving: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Cached value for `name`, if a provider already succeeded
    pub fn cached(&self, name: &str) -> Option<Value> {
        self.slots
            .lock()
            .get(name)
            .and_then(|slot| slot.get().cloned())
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cached(name).is_some()
    }

    /// Number of successfully resolved names
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, name: &str) -> Arc<OnceCell<Value>> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(name.to_string()).or_default())
    }

    /// Resolve `name` and downcast to `T`
    ///
    /// `on_cleanup` receives the provider's cleanup, if any, exactly once
    /// per successful provider run.
    pub fn resolve<S, T, C>(
        &self,
        scope: &S,
        registry: &Registry<S>,
        name: &str,
        on_cleanup: C,
    ) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        C: FnOnce(Cleanup),
    {
        self.resolve_value(scope, registry, name, on_cleanup)?
            .expect_type::<T>(self.scope, name)
    }

    /// Resolve `name` without committing to a type
    pub fn resolve_value<S, C>(
        &self,
        scope: &S,
        registry: &Registry<S>,
        name: &str,
        on_cleanup: C,
    ) -> Result<Value>
    where
        C: FnOnce(Cleanup),
    {
        if let Some(value) = self.cached(name) {
            return Ok(value);
        }

        let provider = registry
            .get(name)
            .ok_or_else(|| Error::not_found(self.scope, name))?;

        let me = thread::current().id();
        if self.resolving.lock().get(name) == Some(&me) {
            return Err(Error::Cycle {
                scope: self.scope,
                name: name.to_string(),
            });
        }

        let slot = self.slot(name);
        let value = slot.get_or_try_init(|| {
            let _in_flight = InFlight::enter(&self.resolving, name);
            debug!(target: "axiom::registry", scope = %self.scope, name, "Invoking provider");

            let provided = provider(scope).map_err(|e| Error::provider(self.scope, name, e))?;
            if let Some(cleanup) = provided.cleanup {
                on_cleanup(cleanup);
            }
            Ok::<_, Error>(provided.value)
        })?;

        Ok(value.clone())
    }
}

impl fmt::Debug for LazyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCache")
            .field("scope", &self.scope)
            .field("resolved", &self.len())
            .finish()
    }
}
