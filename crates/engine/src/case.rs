//! Declarative per-test template

use crate::config::Config;
use crate::fixture::FixtureRegistry;
use crate::hooks::Hooks;
use crate::plugin::Plugin;
use crate::registry::ProviderResult;
use axiom_core::{Context, Join, Meta, Parallel, Retry, Skip, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// One test case: identity, fragment overrides, params, fixtures and plugins
///
/// Built once and never mutated by the engine. Fragment setters join the
/// incoming fragment into the accumulated one, so calling `.meta(..)` twice
/// behaves like joining both fragments.
#[derive(Clone, Default)]
pub struct Case {
    pub id: String,
    pub name: String,
    pub meta: Meta,
    pub skip: Skip,
    pub retry: Retry,
    pub context: Context,
    pub parallel: Parallel,
    pub hooks: Hooks,
    pub params: Option<Value>,
    pub plugins: Vec<Plugin>,
    pub fixtures: FixtureRegistry,
}

impl Case {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = self.meta.join(&meta);
        self
    }

    pub fn skip(mut self, skip: Skip) -> Self {
        self.skip = self.skip.join(&skip);
        self
    }

    pub fn retry(mut self, retry: Retry) -> Self {
        self.retry = self.retry.join(&retry);
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = self.context.join(&context);
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = self.hooks.join(&hooks);
        self
    }

    /// Opt into parallel scheduling
    pub fn parallel(mut self) -> Self {
        self.parallel = self.parallel.join(&Parallel::enabled());
        self
    }

    /// Opaque parameters, read back with [`Config::params`]
    pub fn params<T: Any + Send + Sync>(mut self, params: T) -> Self {
        self.params = Some(Value::new(params));
        self
    }

    pub fn plugin<F: Fn(&Config) + Send + Sync + 'static>(mut self, plugin: F) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn fixture<F>(mut self, name: impl Into<String>, provider: F) -> Self
    where
        F: Fn(&Config) -> ProviderResult + Send + Sync + 'static,
    {
        self.fixtures.register(name, provider);
        self
    }
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("meta", &self.meta)
            .field("skip", &self.skip)
            .field("retry", &self.retry)
            .field("context", &self.context)
            .field("parallel", &self.parallel)
            .field("hooks", &self.hooks)
            .field("params", &self.params)
            .field("plugins", &self.plugins.len())
            .field("fixtures", &self.fixtures)
            .finish()
    }
}
