//! Suite root and the retry loop
//!
//! A [`Runner`] holds the suite-wide fragments, the suite-lifetime hooks
//! and the resource registry. [`Runner::run_case`] merges a [`Case`] into a
//! fresh [`Config`] per attempt and drives it through the host:
//!
//! ```text
//! Pending ──skip──────────────────────────────► Skipped
//!    │
//!    └─► Attempting ──pass on 1────────────────► Passed
//!          │  ▲     ──pass on n > 1────────────► Flaky
//!          │  │     ──attempts exhausted───────► Failed
//!          └──┘ fail, sleep(delay), fresh config
//! ```
//!
//! Before-all hooks run once per runner, on the first case, even when one of
//! them panics. After-all hooks run once, from the host's suite-end
//! callback, followed by the cleanups of every resource the runner resolved.
//! Resource cleanups belong to the runner's cache and are never carried over
//! by [`Runner::join`].

use crate::case::Case;
use crate::config::{panic_message, Config};
use crate::fixture::{FixtureRegistry, Fixtures};
use crate::hooks::Hooks;
use crate::host::Host;
use crate::outcome::{CaseOutcome, CaseStatus};
use crate::plugin::Plugin;
use crate::registry::{Cleanup, ProviderResult};
use crate::resource::{ResourceRegistry, Resources};
use crate::settings::SuiteSettings;
use axiom_core::{
    Context, Join, Meta, Normalize, Parallel, Result, Retry, Scope, Skip, Value,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Suite-root template
pub struct Runner {
    pub meta: Meta,
    pub skip: Skip,
    pub retry: Retry,
    pub context: Context,
    pub parallel: Parallel,

    hooks: Hooks,
    plugins: Vec<Plugin>,
    fixtures: FixtureRegistry,
    resources: Resources,
    cleanups: Mutex<Vec<Cleanup>>,

    started: OnceCell<()>,
    finish_registered: AtomicBool,
    finished: OnceCell<()>,
}

impl Runner {
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    /// Hooks declared on the builder
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Number of resource cleanups waiting for the after-all pass
    pub fn pending_cleanups(&self) -> usize {
        self.cleanups.lock().len()
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.fixtures
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Derive a new runner with `other` joined on top of this one
    ///
    /// The result has its own once-gates, an empty resource cache and no
    /// pending resource cleanups.
    pub fn join(&self, other: &Runner) -> Arc<Runner> {
        let mut plugins = self.plugins.clone();
        plugins.extend(other.plugins.iter().cloned());

        Arc::new(Runner {
            meta: self.meta.join(&other.meta),
            skip: self.skip.join(&other.skip),
            retry: self.retry.join(&other.retry),
            context: self.context.join(&other.context),
            parallel: self.parallel.join(&other.parallel),
            hooks: self.hooks.join(&other.hooks),
            plugins,
            fixtures: self.fixtures.join(&other.fixtures),
            resources: self.resources.join(&other.resources),
            cleanups: Mutex::new(Vec::new()),
            started: OnceCell::new(),
            finish_registered: AtomicBool::new(false),
            finished: OnceCell::new(),
        })
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Resolve a suite resource, shared by every case of this runner
    ///
    /// A cleanup returned by the provider is queued for the after-all pass
    /// the first time the resource resolves.
    pub fn resource<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.resource_value(name)?.expect_type::<T>(Scope::Resource, name)
    }

    /// Resolve a resource without committing to a type
    pub fn resource_value(&self, name: &str) -> Result<Value> {
        let cache = self.resources.cache();
        cache.resolve_value(self, self.resources.registry(), name, |cleanup| {
            self.cleanups.lock().push(cleanup);
        })
    }

    // ========================================================================
    // Suite lifecycle
    // ========================================================================

    /// Run before-all hooks once; concurrent callers wait until they finish
    ///
    /// A panicking hook stops the pass and is re-raised to the caller that
    /// ran it. The gate still closes, so later callers never rerun the pass.
    pub fn apply_start(&self) {
        let mut panicked = None;
        self.started.get_or_init(|| {
            info!(target: "axiom::runner", "Suite started");
            for hook in &self.hooks.before_all {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(self))) {
                    warn!(target: "axiom::runner", error = %panic_message(payload.as_ref()), "Before-all hook panicked");
                    panicked = Some(payload);
                    break;
                }
            }
        });
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
    }

    /// Register the after-all pass with the host, once per runner
    pub fn apply_finish(self: &Arc<Self>, host: &dyn Host) {
        if self
            .finish_registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let runner = Arc::clone(self);
            host.defer(Box::new(move || runner.finish()));
        }
    }

    /// Run after-all hooks, then resource cleanups, once
    ///
    /// Every hook and cleanup runs even if an earlier one panics; the first
    /// panic is re-raised afterwards.
    pub fn finish(&self) {
        let mut first_panic = None;
        self.finished.get_or_init(|| {
            for hook in &self.hooks.after_all {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(self))) {
                    warn!(target: "axiom::runner", error = %panic_message(payload.as_ref()), "After-all hook panicked");
                    first_panic.get_or_insert(payload);
                }
            }
            let cleanups = std::mem::take(&mut *self.cleanups.lock());
            for cleanup in cleanups {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| cleanup.run())) {
                    warn!(target: "axiom::runner", error = %panic_message(payload.as_ref()), "Resource cleanup panicked");
                    first_panic.get_or_insert(payload);
                }
            }
            info!(target: "axiom::runner", "Suite finished");
        });
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.get().is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.get().is_some()
    }

    // ========================================================================
    // Cases
    // ========================================================================

    /// Merge this runner with `case` into a config for one attempt
    pub fn build_config(self: &Arc<Self>, case: &Arc<Case>, attempt: u32) -> Config {
        Config::new(
            Arc::clone(self),
            Arc::clone(case),
            self.meta.join(&case.meta).normalized(),
            self.skip.join(&case.skip),
            self.retry.join(&case.retry).normalized(),
            self.context.join(&case.context).normalized(),
            self.parallel.join(&case.parallel),
            self.hooks.join(&case.hooks),
            Fixtures::new(self.fixtures.join(&case.fixtures)),
            attempt,
        )
    }

    /// Run one case through the retry loop
    pub fn run_case<F>(self: &Arc<Self>, host: &dyn Host, case: &Case, action: F) -> CaseOutcome
    where
        F: Fn(&Config),
    {
        let started = Instant::now();
        self.apply_finish(host);
        self.apply_start();

        let case = Arc::new(case.clone());
        let base = self.build_config(&case, 1);
        base.apply_plugins();
        base.apply_execution_policy(host);

        let outcome = |status, attempts| CaseOutcome {
            id: case.id.clone(),
            name: case.name.clone(),
            status,
            attempts,
            duration: started.elapsed(),
        };

        if base.skip.enabled {
            info!(target: "axiom::runner", case = %case.name, reason = %base.skip.reason, "Case skipped");
            return outcome(CaseStatus::Skipped, 0);
        }

        let times = base.retry.attempts();
        let delay = base.retry.wait();
        let mut passed_on = None;
        let mut attempts = 0;

        for attempt in 1..=times {
            if attempt > 1 && !delay.is_zero() {
                debug!(target: "axiom::runner", case = %case.name, ?delay, "Waiting before retry");
                thread::sleep(delay);
            }
            attempts = attempt;

            let cfg = self.build_config(&case, attempt);
            cfg.apply_plugins();
            debug!(target: "axiom::runner", case = %case.name, attempt, "Attempt started");

            let ok = host.run(&cfg.name, &mut |sub| {
                cfg.test(&action);
                for failure in cfg.failures() {
                    sub.fail(&failure);
                }
            });

            if ok {
                passed_on = Some(attempt);
                break;
            }
            if attempt < times {
                warn!(target: "axiom::runner", case = %case.name, attempt, times, "Attempt failed, retrying");
            }
        }

        let status = CaseStatus::classify(false, passed_on);
        match status {
            CaseStatus::Failed => {
                warn!(target: "axiom::runner", case = %case.name, attempts, "Case failed")
            }
            _ => info!(target: "axiom::runner", case = %case.name, %status, attempts, "Case finished"),
        }
        outcome(status, attempts)
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("meta", &self.meta)
            .field("skip", &self.skip)
            .field("retry", &self.retry)
            .field("parallel", &self.parallel)
            .field("hooks", &self.hooks)
            .field("pending_cleanups", &self.pending_cleanups())
            .field("plugins", &self.plugins.len())
            .field("fixtures", &self.fixtures)
            .field("resources", &self.resources)
            .field("started", &self.is_started())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Builder for [`Runner`]
///
/// Fragment setters join into the accumulated fragment. `build` normalizes
/// meta, retry and context.
#[derive(Default)]
pub struct RunnerBuilder {
    meta: Meta,
    skip: Skip,
    retry: Retry,
    context: Context,
    parallel: Parallel,
    hooks: Hooks,
    plugins: Vec<Plugin>,
    fixtures: FixtureRegistry,
    resources: ResourceRegistry,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self::default()
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

    pub fn parallel(mut self) -> Self {
        self.parallel = self.parallel.join(&Parallel::enabled());
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = self.hooks.join(&hooks);
        self
    }

    pub fn before_all<F: Fn(&Runner) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.hooks.add_before_all(hook);
        self
    }

    pub fn after_all<F: Fn(&Runner) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.hooks.add_after_all(hook);
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

    pub fn resource<F>(mut self, name: impl Into<String>, provider: F) -> Self
    where
        F: Fn(&Runner) -> ProviderResult + Send + Sync + 'static,
    {
        self.resources.register(name, provider);
        self
    }

    /// Join suite settings loaded from `axiom.toml`
    pub fn settings(mut self, settings: &SuiteSettings) -> Self {
        self.meta = self.meta.join(&settings.meta);
        self.skip = self.skip.join(&settings.skip);
        self.retry = self.retry.join(&settings.retry());
        self.parallel = self.parallel.join(&Parallel {
            enabled: settings.parallel,
        });
        self
    }

    pub fn build(self) -> Arc<Runner> {
        Arc::new(Runner {
            meta: self.meta.normalized(),
            skip: self.skip,
            retry: self.retry.normalized(),
            context: self.context.normalized(),
            parallel: self.parallel,
            hooks: self.hooks,
            plugins: self.plugins,
            fixtures: self.fixtures,
            resources: Resources::new(self.resources),
            cleanups: Mutex::new(Vec::new()),
            started: OnceCell::new(),
            finish_registered: AtomicBool::new(false),
            finished: OnceCell::new(),
        })
    }
}
