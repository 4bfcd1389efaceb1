//! Execution context for one test attempt
//!
//! A [`Config`] is the merged view of a [`Runner`] and a [`Case`]. It is
//! built fresh for every attempt, lives on the thread running that attempt
//! and is never shared. Plugins populate its hooks and runtime; the test
//! body drives it through [`Config::step`], [`Config::log`] and friends.
//!
//! ## Failure handling
//!
//! Test bodies do not return errors. A failure is either recorded with
//! [`Config::fail`] (the body keeps running) or raised with
//! [`Config::fatal`] (the body stops). Panics are caught at the boundary of
//! every step, setup, teardown and test body and recorded as failures named
//! after the section that panicked. After-hooks always run.

use crate::case::Case;
use crate::fixture::Fixtures;
use crate::hooks::Hooks;
use crate::host::Host;
use crate::outcome::CaseStatus;
use crate::runner::Runner;
use crate::runtime::Runtime;
use axiom_core::{
    Artefact, Assert, Context, Error, Log, Meta, Parallel, Result, Retry, Scope, Skip, Value,
};
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Unwind payload used by [`Config::fatal`]; the message is already recorded
struct FatalAbort;

/// Merged execution context for a single attempt
pub struct Config {
    pub id: String,
    pub name: String,
    pub meta: Meta,
    pub skip: Skip,
    pub retry: Retry,
    pub context: Context,
    pub parallel: Parallel,

    runner: Arc<Runner>,
    case: Arc<Case>,
    params: Option<Value>,
    attempt: u32,

    hooks: RefCell<Hooks>,
    runtime: RefCell<Runtime>,
    fixtures: Fixtures,
    failures: RefCell<Vec<String>>,
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        runner: Arc<Runner>,
        case: Arc<Case>,
        meta: Meta,
        skip: Skip,
        retry: Retry,
        context: Context,
        parallel: Parallel,
        hooks: Hooks,
        fixtures: Fixtures,
        attempt: u32,
    ) -> Self {
        Self {
            id: case.id.clone(),
            name: case.name.clone(),
            params: case.params.clone(),
            meta,
            skip,
            retry,
            context,
            parallel,
            runner,
            case,
            attempt,
            hooks: RefCell::new(hooks),
            runtime: RefCell::new(Runtime::new()),
            fixtures,
            failures: RefCell::new(Vec::new()),
        }
    }

    pub fn runner(&self) -> &Arc<Runner> {
        &self.runner
    }

    pub fn case(&self) -> &Case {
        &self.case
    }

    /// 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Typed view of the case parameters
    pub fn params<T: Any>(&self) -> Result<&T> {
        let value = self.params.as_ref().ok_or_else(|| Error::MissingValue {
            scope: Scope::Params,
            name: self.name.clone(),
        })?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| Error::type_mismatch::<T>(Scope::Params, self.name.clone()))
    }

    pub fn hooks(&self) -> Ref<'_, Hooks> {
        self.hooks.borrow()
    }

    /// Mutable hooks, for plugins. Do not hold across a call back into the config.
    pub fn hooks_mut(&self) -> RefMut<'_, Hooks> {
        self.hooks.borrow_mut()
    }

    pub fn runtime(&self) -> Ref<'_, Runtime> {
        self.runtime.borrow()
    }

    /// Mutable runtime, for plugins. Do not hold across a call back into the config.
    pub fn runtime_mut(&self) -> RefMut<'_, Runtime> {
        self.runtime.borrow_mut()
    }

    pub fn fixtures(&self) -> &Fixtures {
        &self.fixtures
    }

    // ========================================================================
    // Fixtures and resources
    // ========================================================================

    /// Resolve a fixture, memoized for this attempt
    ///
    /// A cleanup returned by the provider is appended to the after-test
    /// hooks the first time the fixture resolves.
    pub fn fixture<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.fixture_value(name)?.expect_type::<T>(Scope::Fixture, name)
    }

    /// Resolve a fixture without committing to a type
    pub fn fixture_value(&self, name: &str) -> Result<Value> {
        let cache = self.fixtures.cache();
        cache.resolve_value(self, self.fixtures.registry(), name, |cleanup| {
            self.hooks.borrow_mut().add_after_test(move |_| {
                cleanup.run();
            });
        })
    }

    /// Resolve a fixture or abort the test with the error message
    pub fn require_fixture<T: Any + Send + Sync>(&self, name: &str) -> Arc<T> {
        match self.fixture::<T>(name) {
            Ok(value) => value,
            Err(e) => self.fatal(e.to_string()),
        }
    }

    /// Resolve a resource from the owning runner
    pub fn resource<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.runner.resource::<T>(name)
    }

    /// Resolve a resource or abort the test with the error message
    pub fn require_resource<T: Any + Send + Sync>(&self, name: &str) -> Arc<T> {
        match self.resource::<T>(name) {
            Ok(value) => value,
            Err(e) => self.fatal(e.to_string()),
        }
    }

    // ========================================================================
    // Sinks
    // ========================================================================

    pub fn log(&self, log: Log) {
        let runtime = self.runtime.borrow().clone();
        runtime.log(&log);
    }

    pub fn assert(&self, assert: Assert) {
        let runtime = self.runtime.borrow().clone();
        runtime.assert(&assert);
    }

    pub fn artefact(&self, artefact: Artefact) {
        let runtime = self.runtime.borrow().clone();
        runtime.artefact(&artefact);
    }

    // ========================================================================
    // Failures
    // ========================================================================

    /// Record a failure; the body keeps running
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(target: "axiom::config", test = %self.name, attempt = self.attempt, %message, "Failure recorded");
        self.failures.borrow_mut().push(message);
    }

    /// Record a failure and abort the enclosing test body
    ///
    /// After-step and after-test hooks still run.
    pub fn fatal(&self, message: impl Into<String>) -> ! {
        self.fail(message);
        panic::resume_unwind(Box::new(FatalAbort))
    }

    pub fn failed(&self) -> bool {
        !self.failures.borrow().is_empty()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.borrow().clone()
    }

    /// Status of this attempt as seen so far
    pub fn attempt_status(&self) -> CaseStatus {
        let passed_on = if self.failed() { None } else { Some(self.attempt) };
        CaseStatus::classify(self.skip.enabled, passed_on)
    }

    fn record_panic(&self, section: &str, name: &str, payload: Box<dyn Any + Send>) {
        if payload.is::<FatalAbort>() {
            return;
        }
        self.fail(format!(
            "panic in {} {:?}: {}",
            section,
            name,
            panic_message(payload.as_ref())
        ));
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run the whole test body: before-test hooks, the test wrap chain,
    /// then after-test hooks
    pub fn test<F: FnOnce(&Config)>(&self, action: F) {
        debug!(target: "axiom::config", test = %self.name, attempt = self.attempt, "Test started");
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.apply_before_test();
            let runtime = self.runtime.borrow().clone();
            runtime.test(self, Box::new(action));
        }));
        if let Err(payload) = result {
            self.record_panic("test", &self.name, payload);
        }
        self.apply_after_test();
    }

    /// Run a named step through the step hooks and step wrap chain
    ///
    /// A panic in the body fails the test under the step's name and the
    /// test continues; a fatal error, raised by the body or by an after-step
    /// hook, stops the test once every after-step hook has run.
    pub fn step<F: FnOnce()>(&self, name: &str, body: F) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.apply_before_step(name);
            let runtime = self.runtime.borrow().clone();
            runtime.step(name, Box::new(body));
        }));
        let hook_fatal = self.apply_after_step(name);
        self.settle("step", name, result);
        if hook_fatal {
            panic::resume_unwind(Box::new(FatalAbort));
        }
    }

    /// Run a setup section through the setup wrap chain; step hooks are not applied
    pub fn setup<F: FnOnce()>(&self, name: &str, body: F) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let runtime = self.runtime.borrow().clone();
            runtime.setup(name, Box::new(body));
        }));
        self.settle("setup", name, result);
    }

    /// Run a teardown section through the teardown wrap chain; step hooks are not applied
    pub fn teardown<F: FnOnce()>(&self, name: &str, body: F) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let runtime = self.runtime.borrow().clone();
            runtime.teardown(name, Box::new(body));
        }));
        self.settle("teardown", name, result);
    }

    fn settle(&self, section: &str, name: &str, result: std::thread::Result<()>) {
        if let Err(payload) = result {
            if payload.is::<FatalAbort>() {
                panic::resume_unwind(payload);
            }
            self.record_panic(section, name, payload);
        }
    }

    /// Run runner-level plugins, then case-level plugins
    pub fn apply_plugins(&self) {
        let plugins = self.runner.plugins().iter().chain(self.case.plugins.iter());
        for plugin in plugins {
            plugin(self);
        }
    }

    /// Tell the host to skip or parallelize this test
    pub fn apply_execution_policy(&self, host: &dyn Host) {
        if self.skip.enabled {
            debug!(target: "axiom::config", test = %self.name, reason = %self.skip.reason, "Skipping");
            host.skip(&self.name, &self.skip.reason);
        }
        if self.parallel.enabled {
            host.parallel(&self.name);
        }
    }

    // ========================================================================
    // Hook application
    // ========================================================================

    // Hooks are fetched by index with the borrow released before each call,
    // so a hook may append hooks (fixture cleanups) while the list is applied.

    fn hook_at<T: Clone>(&self, list: impl Fn(&Hooks) -> &Vec<T>, i: usize) -> Option<T> {
        let hooks = self.hooks.borrow();
        list(&hooks).get(i).cloned()
    }

    fn apply_before_test(&self) {
        let mut i = 0;
        while let Some(hook) = self.hook_at(|h| &h.before_test, i) {
            hook(self);
            i += 1;
        }
    }

    fn apply_after_test(&self) {
        let mut i = 0;
        while let Some(hook) = self.hook_at(|h| &h.after_test, i) {
            let result = panic::catch_unwind(AssertUnwindSafe(|| hook(self)));
            if let Err(payload) = result {
                self.record_panic("after-test hook of", &self.name, payload);
            }
            i += 1;
        }
    }

    fn apply_before_step(&self, name: &str) {
        let mut i = 0;
        while let Some(hook) = self.hook_at(|h| &h.before_step, i) {
            hook(self, name);
            i += 1;
        }
    }

    /// Returns whether a hook raised a fatal error
    fn apply_after_step(&self, name: &str) -> bool {
        let mut fatal = false;
        let mut i = 0;
        while let Some(hook) = self.hook_at(|h| &h.after_step, i) {
            let result = panic::catch_unwind(AssertUnwindSafe(|| hook(self, name)));
            if let Err(payload) = result {
                fatal |= payload.is::<FatalAbort>();
                self.record_panic("after-step hook of", name, payload);
            }
            i += 1;
        }
        fatal
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("attempt", &self.attempt)
            .field("meta", &self.meta)
            .field("skip", &self.skip)
            .field("retry", &self.retry)
            .field("parallel", &self.parallel)
            .field("hooks", &*self.hooks.borrow())
            .field("runtime", &*self.runtime.borrow())
            .field("failures", &*self.failures.borrow())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Provided;
    use crate::runner::Runner;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config_for(case: Case) -> Config {
        Runner::builder().build().build_config(&Arc::new(case), 1)
    }

    #[test]
    fn test_step_hooks_surround_body() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (o1, o2) = (Arc::clone(&order), Arc::clone(&order));
        let case = Case::new("steps").hooks(
            Hooks::new()
                .before_step(move |_, name| o1.lock().push(format!("before:{}", name)))
                .after_step(move |_, name| o2.lock().push(format!("after:{}", name))),
        );
        let cfg = config_for(case);

        let o3 = Arc::clone(&order);
        cfg.step("login", || o3.lock().push("body".to_string()));
        assert_eq!(*order.lock(), vec!["before:login", "body", "after:login"]);
        assert!(!cfg.failed());
    }

    #[test]
    fn test_step_panic_is_recorded_under_step_name() {
        let after = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&after);
        let case = Case::new("boom").hooks(Hooks::new().after_step(move |_, _| {
            a.fetch_add(1, Ordering::SeqCst);
        }));
        let cfg = config_for(case);

        cfg.step("explode", || panic!("kaboom"));
        cfg.step("next", || {});

        assert_eq!(after.load(Ordering::SeqCst), 2);
        let failures = cfg.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("\"explode\""));
        assert!(failures[0].contains("kaboom"));
    }

    #[test]
    fn test_fatal_stops_body_but_runs_after_hooks() {
        let after = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&after);
        let case = Case::new("fatal").hooks(Hooks::new().after_test(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        }));
        let cfg = config_for(case);
        let reached = Cell::new(false);

        cfg.test(|c| {
            c.step("inner", || c.fatal("stop here"));
            reached.set(true);
        });

        assert!(!reached.get());
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert_eq!(cfg.failures(), vec!["stop here".to_string()]);
    }

    #[test]
    fn test_fatal_in_after_step_hook_stops_test() {
        let hooks_run = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hooks_run);
        let case = Case::new("guarded").hooks(
            Hooks::new()
                .after_step(|cfg, name| cfg.fatal(format!("{} left dirty state", name)))
                .after_step(move |_, _| {
                    h.fetch_add(1, Ordering::SeqCst);
                }),
        );
        let cfg = config_for(case);
        let steps = Cell::new(0);

        cfg.test(|c| {
            c.step("first", || steps.set(steps.get() + 1));
            c.step("second", || steps.set(steps.get() + 1));
        });

        assert_eq!(steps.get(), 1);
        assert_eq!(hooks_run.load(Ordering::SeqCst), 1, "later after-step hooks still run");
        assert_eq!(cfg.failures(), vec!["first left dirty state".to_string()]);
    }

    #[test]
    fn test_setup_skips_step_hooks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let case = Case::new("setup").hooks(Hooks::new().before_step(move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let cfg = config_for(case);

        let ran = Cell::new(0);
        cfg.setup("db", || ran.set(ran.get() + 1));
        cfg.teardown("db", || ran.set(ran.get() + 1));
        assert_eq!(ran.get(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_sinks_receive_records() {
        let cfg = config_for(Case::new("sinks"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        cfg.runtime_mut()
            .emit_log_sink(move |l: &Log| s.borrow_mut().push(l.text.clone()));

        cfg.log(Log::info("one"));
        cfg.log(Log::error("two"));
        assert_eq!(*seen.borrow(), vec!["one", "two"]);
    }

    #[test]
    fn test_fixture_memoized_and_cleanup_after_test() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cleaned = Arc::new(AtomicUsize::new(0));
        let (c, d) = (Arc::clone(&calls), Arc::clone(&cleaned));
        let case = Case::new("fx").fixture("user", move |_: &Config| {
            c.fetch_add(1, Ordering::SeqCst);
            let d = Arc::clone(&d);
            Ok(Provided::new("alice".to_string()).with_cleanup(move || {
                d.fetch_add(1, Ordering::SeqCst);
            }))
        });
        let cfg = config_for(case);

        cfg.test(|c| {
            let a = c.fixture::<String>("user").unwrap();
            let b = c.fixture::<String>("user").unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(cleaned.load(Ordering::SeqCst), 0);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
        assert!(!cfg.failed());
    }

    #[test]
    fn test_require_fixture_missing_is_fatal() {
        let cfg = config_for(Case::new("missing"));
        cfg.test(|c| {
            let _ = c.require_fixture::<u32>("nope");
            unreachable!();
        });
        let failures = cfg.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("fixture \"nope\" not found"));
    }

    #[test]
    fn test_params_downcast() {
        let cfg = config_for(Case::new("params").params(7u64));
        assert_eq!(*cfg.params::<u64>().unwrap(), 7);
        assert!(matches!(
            cfg.params::<String>(),
            Err(Error::TypeMismatch { .. })
        ));

        let none = config_for(Case::new("none"));
        assert!(matches!(none.params::<u64>(), Err(Error::MissingValue { .. })));
    }

    #[test]
    fn test_plugins_runner_then_case() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (o1, o2) = (Arc::clone(&order), Arc::clone(&order));
        let runner = Runner::builder()
            .plugin(move |_| o1.lock().push("runner"))
            .build();
        let case = Arc::new(Case::new("p").plugin(move |_| o2.lock().push("case")));

        runner.build_config(&case, 1).apply_plugins();
        assert_eq!(*order.lock(), vec!["runner", "case"]);
    }

    #[test]
    fn test_attempt_status() {
        let cfg = config_for(Case::new("s"));
        assert_eq!(cfg.attempt_status(), CaseStatus::Passed);
        cfg.fail("nope");
        assert_eq!(cfg.attempt_status(), CaseStatus::Failed);

        let skipped = config_for(Case::new("k").skip(Skip::because("later")));
        assert_eq!(skipped.attempt_status(), CaseStatus::Skipped);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "non-string panic payload");
    }
}
