//! Lifecycle hook lists
//!
//! Six ordered lists of plain callbacks:
//! - before/after all: once per runner, receive the [`Runner`]
//! - before/after test: around every test attempt, receive the [`Config`]
//! - before/after step: around every step, receive the config and step name
//!
//! Join concatenates base then incoming, list by list. Invocation lives on
//! [`Config`] and [`Runner`] because hooks may be appended while a list is
//! being applied (fixture and resource cleanups).

use crate::config::Config;
use crate::runner::Runner;
use axiom_core::Join;
use std::fmt;
use std::sync::Arc;

/// Suite-level hook
pub type AllHook = Arc<dyn Fn(&Runner) + Send + Sync>;

/// Test-level hook
pub type TestHook = Arc<dyn Fn(&Config) + Send + Sync>;

/// Step-level hook, receives the step name
pub type StepHook = Arc<dyn Fn(&Config, &str) + Send + Sync>;

/// Ordered lifecycle callbacks
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_all: Vec<AllHook>,
    pub after_all: Vec<AllHook>,
    pub before_test: Vec<TestHook>,
    pub after_test: Vec<TestHook>,
    pub before_step: Vec<StepHook>,
    pub after_step: Vec<StepHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_all<F: Fn(&Runner) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.add_before_all(hook);
        self
    }

    pub fn after_all<F: Fn(&Runner) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.add_after_all(hook);
        self
    }

    pub fn before_test<F: Fn(&Config) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.add_before_test(hook);
        self
    }

    pub fn after_test<F: Fn(&Config) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.add_after_test(hook);
        self
    }

    pub fn before_step<F: Fn(&Config, &str) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.add_before_step(hook);
        self
    }

    pub fn after_step<F: Fn(&Config, &str) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.add_after_step(hook);
        self
    }

    pub fn add_before_all<F: Fn(&Runner) + Send + Sync + 'static>(&mut self, hook: F) {
        self.before_all.push(Arc::new(hook));
    }

    pub fn add_after_all<F: Fn(&Runner) + Send + Sync + 'static>(&mut self, hook: F) {
        self.after_all.push(Arc::new(hook));
    }

    pub fn add_before_test<F: Fn(&Config) + Send + Sync + 'static>(&mut self, hook: F) {
        self.before_test.push(Arc::new(hook));
    }

    pub fn add_after_test<F: Fn(&Config) + Send + Sync + 'static>(&mut self, hook: F) {
        self.after_test.push(Arc::new(hook));
    }

    pub fn add_before_step<F: Fn(&Config, &str) + Send + Sync + 'static>(&mut self, hook: F) {
        self.before_step.push(Arc::new(hook));
    }

    pub fn add_after_step<F: Fn(&Config, &str) + Send + Sync + 'static>(&mut self, hook: F) {
        self.after_step.push(Arc::new(hook));
    }

    /// Total number of registered hooks across all lists
    pub fn len(&self) -> usize {
        self.before_all.len()
            + self.after_all.len()
            + self.before_test.len()
            + self.after_test.len()
            + self.before_step.len()
            + self.after_step.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

impl Join for Hooks {
    fn join(&self, other: &Self) -> Self {
        Self {
            before_all: concat(&self.before_all, &other.before_all),
            after_all: concat(&self.after_all, &other.after_all),
            before_test: concat(&self.before_test, &other.before_test),
            after_test: concat(&self.after_test, &other.after_test),
            before_step: concat(&self.before_step, &other.before_step),
            after_step: concat(&self.after_step, &other.after_step),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_all", &self.before_all.len())
            .field("after_all", &self.after_all.len())
            .field("before_test", &self.before_test.len())
            .field("after_test", &self.after_test.len())
            .field("before_step", &self.before_step.len())
            .field("after_step", &self.after_step.len())
            .finish()
    }
}
