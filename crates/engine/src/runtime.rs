//! Middleware stacks and broadcast sinks
//!
//! A runtime lives on a single [`Config`] and is populated by plugins.
//!
//! ## Wrap chains
//!
//! A wrap turns an action into a new action that runs extra logic around
//! it. The chain is built by folding the registered wraps over the base
//! action in reverse registration order, so the first-registered wrap is
//! the outermost one:
//!
//! ```text
//! register W1, W2
//! run:  W1-before, W2-before, action, W2-after, W1-after
//! ```
//!
//! Test, step, setup and teardown actions each have their own chain.
//!
//! ## Sinks
//!
//! Log, assert and artefact sinks are invoked in registration order, all of
//! them, on every dispatch.

use crate::config::Config;
use axiom_core::{Artefact, Assert, Join, Log};
use std::fmt;
use std::rc::Rc;

/// The test body for one attempt
pub type TestAction<'a> = Box<dyn FnOnce(&Config) + 'a>;

/// A step, setup or teardown body
pub type StepAction<'a> = Box<dyn FnOnce() + 'a>;

/// Middleware around a test body
pub type TestWrap = Rc<dyn for<'a> Fn(TestAction<'a>) -> TestAction<'a>>;

/// Middleware around a named step, setup or teardown body
pub type StepWrap = Rc<dyn for<'a> Fn(&'a str, StepAction<'a>) -> StepAction<'a>>;

pub type LogSink = Rc<dyn Fn(&Log)>;
pub type AssertSink = Rc<dyn Fn(&Assert)>;
pub type ArtefactSink = Rc<dyn Fn(&Artefact)>;

/// Wrap chains and sinks for one execution context
#[derive(Clone, Default)]
pub struct Runtime {
    test_wraps: Vec<TestWrap>,
    step_wraps: Vec<StepWrap>,
    setup_wraps: Vec<StepWrap>,
    teardown_wraps: Vec<StepWrap>,

    log_sinks: Vec<LogSink>,
    assert_sinks: Vec<AssertSink>,
    artefact_sinks: Vec<ArtefactSink>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit_test_wrap<F>(&mut self, wrap: F)
    where
        F: for<'a> Fn(TestAction<'a>) -> TestAction<'a> + 'static,
    {
        self.test_wraps.push(Rc::new(wrap));
    }

    pub fn emit_step_wrap<F>(&mut self, wrap: F)
    where
        F: for<'a> Fn(&'a str, StepAction<'a>) -> StepAction<'a> + 'static,
    {
        self.step_wraps.push(Rc::new(wrap));
    }

    pub fn emit_setup_wrap<F>(&mut self, wrap: F)
    where
        F: for<'a> Fn(&'a str, StepAction<'a>) -> StepAction<'a> + 'static,
    {
        self.setup_wraps.push(Rc::new(wrap));
    }

    pub fn emit_teardown_wrap<F>(&mut self, wrap: F)
    where
        F: for<'a> Fn(&'a str, StepAction<'a>) -> StepAction<'a> + 'static,
    {
        self.teardown_wraps.push(Rc::new(wrap));
    }

    pub fn emit_log_sink<F: Fn(&Log) + 'static>(&mut self, sink: F) {
        self.log_sinks.push(Rc::new(sink));
    }

    pub fn emit_assert_sink<F: Fn(&Assert) + 'static>(&mut self, sink: F) {
        self.assert_sinks.push(Rc::new(sink));
    }

    pub fn emit_artefact_sink<F: Fn(&Artefact) + 'static>(&mut self, sink: F) {
        self.artefact_sinks.push(Rc::new(sink));
    }

    pub fn log(&self, log: &Log) {
        for sink in &self.log_sinks {
            sink(log);
        }
    }

    pub fn assert(&self, assert: &Assert) {
        for sink in &self.assert_sinks {
            sink(assert);
        }
    }

    pub fn artefact(&self, artefact: &Artefact) {
        for sink in &self.artefact_sinks {
            sink(artefact);
        }
    }

    /// Run a test body through the test wrap chain
    pub fn test<'a>(&self, cfg: &Config, action: TestAction<'a>) {
        let wrapped = self
            .test_wraps
            .iter()
            .rev()
            .fold(action, |next, wrap| wrap(next));
        wrapped(cfg);
    }

    /// Run a step body through the step wrap chain
    pub fn step<'a>(&self, name: &'a str, body: StepAction<'a>) {
        run_chain(&self.step_wraps, name, body);
    }

    /// Run a setup body through the setup wrap chain
    pub fn setup<'a>(&self, name: &'a str, body: StepAction<'a>) {
        run_chain(&self.setup_wraps, name, body);
    }

    /// Run a teardown body through the teardown wrap chain
    pub fn teardown<'a>(&self, name: &'a str, body: StepAction<'a>) {
        run_chain(&self.teardown_wraps, name, body);
    }
}

fn run_chain<'a>(wraps: &[StepWrap], name: &'a str, body: StepAction<'a>) {
    let wrapped = wraps.iter().rev().fold(body, |next, wrap| wrap(name, next));
    wrapped();
}

fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().chain(b.iter()).cloned().collect()
}

impl Join for Runtime {
    fn join(&self, other: &Self) -> Self {
        Self {
            test_wraps: concat(&self.test_wraps, &other.test_wraps),
            step_wraps: concat(&self.step_wraps, &other.step_wraps),
            setup_wraps: concat(&self.setup_wraps, &other.setup_wraps),
            teardown_wraps: concat(&self.teardown_wraps, &other.teardown_wraps),
            log_sinks: concat(&self.log_sinks, &other.log_sinks),
            assert_sinks: concat(&self.assert_sinks, &other.assert_sinks),
            artefact_sinks: concat(&self.artefact_sinks, &other.artefact_sinks),
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("test_wraps", &self.test_wraps.len())
            .field("step_wraps", &self.step_wraps.len())
            .field("setup_wraps", &self.setup_wraps.len())
            .field("teardown_wraps", &self.teardown_wraps.len())
            .field("log_sinks", &self.log_sinks.len())
            .field("assert_sinks", &self.assert_sinks.len())
            .field("artefact_sinks", &self.artefact_sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn trace(rt: &mut Runtime, order: &Rc<RefCell<Vec<String>>>, label: &'static str) {
        let order = Rc::clone(order);
        rt.emit_step_wrap(move |_name, next| {
            let order = Rc::clone(&order);
            Box::new(move || {
                order.borrow_mut().push(format!("{}-before", label));
                next();
                order.borrow_mut().push(format!("{}-after", label));
            })
        });
    }

    #[test]
    fn test_step_wrap_order_first_registered_is_outermost() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut rt = Runtime::new();
        trace(&mut rt, &order, "w1");
        trace(&mut rt, &order, "w2");

        let o = Rc::clone(&order);
        rt.step("login", Box::new(move || o.borrow_mut().push("action".into())));

        assert_eq!(
            *order.borrow(),
            vec!["w1-before", "w2-before", "action", "w2-after", "w1-after"]
        );
    }

    #[test]
    fn test_step_wrap_receives_name() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut rt = Runtime::new();
        let s = Rc::clone(&seen);
        rt.emit_step_wrap(move |name, next| {
            s.borrow_mut().push(name.to_string());
            next
        });

        rt.step("open page", Box::new(|| {}));
        rt.step("submit", Box::new(|| {}));
        assert_eq!(*seen.borrow(), vec!["open page", "submit"]);
    }

    #[test]
    fn test_setup_and_teardown_chains_are_separate() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut rt = Runtime::new();
        let h = Rc::clone(&hits);
        rt.emit_setup_wrap(move |name, next| {
            h.borrow_mut().push(format!("setup:{}", name));
            next
        });

        rt.teardown("db", Box::new(|| {}));
        assert!(hits.borrow().is_empty());
        rt.setup("db", Box::new(|| {}));
        assert_eq!(*hits.borrow(), vec!["setup:db"]);
    }

    #[test]
    fn test_sinks_called_in_order() {
        let got = Rc::new(RefCell::new(Vec::new()));
        let mut rt = Runtime::new();
        for id in 0..3 {
            let g = Rc::clone(&got);
            rt.emit_log_sink(move |l: &Log| g.borrow_mut().push(format!("{}:{}", id, l.text)));
        }

        rt.log(&Log::info("hello"));
        assert_eq!(*got.borrow(), vec!["0:hello", "1:hello", "2:hello"]);
    }

    #[test]
    fn test_assert_and_artefact_sinks() {
        let count = Rc::new(RefCell::new(0));
        let mut rt = Runtime::new();
        let c1 = Rc::clone(&count);
        rt.emit_assert_sink(move |_| *c1.borrow_mut() += 1);
        let c2 = Rc::clone(&count);
        rt.emit_artefact_sink(move |_| *c2.borrow_mut() += 10);

        rt.assert(&Assert::is_true(true, "ok"));
        rt.artefact(&Artefact::text("a", "b"));
        assert_eq!(*count.borrow(), 11);
    }

    #[test]
    fn test_join_concatenates() {
        let mut a = Runtime::new();
        a.emit_log_sink(|_| {});
        let mut b = Runtime::new();
        b.emit_log_sink(|_| {});
        b.emit_step_wrap(|_, next| next);

        let joined = a.join(&b);
        assert_eq!(joined.log_sinks.len(), 2);
        assert_eq!(joined.step_wraps.len(), 1);
    }
}
