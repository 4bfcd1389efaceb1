//! The host test-execution collaborator
//!
//! The engine never records results or schedules work itself. It asks a
//! [`Host`] to run a named sub-test, to skip a test, to mark one eligible
//! for parallel scheduling, and to run a callback at suite end.
//! [`LocalHost`] is a sequential in-process implementation.

use crate::config::panic_message;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Handle to a running sub-test
pub trait Subtest {
    /// Mark the sub-test failed with a message
    fn fail(&self, message: &str);
}

/// Test-execution primitive the engine runs on top of
pub trait Host {
    /// Run `body` as a named sub-test. Returns true if it passed.
    fn run(&self, name: &str, body: &mut dyn FnMut(&dyn Subtest)) -> bool;

    /// Skip the named test
    fn skip(&self, name: &str, reason: &str);

    /// Mark the named test eligible for parallel execution
    fn parallel(&self, name: &str);

    /// Run `cleanup` when the suite ends
    fn defer(&self, cleanup: Box<dyn FnOnce() + Send>);
}

/// Recorded result of one sub-test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtestRecord {
    pub name: String,
    pub failures: Vec<String>,
}

impl SubtestRecord {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
struct Recorder {
    failures: Mutex<Vec<String>>,
}

impl Subtest for Recorder {
    fn fail(&self, message: &str) {
        self.failures.lock().push(message.to_string());
    }
}

/// Sequential host recording everything in memory
///
/// Deferred callbacks run in reverse registration order on [`finish`] or
/// when the host is dropped.
///
/// [`finish`]: LocalHost::finish
#[derive(Default)]
pub struct LocalHost {
    runs: Mutex<Vec<SubtestRecord>>,
    skips: Mutex<Vec<(String, String)>>,
    parallel: Mutex<Vec<String>>,
    deferred: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sub-test run so far, in order
    pub fn runs(&self) -> Vec<SubtestRecord> {
        self.runs.lock().clone()
    }

    /// (name, reason) of every skipped test
    pub fn skips(&self) -> Vec<(String, String)> {
        self.skips.lock().clone()
    }

    /// Names marked for parallel execution
    pub fn parallel_marks(&self) -> Vec<String> {
        self.parallel.lock().clone()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.lock().len()
    }

    /// Run deferred callbacks, last registered first
    pub fn finish(&self) {
        loop {
            // Pop under the lock, run outside it: a callback may defer more
            let next = self.deferred.lock().pop();
            let Some(cleanup) = next else { break };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                warn!(target: "axiom::runner", error = %panic_message(payload.as_ref()), "Deferred cleanup panicked");
            }
        }
    }
}

impl Host for LocalHost {
    fn run(&self, name: &str, body: &mut dyn FnMut(&dyn Subtest)) -> bool {
        let recorder = Recorder::default();
        let result = panic::catch_unwind(AssertUnwindSafe(|| body(&recorder)));
        if let Err(payload) = result {
            recorder.fail(&format!("panic: {}", panic_message(payload.as_ref())));
        }

        let record = SubtestRecord {
            name: name.to_string(),
            failures: recorder.failures.into_inner(),
        };
        let passed = record.passed();
        self.runs.lock().push(record);
        passed
    }

    fn skip(&self, name: &str, reason: &str) {
        self.skips.lock().push((name.to_string(), reason.to_string()));
    }

    fn parallel(&self, name: &str) {
        self.parallel.lock().push(name.to_string());
    }

    fn defer(&self, cleanup: Box<dyn FnOnce() + Send>) {
        self.deferred.lock().push(cleanup);
    }
}

impl Drop for LocalHost {
    fn drop(&mut self) {
        self.finish();
    }
}
