//! Execution engine for axiom
//!
//! This crate drives merged test configurations through the host:
//! - Registry / LazyCache: named lazy providers with memoized results
//! - Fixtures (per attempt) and Resources (per runner, shared across threads)
//! - Hooks: lifecycle callback lists
//! - Runtime: wrap chains and sinks populated by plugins
//! - Case, Runner, Config: templates and the merged execution context
//! - Host: the test-execution collaborator, plus LocalHost
//! - SuiteSettings: suite defaults loaded from `axiom.toml`
//!
//! The engine spawns no threads. The only intentional blocking point is the
//! delay between retry attempts.

#![warn(clippy::all)]

pub mod case;
pub mod config;
pub mod fixture;
pub mod hooks;
pub mod host;
pub mod outcome;
pub mod plugin;
pub mod registry;
pub mod resource;
pub mod runner;
pub mod runtime;
pub mod settings;

pub use case::Case;
pub use config::Config;
pub use fixture::{Fixture, FixtureRegistry, Fixtures};
pub use hooks::{AllHook, Hooks, StepHook, TestHook};
pub use host::{Host, LocalHost, Subtest, SubtestRecord};
pub use outcome::{CaseOutcome, CaseStatus};
pub use plugin::{use_fixtures, use_resources, Plugin};
pub use registry::{Cleanup, LazyCache, Provided, Provider, ProviderResult, Registry};
pub use resource::{Resource, ResourceRegistry, Resources};
pub use runner::{Runner, RunnerBuilder};
pub use runtime::{
    ArtefactSink, AssertSink, LogSink, Runtime, StepAction, StepWrap, TestAction, TestWrap,
};
pub use settings::{RetrySettings, SuiteSettings, SETTINGS_FILE_NAME};
