//! Core types for axiom
//!
//! This crate defines the configuration fragments and the merge algebra that
//! combines them:
//! - Join / Normalize: the merge traits every fragment implements
//! - Meta, Skip, Retry, Parallel, Context: the fragments
//! - Handle: ambient cancellation/deadline token carried by Context
//! - Value: type-erased payload with checked downcasts
//! - Log, Assert, Artefact: records broadcast to sinks
//! - Error: error taxonomy for lookups and settings
//!
//! Nothing here locks, blocks or performs I/O.

#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod meta;
pub mod parallel;
pub mod record;
pub mod retry;
pub mod skip;
pub mod traits;
pub mod value;

pub use context::{Context, Handle};
pub use error::{BoxError, Error, Result, Scope};
pub use meta::{Meta, Severity};
pub use parallel::Parallel;
pub use record::{Artefact, ArtefactKind, Assert, AssertKind, Log, LogLevel};
pub use retry::{Retry, DEFAULT_RETRY_TIMES};
pub use skip::Skip;
pub use traits::{Join, Normalize};
pub use value::Value;
