//! Axiom - layered test configuration and retrying execution
//!
//! Axiom lets a suite declare test configuration at three levels (suite
//! settings, runner, case) that merge deterministically into one execution
//! context, then runs that context through a retrying, hook-observable loop
//! on top of a host test harness.
//!
//! # Quick Start
//!
//! ```ignore
//! use axiom::{Case, LocalHost, Meta, Provided, Retry, Runner};
//!
//! let runner = Runner::builder()
//!     .meta(Meta::new().epic("checkout"))
//!     .retry(Retry::new().times(3))
//!     .build();
//!
//! let case = Case::new("pay with card")
//!     .fixture("card", |_| Ok(Provided::new("4242".to_string())));
//!
//! let host = LocalHost::new();
//! let outcome = runner.run_case(&host, &case, |cfg| {
//!     let card = cfg.require_fixture::<String>("card");
//!     cfg.step("submit", || assert_eq!(card.len(), 4));
//! });
//! ```
//!
//! # Architecture
//!
//! [`axiom_core`] holds the fragments and their merge algebra; it never
//! locks or performs I/O. [`axiom_engine`] holds registries, hooks, wrap
//! chains, the runner and the host seam. Both are re-exported here.

pub use axiom_core::*;
pub use axiom_engine::*;
