//! Parallel scheduling opt-in

use crate::traits::Join;
use serde::{Deserialize, Serialize};

/// Whether a test may run concurrently with its siblings
///
/// Join is a logical OR: once any layer opts in, the test is parallel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parallel {
    pub enabled: bool,
}

impl Parallel {
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl Join for Parallel {
    fn join(&self, other: &Self) -> Self {
        Self {
            enabled: self.enabled || other.enabled,
        }
    }
}
