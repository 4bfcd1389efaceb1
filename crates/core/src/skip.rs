//! Skip policy

use crate::traits::Join;
use serde::{Deserialize, Serialize};

/// Whether a test must not run, and why
///
/// Join ORs `enabled`; `reason` is overridden only by a non-empty reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skip {
    pub enabled: bool,
    pub reason: String,
}

impl Skip {
    /// Not skipped
    pub fn new() -> Self {
        Self::default()
    }

    /// Skipped with a reason
    pub fn because(reason: impl Into<String>) -> Self {
        Self {
            enabled: true,
            reason: reason.into(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

impl Join for Skip {
    fn join(&self, other: &Self) -> Self {
        Self {
            enabled: self.enabled || other.enabled,
            reason: if other.reason.is_empty() {
                self.reason.clone()
            } else {
                other.reason.clone()
            },
        }
    }
}
