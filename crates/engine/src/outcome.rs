//! Case outcome classification

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Terminal state of one case invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    /// Skip policy was enabled; the body never ran
    Skipped,
    /// Succeeded on the first attempt
    Passed,
    /// Succeeded after at least one failed attempt
    Flaky,
    /// Every attempt failed
    Failed,
}

impl CaseStatus {
    /// Classify from the skip flag and the attempt that succeeded, if any
    pub fn classify(skipped: bool, passed_on: Option<u32>) -> Self {
        match (skipped, passed_on) {
            (true, _) => CaseStatus::Skipped,
            (false, Some(1)) => CaseStatus::Passed,
            (false, Some(_)) => CaseStatus::Flaky,
            (false, None) => CaseStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CaseStatus::Passed | CaseStatus::Flaky)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaseStatus::Skipped => "skipped",
            CaseStatus::Passed => "passed",
            CaseStatus::Flaky => "flaky",
            CaseStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of [`Runner::run_case`](crate::Runner::run_case)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseOutcome {
    pub id: String,
    pub name: String,
    pub status: CaseStatus,
    /// Attempts actually executed; zero when skipped
    pub attempts: u32,
    /// Wall time including retry delays
    pub duration: Duration,
}
