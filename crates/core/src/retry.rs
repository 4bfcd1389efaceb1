//! Retry policy
//!
//! Each field tracks whether it was explicitly set. `None` means unset and
//! never overrides on join; `Some(0)` is an explicit zero and does.

use crate::traits::{Join, Normalize};
use std::time::Duration;

/// Attempts used when the count is unset
pub const DEFAULT_RETRY_TIMES: u32 = 1;

/// Retry policy for a test case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Retry {
    times: Option<u32>,
    delay: Option<Duration>,
}

impl Retry {
    /// Unset policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly set the attempt count
    pub fn times(mut self, times: u32) -> Self {
        self.times = Some(times);
        self
    }

    /// Explicitly set the delay between attempts
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Attempt count, or the default when unset
    pub fn attempts(&self) -> u32 {
        self.times.unwrap_or(DEFAULT_RETRY_TIMES)
    }

    /// Delay between attempts, zero when unset
    pub fn wait(&self) -> Duration {
        self.delay.unwrap_or(Duration::ZERO)
    }

    /// Raw attempt count as set, if any
    pub fn times_set(&self) -> Option<u32> {
        self.times
    }

    /// Raw delay as set, if any
    pub fn delay_set(&self) -> Option<Duration> {
        self.delay
    }
}

impl Join for Retry {
    fn join(&self, other: &Self) -> Self {
        Self {
            times: other.times.or(self.times),
            delay: other.delay.or(self.delay),
        }
    }
}

impl Normalize for Retry {
    /// Clamp the count to at least one. Unset fields get defaults but stay
    /// marked as unset so a later join can still override them.
    fn normalize(&mut self) {
        if let Some(times) = self.times {
            if times < 1 {
                self.times = Some(1);
            }
        }
    }
}
