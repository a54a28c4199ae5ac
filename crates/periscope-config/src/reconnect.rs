use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS};

/// Capped exponential backoff applied between connection attempts.
///
/// The supervisor never gives up; the policy only shapes how long it waits
/// after each consecutive failure.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay after the first failure, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Factor applied to the delay after each further failure.
    pub multiplier: u32,
}

impl ReconnectPolicy {
    /// Builds a policy from explicit bounds.
    #[must_use]
    pub const fn new(initial_delay_ms: u64, max_delay_ms: u64, multiplier: u32) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// Returns the delay to wait after `attempt` consecutive failures.
    ///
    /// `attempt` is zero-based: the first failure waits `initial_delay_ms`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier.max(1))
            .checked_pow(attempt)
            .unwrap_or(u64::MAX);
        let millis = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_INITIAL_DELAY_MS,
            DEFAULT_MAX_DELAY_MS,
            DEFAULT_BACKOFF_MULTIPLIER,
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 1_000)]
    #[case(1, 2_000)]
    #[case(3, 8_000)]
    #[case(5, 30_000)]
    #[case(200, 30_000)]
    fn default_policy_doubles_up_to_cap(#[case] attempt: u32, #[case] expected_ms: u64) {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn unit_multiplier_keeps_delay_constant() {
        let policy = ReconnectPolicy::new(250, 10_000, 1);
        assert_eq!(policy.delay_for(7), Duration::from_millis(250));
    }
}
