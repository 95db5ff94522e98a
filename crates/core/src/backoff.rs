//! Doubling retry delays for transient status-query failures.

use std::time::Duration;

/// Bounds for the retry delay sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Begin a fresh delay sequence.
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            upcoming: self.initial.min(self.max),
        }
    }
}

/// Delay sequence for one streak of consecutive failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    upcoming: Duration,
}

impl Backoff {
    /// Delay to wait before the next retry.  Each call doubles the
    /// following delay, up to the policy maximum.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.upcoming;
        self.upcoming = self.upcoming.saturating_mul(2).min(self.policy.max);
        delay
    }

    /// Forget the streak after a successful query.
    pub fn reset(&mut self) {
        self.upcoming = self.policy.initial.min(self.policy.max);
    }
}
