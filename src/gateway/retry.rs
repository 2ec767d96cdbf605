//! Bounded retry with exponential backoff and jitter (spec.md §4.1).

use std::time::Duration;

use rand::Rng;

/// Retry policy: exponential backoff with full jitter, capped at `max_attempts`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry attempt `attempt` (1-indexed), with full jitter:
    /// uniform random in `[0, min(max_delay, base * 2^(attempt-1)))`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis() as u64 * 2u64.saturating_pow(attempt.saturating_sub(1));
        let capped = exp.min(self.max_delay.as_millis() as u64).max(1);
        let jittered = rand::thread_rng().gen_range(0..=capped);
        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_but_stays_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };
        for attempt in 1..=5 {
            let d = policy.delay_for(attempt);
            assert!(d <= Duration::from_secs(1));
        }
    }
}
