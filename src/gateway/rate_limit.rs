//! Per-provider token-bucket rate limiting (spec.md §4.1, §5).
//!
//! Rate-limit constants are configuration, not contracts — spec.md §9 notes
//! the source had conflicting FREE-tier numbers across providers, so this
//! takes the limit as a parameter rather than hardcoding per-provider
//! values.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// A classic token bucket: capacity tokens, refilled continuously at
/// `refill_per_sec`, consumed one-per-call.
struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-model concurrency cap plus per-provider token-bucket rate limiting.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    default_capacity: f64,
    default_refill_per_sec: f64,
}

impl RateLimiter {
    pub fn new(default_capacity: f64, default_refill_per_sec: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            default_capacity,
            default_refill_per_sec,
        }
    }

    /// Attempts to acquire one call slot for `provider`. Returns `false`
    /// when the bucket is currently empty (caller should surface
    /// `RATE_LIMIT`).
    pub fn try_acquire(&self, provider: &str) -> bool {
        let mut guard = self.buckets.lock().expect("rate limiter lock poisoned");
        let bucket = guard
            .entry(provider.to_string())
            .or_insert_with(|| Bucket::new(self.default_capacity, self.default_refill_per_sec));
        bucket.try_acquire()
    }

    pub fn configure(&self, provider: &str, capacity: f64, refill_per_sec: f64) {
        let mut guard = self.buckets.lock().expect("rate limiter lock poisoned");
        guard.insert(provider.to_string(), Bucket::new(capacity, refill_per_sec));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(10.0, 5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_then_refills() {
        let limiter = RateLimiter::new(2.0, 1000.0);
        assert!(limiter.try_acquire("openai"));
        assert!(limiter.try_acquire("openai"));
        assert!(!limiter.try_acquire("openai"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(limiter.try_acquire("openai"));
    }

    #[test]
    fn providers_are_independent() {
        let limiter = RateLimiter::new(1.0, 0.0);
        assert!(limiter.try_acquire("openai"));
        assert!(limiter.try_acquire("anthropic"));
        assert!(!limiter.try_acquire("openai"));
    }
}
