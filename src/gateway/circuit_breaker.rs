//! Per-provider circuit breaker (spec.md §4.1 "PROVIDER_DOWN").
//!
//! Tracks consecutive failures per provider id. When failures exceed a
//! threshold the circuit opens and calls are rejected with
//! [`GatewayError::ProviderDown`] until a cooldown elapses, at which point
//! one probe call is allowed through (half-open). Grounded on
//! `coordination/src/router/circuit_breaker.rs`.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

struct ProviderState {
    consecutive_failures: u32,
    last_failure_secs: u64,
}

/// Per-provider circuit breaker. Interior-mutable so it can be shared behind
/// an `Arc` without requiring `&mut` across concurrent gateway calls.
pub struct CircuitBreaker {
    state: RwLock<HashMap<String, ProviderState>>,
    failure_threshold: u32,
    cooldown_secs: u64,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown_secs: u64) -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            failure_threshold,
            cooldown_secs,
        }
    }

    pub fn record_success(&self, provider: &str) {
        let mut guard = self.state.write().expect("circuit breaker lock poisoned");
        guard.remove(provider);
    }

    pub fn record_failure(&self, provider: &str) {
        let mut guard = self.state.write().expect("circuit breaker lock poisoned");
        let entry = guard.entry(provider.to_string()).or_insert(ProviderState {
            consecutive_failures: 0,
            last_failure_secs: 0,
        });
        entry.consecutive_failures += 1;
        entry.last_failure_secs = unix_now();
    }

    pub fn state(&self, provider: &str) -> CircuitState {
        let guard = self.state.read().expect("circuit breaker lock poisoned");
        let Some(entry) = guard.get(provider) else {
            return CircuitState::Closed;
        };
        if entry.consecutive_failures < self.failure_threshold {
            return CircuitState::Closed;
        }
        if unix_now().saturating_sub(entry.last_failure_secs) >= self.cooldown_secs {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    pub fn is_available(&self, provider: &str) -> bool {
        !matches!(self.state(provider), CircuitState::Open)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, 30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new(3, 60);
        assert_eq!(cb.state("openai"), CircuitState::Closed);
        cb.record_failure("openai");
        cb.record_failure("openai");
        assert_eq!(cb.state("openai"), CircuitState::Closed);
        cb.record_failure("openai");
        assert_eq!(cb.state("openai"), CircuitState::Open);
        assert!(!cb.is_available("openai"));
    }

    #[test]
    fn success_resets_circuit() {
        let cb = CircuitBreaker::new(2, 60);
        cb.record_failure("anthropic");
        cb.record_failure("anthropic");
        assert_eq!(cb.state("anthropic"), CircuitState::Open);
        cb.record_success("anthropic");
        assert_eq!(cb.state("anthropic"), CircuitState::Closed);
    }

    #[test]
    fn half_open_after_cooldown() {
        let cb = CircuitBreaker::new(1, 0);
        cb.record_failure("gemini");
        assert_eq!(cb.state("gemini"), CircuitState::HalfOpen);
    }
}
