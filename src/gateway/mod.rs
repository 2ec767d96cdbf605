//! Provider Gateway (spec.md §4.1): a uniform `call(model, envelope, params)
//! → ModelResponse` over many LLM backends, rate-limit and timeout aware.
//!
//! Composition mirrors `coordination/src/router/circuit_breaker.rs` +
//! `coordination/src/resilience.rs`: a per-provider token bucket and
//! circuit breaker sit in front of a pluggable [`ProviderClient`], with
//! bounded retry-with-backoff for transient/rate-limit errors only.

pub mod circuit_breaker;
pub mod client;
pub mod rate_limit;
pub mod retry;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::{ModelResponse, PromptEnvelope, Usage};
use crate::error::GatewayError;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::{AnthropicClient, CallParams, MockClient, OpenAiCompatibleClient, ProviderClient, RawCompletion};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

/// A `(provider, model)` pair routable through the gateway.
#[derive(Debug, Clone)]
pub struct RoutableModel {
    pub provider: String,
    pub model_id: String,
}

/// The Provider Gateway. Holds one [`ProviderClient`] per provider id plus
/// the shared rate limiter, circuit breaker, and retry policy all
/// orchestrations draw on (spec.md §5: "Provider rate limits and
/// concurrency caps: enforced by the gateway; all orchestrations share
/// them").
pub struct Gateway {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    rate_limiter: RateLimiter,
    breaker: CircuitBreaker,
    retry_policy: RetryPolicy,
}

impl Gateway {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            rate_limiter: RateLimiter::default(),
            breaker: CircuitBreaker::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn register(&mut self, client: Arc<dyn ProviderClient>) {
        self.clients.insert(client.provider_name().to_string(), client);
    }

    pub fn is_registered(&self, provider: &str) -> bool {
        self.clients.contains_key(provider)
    }

    /// Every provider id with a registered client, for the provider
    /// discovery endpoint (spec.md §6 `GET /v1/providers`).
    pub fn registered_providers(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    /// Executes one logical call against `model`, applying rate limiting,
    /// circuit breaking, and bounded retry. Never fabricates text on
    /// failure (spec.md §4.1) — the `Err` variant is the caller's only
    /// signal.
    pub async fn call(
        &self,
        model: &RoutableModel,
        envelope: &PromptEnvelope,
        params: CallParams,
    ) -> Result<ModelResponse, GatewayError> {
        let Some(client) = self.clients.get(&model.provider) else {
            return Err(GatewayError::InvalidRequest(format!(
                "no client registered for provider '{}'",
                model.provider
            )));
        };

        if !self.breaker.is_available(&model.provider) {
            warn!(provider = %model.provider, "circuit open, refusing call");
            return Err(GatewayError::ProviderDown {
                provider: model.provider.clone(),
            });
        }

        let mut last_err: Option<GatewayError> = None;
        for attempt in 1..=self.retry_policy.max_attempts {
            if !self.rate_limiter.try_acquire(&model.provider) {
                last_err = Some(GatewayError::RateLimit {
                    provider: model.provider.clone(),
                });
                tokio::time::sleep(self.retry_policy.delay_for(attempt)).await;
                continue;
            }

            let started = Instant::now();
            debug!(provider = %model.provider, model = %model.model_id, attempt, "gateway call");
            match client.complete(&model.model_id, envelope, params).await {
                Ok(raw) => {
                    self.breaker.record_success(&model.provider);
                    let latency_ms = started.elapsed().as_millis() as u64;
                    info!(provider = %model.provider, model = %model.model_id, latency_ms, "gateway call ok");
                    return Ok(to_model_response(&model.model_id, raw, latency_ms));
                }
                Err(e) => {
                    self.breaker.record_failure(&model.provider);
                    warn!(provider = %model.provider, error = %e, attempt, "gateway call failed");
                    let retryable = e.is_retryable();
                    last_err = Some(e);
                    if !retryable || attempt == self.retry_policy.max_attempts {
                        break;
                    }
                    tokio::time::sleep(self.retry_policy.delay_for(attempt)).await;
                }
            }
        }

        Err(last_err.unwrap_or(GatewayError::InvalidRequest("no attempts made".to_string())))
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

/// OpenAI-compatible base URLs for the providers that speak that dialect
/// (spec.md §9 migration: "a single Provider Gateway abstraction with
/// one variant per provider"). Anthropic is the one provider with its
/// own wire format, handled by [`AnthropicClient`] instead.
const OPENAI_COMPATIBLE_BASE_URLS: &[(&str, &str)] = &[
    ("openai", "https://api.openai.com/v1"),
    ("gemini", "https://generativelanguage.googleapis.com/v1beta/openai"),
    ("grok", "https://api.x.ai/v1"),
    ("deepseek", "https://api.deepseek.com/v1"),
    ("together", "https://api.together.xyz/v1"),
    ("openrouter", "https://openrouter.ai/api/v1"),
];

/// Builds a gateway with one client per provider the secrets contract
/// recognises, reading each provider's key straight from the process
/// environment (the gateway needs the raw value; `config::Settings`
/// only ever exposes presence). A provider with no key registered still
/// gets a client — it simply fails every call with `MissingSecret`
/// until one is set — so `GET /v1/providers` can distinguish "no
/// client" from "client with no key". Shared by `llmhive-server` and
/// `llmhive-bench --mode local`.
pub fn from_env() -> Gateway {
    let mut gateway = Gateway::new();
    for (provider, base_url) in OPENAI_COMPATIBLE_BASE_URLS {
        let key = std::env::var(provider_env_key(provider)).unwrap_or_default();
        gateway.register(Arc::new(OpenAiCompatibleClient::new(*provider, *base_url, key)));
    }
    let anthropic_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    gateway.register(Arc::new(AnthropicClient::new(anthropic_key)));
    gateway
}

fn provider_env_key(provider: &str) -> &'static str {
    crate::config::PROVIDER_ENV_KEYS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, env_key)| *env_key)
        .unwrap_or("")
}

fn to_model_response(model_id: &str, raw: RawCompletion, latency_ms: u64) -> ModelResponse {
    ModelResponse::ok(model_id, raw.text, raw.usage, latency_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn envelope() -> PromptEnvelope {
        PromptEnvelope::new("system", "2 + 2", "answer plainly")
    }

    #[tokio::test]
    async fn successful_call_returns_ok_response() {
        let mut gw = Gateway::new();
        gw.register(Arc::new(MockClient::echo("test-provider")));

        let model = RoutableModel {
            provider: "test-provider".to_string(),
            model_id: "echo-1".to_string(),
        };

        let result = gw.call(&model, &envelope(), CallParams::default()).await.unwrap();
        assert!(result.is_ok());
        assert_eq!(result.raw_text, "2 + 2");
    }

    #[tokio::test]
    async fn unregistered_provider_is_invalid_request() {
        let gw = Gateway::new();
        let model = RoutableModel {
            provider: "nope".to_string(),
            model_id: "m".to_string(),
        };
        let err = gw.call(&model, &envelope(), CallParams::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        struct FlakyClient {
            calls: Arc<AtomicU32>,
        }
        #[async_trait::async_trait]
        impl ProviderClient for FlakyClient {
            fn provider_name(&self) -> &str {
                "flaky"
            }
            async fn complete(
                &self,
                _model: &str,
                _envelope: &PromptEnvelope,
                _params: CallParams,
            ) -> Result<RawCompletion, GatewayError> {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(GatewayError::Transient {
                        provider: "flaky".to_string(),
                        detail: "boom".to_string(),
                    })
                } else {
                    Ok(RawCompletion {
                        text: "ok".to_string(),
                        usage: Usage::default(),
                    })
                }
            }
        }

        let mut gw = Gateway::new().with_retry_policy(RetryPolicy {
            max_attempts: 2,
            base_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(5),
        });
        gw.register(Arc::new(FlakyClient { calls }));

        let model = RoutableModel {
            provider: "flaky".to_string(),
            model_id: "m".to_string(),
        };
        let result = gw.call(&model, &envelope(), CallParams::default()).await.unwrap();
        assert_eq!(result.raw_text, "ok");
        assert_eq!(calls2.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_request_is_not_retried() {
        struct AlwaysInvalid;
        #[async_trait::async_trait]
        impl ProviderClient for AlwaysInvalid {
            fn provider_name(&self) -> &str {
                "bad"
            }
            async fn complete(
                &self,
                _model: &str,
                _envelope: &PromptEnvelope,
                _params: CallParams,
            ) -> Result<RawCompletion, GatewayError> {
                Err(GatewayError::InvalidRequest("nope".to_string()))
            }
        }
        let mut gw = Gateway::new();
        gw.register(Arc::new(AlwaysInvalid));
        let model = RoutableModel {
            provider: "bad".to_string(),
            model_id: "m".to_string(),
        };
        let err = gw.call(&model, &envelope(), CallParams::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn circuit_opens_after_repeated_failure() {
        struct AlwaysDown;
        #[async_trait::async_trait]
        impl ProviderClient for AlwaysDown {
            fn provider_name(&self) -> &str {
                "down"
            }
            async fn complete(
                &self,
                _model: &str,
                _envelope: &PromptEnvelope,
                _params: CallParams,
            ) -> Result<RawCompletion, GatewayError> {
                Err(GatewayError::Transient {
                    provider: "down".to_string(),
                    detail: "x".to_string(),
                })
            }
        }
        let mut gw = Gateway::new().with_retry_policy(RetryPolicy {
            max_attempts: 1,
            base_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(1),
        });
        gw.register(Arc::new(AlwaysDown));
        let model = RoutableModel {
            provider: "down".to_string(),
            model_id: "m".to_string(),
        };
        for _ in 0..5 {
            let _ = gw.call(&model, &envelope(), CallParams::default()).await;
        }
        let err = gw.call(&model, &envelope(), CallParams::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::ProviderDown { .. }));
    }
}
