//! The provider-specific half of the Provider Gateway (spec.md §4.1).
//!
//! One [`ProviderClient`] implementation per backend, matching the shape of
//! `rand-loop/rlm-core`'s `LLMClient` trait: a single async `complete`
//! method, no provider-specific glue above this layer (spec.md §9:
//! "Provider-specific glue scattered across modules" migration).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{PromptEnvelope, Usage};
use crate::error::GatewayError;

/// Caller-tunable generation parameters (spec.md §4.1).
#[derive(Debug, Clone, Copy)]
pub struct CallParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub top_p: f32,
}

impl Default for CallParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            top_p: 1.0,
        }
    }
}

/// The text + usage a provider call produced, before gateway-level policy
/// (retries, circuit breaking) is applied.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub text: String,
    pub usage: Usage,
}

/// One backend a model can be routed to. Implementations must never invent
/// text on failure (spec.md §4.1): any non-`ok` outcome is a `GatewayError`.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn complete(
        &self,
        model: &str,
        envelope: &PromptEnvelope,
        params: CallParams,
    ) -> Result<RawCompletion, GatewayError>;
}

/// Request body shared by OpenAI-compatible chat-completions endpoints
/// (OpenAI, Together, OpenRouter, DeepSeek, Grok all speak this dialect).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOwned,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOwned {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// A client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatibleClient {
    provider: String,
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    cost_per_1k_prompt: f64,
    cost_per_1k_completion: f64,
}

impl OpenAiCompatibleClient {
    pub fn new(provider: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            cost_per_1k_prompt: 0.0,
            cost_per_1k_completion: 0.0,
        }
    }

    pub fn with_cost(mut self, prompt: f64, completion: f64) -> Self {
        self.cost_per_1k_prompt = prompt;
        self.cost_per_1k_completion = completion;
        self
    }
}

#[async_trait]
impl ProviderClient for OpenAiCompatibleClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(
        &self,
        model: &str,
        envelope: &PromptEnvelope,
        params: CallParams,
    ) -> Result<RawCompletion, GatewayError> {
        if self.api_key.is_empty() {
            return Err(GatewayError::MissingSecret {
                provider: self.provider.clone(),
            });
        }

        let body = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: envelope.system.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: envelope.render(),
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
        };

        let send = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(params.timeout)
            .send();

        let started = Instant::now();
        let response = tokio::time::timeout(params.timeout, send)
            .await
            .map_err(|_| GatewayError::Timeout {
                provider: self.provider.clone(),
            })?
            .map_err(|e| classify_reqwest_error(&self.provider, &e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GatewayError::RateLimit {
                provider: self.provider.clone(),
            });
        }
        if status.is_client_error() {
            return Err(GatewayError::InvalidRequest(format!(
                "{} returned {status}",
                self.provider
            )));
        }
        if status.is_server_error() {
            return Err(GatewayError::Transient {
                provider: self.provider.clone(),
                detail: format!("status {status}"),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| GatewayError::Transient {
            provider: self.provider.clone(),
            detail: e.to_string(),
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let usage = parsed.usage.unwrap_or_default();
        let _elapsed = started.elapsed();

        Ok(RawCompletion {
            text,
            usage: Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                cost_usd: usage.prompt_tokens as f64 / 1000.0 * self.cost_per_1k_prompt
                    + usage.completion_tokens as f64 / 1000.0 * self.cost_per_1k_completion,
            },
        })
    }
}

fn classify_reqwest_error(provider: &str, err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            provider: provider.to_string(),
        }
    } else if err.is_connect() {
        GatewayError::ProviderDown {
            provider: provider.to_string(),
        }
    } else {
        GatewayError::Transient {
            provider: provider.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Anthropic's `/v1/messages` wire format differs enough from the OpenAI
/// dialect to warrant its own client, matching `rlm-core`'s
/// `AnthropicClient`.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl AnthropicClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        model: &str,
        envelope: &PromptEnvelope,
        params: CallParams,
    ) -> Result<RawCompletion, GatewayError> {
        if self.api_key.is_empty() {
            return Err(GatewayError::MissingSecret {
                provider: "anthropic".to_string(),
            });
        }

        let body = AnthropicRequest {
            model,
            max_tokens: params.max_tokens,
            system: &envelope.system,
            messages: vec![ChatMessage {
                role: "user",
                content: envelope.render(),
            }],
            temperature: params.temperature,
        };

        let send = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&body)
            .timeout(params.timeout)
            .send();

        let response = tokio::time::timeout(params.timeout, send)
            .await
            .map_err(|_| GatewayError::Timeout {
                provider: "anthropic".to_string(),
            })?
            .map_err(|e| classify_reqwest_error("anthropic", &e))?;

        if response.status().as_u16() == 429 {
            return Err(GatewayError::RateLimit {
                provider: "anthropic".to_string(),
            });
        }
        if response.status().is_server_error() {
            return Err(GatewayError::Transient {
                provider: "anthropic".to_string(),
                detail: format!("status {}", response.status()),
            });
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|e| GatewayError::Transient {
            provider: "anthropic".to_string(),
            detail: e.to_string(),
        })?;

        let text = parsed
            .content
            .into_iter()
            .find_map(|b| b.text)
            .unwrap_or_default();

        Ok(RawCompletion {
            text,
            usage: Usage {
                prompt_tokens: parsed.usage.input_tokens,
                completion_tokens: parsed.usage.output_tokens,
                cost_usd: 0.0,
            },
        })
    }
}

/// Deterministic, network-free client used by tests and the benchmark
/// harness's `mode=local` runs.
pub struct MockClient {
    provider: String,
    pub responder: Box<dyn Fn(&str, &PromptEnvelope) -> String + Send + Sync>,
}

impl MockClient {
    pub fn new(provider: impl Into<String>, responder: impl Fn(&str, &PromptEnvelope) -> String + Send + Sync + 'static) -> Self {
        Self {
            provider: provider.into(),
            responder: Box::new(responder),
        }
    }

    pub fn echo(provider: impl Into<String>) -> Self {
        Self::new(provider, |_model, envelope| envelope.user.clone())
    }
}

#[async_trait]
impl ProviderClient for MockClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(
        &self,
        model: &str,
        envelope: &PromptEnvelope,
        _params: CallParams,
    ) -> Result<RawCompletion, GatewayError> {
        let text = (self.responder)(model, envelope);
        Ok(RawCompletion {
            text: text.clone(),
            usage: Usage {
                prompt_tokens: envelope.render().split_whitespace().count() as u32,
                completion_tokens: text.split_whitespace().count() as u32,
                cost_usd: 0.0,
            },
        })
    }
}
