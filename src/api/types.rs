//! Request/response payloads for the HTTP surface (spec.md §6).

use serde::{Deserialize, Serialize};

use crate::config::DiagnosticsSnapshot;
use crate::domain::{Category, OrchestrationResult, Query, QueryConstraints, Tier};
use crate::error::ErrorKind;

/// `POST /v1/chat` request body (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub tier: Option<Tier>,
    /// Caller-preferred model ids. Advisory only: the router still owns
    /// final selection (spec.md §4.3) — the engine records a shortfall
    /// rather than guaranteeing these exact models run.
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default)]
    pub max_latency: Option<u8>,
}

impl From<ChatRequest> for Query {
    fn from(req: ChatRequest) -> Self {
        let mut query = Query::new(req.prompt);
        if let Some(tier) = req.tier {
            query = query.with_tier_hint(tier);
        }
        if let Some(category) = req.category {
            query = query.with_category_override(category);
        }
        query.constraints = QueryConstraints {
            max_latency_tier: req.max_latency,
            temperature: None,
        };
        query
    }
}

/// `POST /v1/chat` response body (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub final_text: String,
    pub category: Category,
    pub models_used: Vec<String>,
    pub tools_used: Vec<String>,
    pub strategy: String,
    pub confidence: f32,
    pub verified: bool,
    pub latency_ms: u64,
    pub cost_usd: f64,
    pub errors: Vec<ErrorKind>,
}

impl From<OrchestrationResult> for ChatResponse {
    fn from(result: OrchestrationResult) -> Self {
        Self {
            final_text: result.final_text,
            category: result.category,
            models_used: result.models_used,
            tools_used: result.tools_used,
            strategy: result.strategy,
            confidence: result.confidence,
            verified: result.verified,
            latency_ms: result.total_latency_ms(),
            cost_usd: result.cost_usd,
            errors: result.errors,
        }
    }
}

impl ChatResponse {
    /// Reconstructs an [`OrchestrationResult`] shape from a decoded HTTP
    /// response, for `bench run --mode http` to score against (the wire
    /// format already carries everything the scorer needs).
    pub fn into_orchestration_result(self, fallback_category: Category) -> OrchestrationResult {
        OrchestrationResult {
            final_text: self.final_text,
            category: if matches!(self.category, Category::General) {
                fallback_category
            } else {
                self.category
            },
            models_used: self.models_used,
            tools_used: self.tools_used,
            strategy: self.strategy,
            confidence: self.confidence,
            verified: self.verified,
            stage_latency_ms: vec![("total".to_string(), self.latency_ms)],
            cost_usd: self.cost_usd,
            errors: self.errors,
        }
    }
}

/// `GET /v1/status/diagnostics/config` response body (spec.md §6). Never
/// carries secret values, only the presence flags `DiagnosticsSnapshot`
/// already guarantees (spec.md §4.11, §8 property 7).
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsResponse {
    pub providers_loaded: std::collections::BTreeMap<String, bool>,
    pub provider_count: usize,
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<DiagnosticsSnapshot> for DiagnosticsResponse {
    fn from(snapshot: DiagnosticsSnapshot) -> Self {
        Self {
            providers_loaded: snapshot.providers_loaded,
            provider_count: snapshot.provider_count,
            is_valid: snapshot.is_valid,
            warnings: snapshot.warnings,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// `GET /v1/providers` response body (spec.md §6).
#[derive(Debug, Clone, Serialize)]
pub struct ProvidersResponse {
    pub available_providers: Vec<String>,
    pub unavailable_providers: Vec<String>,
    /// Whether the deployment is configured to fail requests outright
    /// for a provider with no registered gateway client, rather than
    /// silently excluding it from routing (this engine always does the
    /// latter — see `api::handlers::providers` — `fail_on_stub` reports
    /// that posture rather than switching it).
    pub fail_on_stub: bool,
}

/// Generic machine-readable error body returned for malformed requests
/// or authorization failures (spec.md §7: "user-visible failure text is
/// generic; detailed error kinds are reserved for the machine-readable
/// fields").
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub error: String,
}
