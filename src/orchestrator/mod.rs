//! Orchestrator Core (spec.md §4.9): drives one `Query` through
//! `Classify → Route → Tool-Broker → Handler → Consensus/Verify → Refine →
//! Emit` and assembles the resulting `OrchestrationResult`.
//!
//! Routing and tool pre-execution are not separate stages here: each
//! handler already owns the catalog lookups and tool calls its category
//! needs (the math handler calls the calculator, the coding handler calls
//! the sandbox, the RAG handler calls retrieve/rerank), the same way
//! `coordination/src/ensemble/coordinator.rs` leaves per-task tool use to
//! its task handlers rather than a generic pre-pass. What this module adds
//! on top is exactly what spec.md §4.9 assigns the orchestrator: timing,
//! strategy naming, cost aggregation, deadline enforcement, and the final
//! contract check before a result is allowed to leave the pipeline.

use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::classifier::Classifier;
use crate::domain::{Category, Complexity, OrchestrationResult, Query};
use crate::error::ErrorKind;
use crate::events::{EventBus, StageEvent};
use crate::gateway::Gateway;
use crate::handlers::{self, HandlerContext};
use crate::refiner;
use crate::tools::ToolBroker;

/// Per-orchestration deadline (spec.md §5: "per-orchestration deadlines;
/// on expiry, in-flight LLM and tool calls are cancelled"). 45s covers the
/// coding handler's worst case of three sequential sandbox-bounded LLM
/// round trips with headroom to spare.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(45);

pub struct Orchestrator {
    gateway: Gateway,
    catalog: Catalog,
    tools: ToolBroker,
    classifier: Classifier,
    deadline: Duration,
}

impl Orchestrator {
    pub fn new(gateway: Gateway, catalog: Catalog, tools: ToolBroker) -> Self {
        Self {
            gateway,
            catalog,
            tools,
            classifier: Classifier::new(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// The underlying gateway, exposed read-only for the provider
    /// discovery endpoint (spec.md §6 `GET /v1/providers`).
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Runs one orchestration to completion. Never returns `Err` — any
    /// failure along the pipeline is recorded in the result's `errors[]`
    /// instead (spec.md §3 invariant 1: no silent fallbacks without
    /// recording them).
    pub async fn run(&self, query: &Query) -> OrchestrationResult {
        let run_id = Uuid::new_v4();
        let bus = EventBus::new();
        let mut stage_latency_ms = Vec::new();
        let mut errors = Vec::new();

        let classify_started = Instant::now();
        let analysis = match self.classifier.classify(query) {
            Ok(analysis) => analysis,
            Err(_) => {
                // Empty prompt: the only way the classifier refuses. There
                // is no handler to dispatch to, so emit a minimal result
                // recording CATEGORY_UNKNOWN rather than panicking.
                errors.push(ErrorKind::CategoryUnknown);
                stage_latency_ms.push(("classify".to_string(), classify_started.elapsed().as_millis() as u64));
                return OrchestrationResult {
                    final_text: String::new(),
                    category: Category::General,
                    models_used: Vec::new(),
                    tools_used: Vec::new(),
                    strategy: "none".to_string(),
                    confidence: 0.0,
                    verified: false,
                    stage_latency_ms,
                    cost_usd: 0.0,
                    errors,
                };
            }
        };
        stage_latency_ms.push(("classify".to_string(), classify_started.elapsed().as_millis() as u64));
        info!(run_id = %run_id, category = %analysis.category, classifier_version = %analysis.classifier_version, "classified");

        let ctx = HandlerContext::new(&self.gateway, &self.catalog, &self.tools);
        let prompt = analysis.rewritten_prompt.clone();

        let handle_started = Instant::now();
        let dispatch_future = handlers::dispatch(&ctx, &analysis, &prompt);

        let outcome = match tokio::time::timeout(self.deadline, dispatch_future).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(handler_error)) => {
                warn!(run_id = %run_id, error = %handler_error, "handler failed");
                errors.push(handler_error.to_error_kind());
                stage_latency_ms.push(("handle".to_string(), handle_started.elapsed().as_millis() as u64));
                return OrchestrationResult {
                    final_text: String::new(),
                    category: analysis.category,
                    models_used: Vec::new(),
                    tools_used: Vec::new(),
                    strategy: "none".to_string(),
                    confidence: 0.0,
                    verified: false,
                    stage_latency_ms,
                    cost_usd: 0.0,
                    errors,
                };
            }
            Err(_elapsed) => {
                warn!(run_id = %run_id, "orchestration deadline expired");
                errors.push(ErrorKind::PartialTimeout);
                stage_latency_ms.push(("handle".to_string(), handle_started.elapsed().as_millis() as u64));
                return OrchestrationResult {
                    final_text: String::new(),
                    category: analysis.category,
                    models_used: Vec::new(),
                    tools_used: Vec::new(),
                    strategy: "partial-timeout".to_string(),
                    confidence: 0.0,
                    verified: false,
                    stage_latency_ms,
                    cost_usd: 0.0,
                    errors,
                };
            }
        };
        stage_latency_ms.push(("handle".to_string(), handle_started.elapsed().as_millis() as u64));

        for model_id in &outcome.models_used {
            bus.publish(StageEvent::ModelInvoked {
                model_id: model_id.clone(),
                provider: String::new(),
            });
        }
        for tool in &outcome.tools_used {
            bus.publish(StageEvent::ToolInvoked {
                tool: tool.clone(),
                ok: true,
            });
        }

        errors.extend(outcome.errors.iter().cloned());

        let refine_started = Instant::now();
        let highest_scoring_choice = best_candidate_text(&outcome);
        let refined = refiner::refine(analysis.category, &outcome.final_text, highest_scoring_choice.as_deref());
        if let Some(fallback) = &refined.fallback {
            errors.push(fallback.clone());
        }
        stage_latency_ms.push(("refine".to_string(), refine_started.elapsed().as_millis() as u64));

        let final_text = enforce_contract(analysis.category, refined.text, &mut errors);

        let cost_usd: f64 = outcome.candidates.iter().map(|c| c.response.usage.cost_usd).sum();
        bus.publish(StageEvent::StageCompleted {
            stage: "emit".to_string(),
            latency_ms: stage_latency_ms.iter().map(|(_, ms)| *ms).sum(),
        });

        OrchestrationResult {
            final_text,
            category: analysis.category,
            models_used: outcome.models_used,
            tools_used: outcome.tools_used,
            strategy: strategy_name(analysis.category, analysis.complexity, outcome.agreed).to_string(),
            confidence: outcome.confidence,
            verified: outcome.verified,
            stage_latency_ms,
            cost_usd,
            errors,
        }
    }
}

/// The candidate text to fall back on when the refiner's letter-extraction
/// chain exhausts itself (spec.md §4.8: "the first letter of the
/// highest-scoring choice"). Picks the candidate with the greatest
/// `verification_score`, defaulting to the first candidate when none were
/// scored.
fn best_candidate_text(outcome: &handlers::HandlerOutcome) -> Option<String> {
    outcome
        .candidates
        .iter()
        .max_by(|a, b| a.verification_score.partial_cmp(&b.verification_score).unwrap_or(std::cmp::Ordering::Equal))
        .map(|c| c.response.raw_text.clone())
}

/// Strategy id recorded on the result (glossary: "the named execution plan
/// a handler chose"). One name per category/outcome combination actually
/// implemented by the handlers in `crate::handlers`, not an invented
/// taxonomy.
fn strategy_name(category: Category, complexity: Complexity, agreed: bool) -> &'static str {
    match category {
        Category::Math => "single-best-with-calculator-authority",
        Category::Coding => "challenge-refine",
        Category::Reasoning if complexity == Complexity::Simple => "single-best",
        Category::Reasoning if agreed => "hierarchical-consensus",
        Category::Reasoning => "hierarchical-consensus-unresolved-tie",
        Category::Rag => "retrieve-then-rerank",
        Category::LongContext => "single-best",
        Category::Multilingual => "native-then-cross-check",
        Category::ToolUse => "single-best-with-tool-authority",
        Category::Dialogue => "single-best",
        Category::General => "single-best",
    }
}

fn contract_regex(category: Category) -> Option<&'static Regex> {
    use std::sync::OnceLock;
    static LETTER: OnceLock<Regex> = OnceLock::new();
    static MATH: OnceLock<Regex> = OnceLock::new();
    static CODE: OnceLock<Regex> = OnceLock::new();
    static RANKING: OnceLock<Regex> = OnceLock::new();

    match category {
        Category::Reasoning => Some(LETTER.get_or_init(|| Regex::new(r"^[A-E]$").unwrap())),
        Category::Math => Some(MATH.get_or_init(|| Regex::new(r"####\s*-?[0-9]+(?:\.[0-9]+)?\s*$").unwrap())),
        Category::Coding => Some(CODE.get_or_init(|| Regex::new(r"(?s)^```.*```$").unwrap())),
        Category::Rag => Some(RANKING.get_or_init(|| Regex::new(r"^[0-9]+(,[0-9]+)*$").unwrap())),
        _ => None,
    }
}

/// Final contract enforcement (spec.md §4.9: "must never emit a result
/// whose `final_text` does not satisfy the category contract after
/// refinement"). The refiner already guarantees this for every category it
/// knows a synthesis fallback for; this is the orchestrator's own backstop
/// in case a future handler bypasses the refiner's contract for its
/// category, recorded as `FORMAT_FALLBACK` rather than silently emitted.
fn enforce_contract(category: Category, text: String, errors: &mut Vec<ErrorKind>) -> String {
    let Some(re) = contract_regex(category) else {
        return text;
    };
    if re.is_match(text.trim()) {
        return text;
    }
    errors.push(ErrorKind::FormatFallback {
        detail: format!("orchestrator backstop: '{category}' output did not satisfy its format contract"),
    });
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tier;
    use crate::gateway::{CallParams, Gateway, MockClient};
    use crate::tools::web_search::StaticWebSearch;
    use std::sync::Arc;

    fn orchestrator_with_echo() -> Orchestrator {
        let mut gateway = Gateway::new();
        gateway.register(Arc::new(MockClient::echo("openai")));
        gateway.register(Arc::new(MockClient::echo("anthropic")));
        gateway.register(Arc::new(MockClient::echo("gemini")));
        gateway.register(Arc::new(MockClient::echo("deepseek")));
        gateway.register(Arc::new(MockClient::echo("grok")));
        gateway.register(Arc::new(MockClient::echo("together")));
        gateway.register(Arc::new(MockClient::echo("openrouter")));
        let catalog = Catalog::with_defaults();
        let tools = ToolBroker::new(Box::new(StaticWebSearch::empty()));
        Orchestrator::new(gateway, catalog, tools)
    }

    #[tokio::test]
    async fn empty_prompt_is_reported_without_panicking() {
        let orch = orchestrator_with_echo();
        let result = orch.run(&Query::new("   ")).await;
        assert!(result.errors.contains(&ErrorKind::CategoryUnknown));
    }

    #[tokio::test]
    async fn dialogue_query_produces_single_strategy_result() {
        let orch = orchestrator_with_echo();
        let query = Query::new("Hi there, how are you today?").with_category_override(Category::Dialogue);
        let result = orch.run(&query).await;
        assert_eq!(result.category, Category::Dialogue);
        assert_eq!(result.strategy, "single-best");
        assert!(!result.models_used.is_empty());
    }

    #[tokio::test]
    async fn deadline_expiry_is_recorded_as_partial_timeout() {
        let mut gateway = Gateway::new();
        struct NeverReturns;
        #[async_trait::async_trait]
        impl crate::gateway::ProviderClient for NeverReturns {
            fn provider_name(&self) -> &str {
                "openai"
            }
            async fn complete(
                &self,
                _model: &str,
                _envelope: &crate::domain::PromptEnvelope,
                _params: CallParams,
            ) -> Result<crate::gateway::RawCompletion, crate::error::GatewayError> {
                std::future::pending().await
            }
        }
        gateway.register(Arc::new(NeverReturns));
        let catalog = Catalog::with_defaults();
        let tools = ToolBroker::new(Box::new(StaticWebSearch::empty()));
        let orch = Orchestrator::new(gateway, catalog, tools).with_deadline(Duration::from_millis(20));

        let query = Query::new("Hi there, how are you today?").with_category_override(Category::Dialogue);
        let result = orch.run(&query).await;
        assert_eq!(result.strategy, "partial-timeout");
        assert!(result.errors.contains(&ErrorKind::PartialTimeout));
    }

    #[test]
    fn math_contract_regex_accepts_hash_marker() {
        let re = contract_regex(Category::Math).unwrap();
        assert!(re.is_match("some steps\n#### 18"));
    }
}
