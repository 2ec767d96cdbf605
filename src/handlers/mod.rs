//! Category Handlers (spec.md §4.6). Each handler is invoked with
//! `(QueryAnalysis, tool_results, selected_models)` and returns final
//! text plus a Candidate trail. State machines are linear except for
//! the coding handler's `generate → test → refine` loop (spec.md §4.6),
//! built on [`crate::consensus::challenge_refine`].
//!
//! Handler dispatch mirrors `debate/orchestrator.rs`'s per-stage shape:
//! one function per category, sharing a [`HandlerContext`] that bundles
//! the gateway, catalog, and tool broker the way that module threads a
//! shared store and event bus through its stages.

pub mod coding;
pub mod dialogue;
pub mod long_context;
pub mod math;
pub mod multilingual;
pub mod rag;
pub mod reasoning;
pub mod tool_use;

use std::time::Instant;

use crate::catalog::Catalog;
use crate::domain::{Candidate, Category, ModelDescriptor, ModelResponse, PromptEnvelope, QueryAnalysis};
use crate::error::{ErrorKind, HandlerError};
use crate::gateway::{CallParams, Gateway, RoutableModel};
use crate::tools::ToolBroker;

/// Shared dependencies every handler needs. Borrowed for the lifetime of
/// one orchestration; handlers hold no state across queries.
pub struct HandlerContext<'a> {
    pub gateway: &'a Gateway,
    pub catalog: &'a Catalog,
    pub tools: &'a ToolBroker,
    pub call_params: CallParams,
}

impl<'a> HandlerContext<'a> {
    pub fn new(gateway: &'a Gateway, catalog: &'a Catalog, tools: &'a ToolBroker) -> Self {
        Self {
            gateway,
            catalog,
            tools,
            call_params: CallParams::default(),
        }
    }

    /// Calls `descriptor` through the gateway, stamping its own timing.
    /// Never fabricates a response on error — propagates the
    /// [`crate::error::GatewayError`] to the caller.
    pub async fn call_model(
        &self,
        descriptor: &ModelDescriptor,
        envelope: &PromptEnvelope,
    ) -> Result<ModelResponse, HandlerError> {
        let routable = RoutableModel {
            provider: descriptor.provider.clone(),
            model_id: descriptor.id.clone(),
        };
        let response = self.gateway.call(&routable, envelope, self.call_params).await?;
        Ok(response)
    }
}

/// What a handler hands back to the orchestrator before refinement.
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub final_text: String,
    pub candidates: Vec<Candidate>,
    pub models_used: Vec<String>,
    pub tools_used: Vec<String>,
    pub confidence: f32,
    pub verified: bool,
    /// Whether a voting strategy reached agreement without needing to
    /// escalate to a tie-break (spec.md §4.6 reasoning handler step 2).
    /// Purely a strategy-naming signal for the orchestrator — unlike
    /// `verified`, it does not claim any external check confirmed the
    /// answer.
    pub agreed: bool,
    pub errors: Vec<ErrorKind>,
}

impl HandlerOutcome {
    fn new(final_text: impl Into<String>, confidence: f32) -> Self {
        Self {
            final_text: final_text.into(),
            candidates: Vec::new(),
            models_used: Vec::new(),
            tools_used: Vec::new(),
            confidence,
            verified: false,
            agreed: false,
            errors: Vec::new(),
        }
    }
}

/// Dispatches `analysis.category` to its handler. This is the only place
/// that knows all eight category handlers exist; the orchestrator calls
/// through here rather than matching on `Category` itself.
pub async fn dispatch(
    ctx: &HandlerContext<'_>,
    analysis: &QueryAnalysis,
    prompt: &str,
) -> Result<HandlerOutcome, HandlerError> {
    match analysis.category {
        Category::Math => math::handle(ctx, analysis, prompt).await,
        Category::Coding => coding::handle(ctx, analysis, prompt).await,
        Category::Reasoning => reasoning::handle(ctx, analysis, prompt).await,
        Category::LongContext => long_context::handle(ctx, analysis, prompt).await,
        Category::Rag => rag::handle(ctx, analysis, prompt).await,
        Category::Multilingual => multilingual::handle(ctx, analysis, prompt).await,
        Category::ToolUse => tool_use::handle(ctx, analysis, prompt).await,
        Category::Dialogue => dialogue::handle(ctx, analysis, prompt).await,
        Category::General => general_handle(ctx, analysis, prompt).await,
    }
}

/// `general` has no bespoke handler in spec.md §4.6 (it is the
/// classifier's overflow bucket, not a named category handler) — it
/// gets a single fastest-capable model, no voting, matching the
/// dialogue handler's simplicity.
async fn general_handle(ctx: &HandlerContext<'_>, analysis: &QueryAnalysis, prompt: &str) -> Result<HandlerOutcome, HandlerError> {
    let descriptor = ctx
        .catalog
        .fastest_for(Category::General)
        .ok_or_else(|| HandlerError::CapabilityUnavailable {
            category: Category::General.to_string(),
        })?;

    let system = crate::templates::system_preamble(Category::General);
    let contract = crate::templates::format_contract(Category::General);
    let envelope = PromptEnvelope::new(system, prompt, contract);

    let started = Instant::now();
    let response = ctx.call_model(&descriptor, &envelope).await?;
    let _ = started.elapsed();

    let mut outcome = HandlerOutcome::new(response.raw_text.clone(), 0.7);
    outcome.models_used.push(descriptor.id.clone());
    outcome.candidates.push(Candidate::new(response));
    outcome.verified = false;
    let _ = analysis;
    Ok(outcome)
}
