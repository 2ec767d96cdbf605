//! Long-context handler (spec.md §4.6): routes to a long-window model
//! only when the embedded document exceeds a size threshold; everything
//! else reports `CAPABILITY_UNAVAILABLE` rather than silently degrading.

use crate::domain::{Candidate, Category, PromptEnvelope, QueryAnalysis, Tier};
use crate::error::HandlerError;

use super::{HandlerContext, HandlerOutcome};

/// Minimum embedded-document size, in characters, before this core
/// considers the query genuinely long-context rather than a short
/// passage best served by `general` or `rag`.
const LONG_CONTEXT_CHAR_THRESHOLD: usize = 20_000;

/// Models must advertise at least this context window to be routed here
/// at all (spec.md: "route to a long-window model tagged for this
/// category").
const MIN_CONTEXT_WINDOW_TOKENS: u32 = 200_000;

pub async fn handle(ctx: &HandlerContext<'_>, analysis: &QueryAnalysis, prompt: &str) -> Result<HandlerOutcome, HandlerError> {
    if prompt.len() < LONG_CONTEXT_CHAR_THRESHOLD {
        return Err(HandlerError::CapabilityUnavailable {
            category: Category::LongContext.to_string(),
        });
    }

    let descriptor = ctx
        .catalog
        .top_for(Category::LongContext, 4, Tier::Elite)
        .into_iter()
        .find(|m| m.context_window_tokens >= MIN_CONTEXT_WINDOW_TOKENS)
        .ok_or_else(|| HandlerError::CapabilityUnavailable {
            category: Category::LongContext.to_string(),
        })?;

    let system = crate::templates::system_preamble(Category::LongContext);
    let contract = crate::templates::format_contract(Category::LongContext);
    let envelope = PromptEnvelope::new(system, prompt, contract);

    let response = ctx.call_model(&descriptor, &envelope).await?;
    let needle = response.raw_text.trim().to_string();

    let mut outcome = HandlerOutcome::new(needle, 0.9);
    outcome.models_used.push(descriptor.id.clone());
    outcome.candidates.push(Candidate::new(response));
    // A single extract-only model call, no sandbox or tool confirms it;
    // `verified` stays false (glossary: "verified" means an external check).
    let _ = analysis;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_constant_is_nonzero() {
        assert!(LONG_CONTEXT_CHAR_THRESHOLD > 0);
    }
}
