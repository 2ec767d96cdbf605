//! Multilingual handler (spec.md §4.6): answers in the detected
//! language without translating the prompt first. For non-English
//! prompts, also produces an English answer and cross-checks that the
//! two extracted choice letters agree; disagreement caps confidence at
//! 0.5 rather than silently picking one.

use crate::domain::{Candidate, Category, PromptEnvelope, QueryAnalysis, Tier};
use crate::error::HandlerError;

use super::{HandlerContext, HandlerOutcome};

fn extract_letter(text: &str) -> Option<char> {
    text.chars().find(|c| c.is_ascii_uppercase() && ('A'..='E').contains(c))
}

pub async fn handle(ctx: &HandlerContext<'_>, analysis: &QueryAnalysis, prompt: &str) -> Result<HandlerOutcome, HandlerError> {
    let descriptor = ctx
        .catalog
        .top_for(Category::Multilingual, 1, Tier::Elite)
        .into_iter()
        .next()
        .ok_or_else(|| HandlerError::CapabilityUnavailable {
            category: Category::Multilingual.to_string(),
        })?;

    let system = crate::templates::system_preamble(Category::Multilingual);
    let native_contract = format!(
        "{} Respond in the same language the question was asked in; do not translate the question.",
        crate::templates::format_contract(Category::Multilingual)
    );
    let envelope = PromptEnvelope::new(system.clone(), prompt, native_contract);
    let native_response = ctx.call_model(&descriptor, &envelope).await?;

    let mut outcome = HandlerOutcome::new(native_response.raw_text.clone(), 0.85);
    outcome.models_used.push(descriptor.id.clone());
    outcome.candidates.push(Candidate::new(native_response.clone()));

    if analysis.detected_language == "english" {
        return Ok(outcome);
    }

    // Non-English: cross-check against an English rendering of the same
    // question (spec.md §4.6: agreement between the two is required for
    // full confidence).
    let english_contract = format!(
        "{} Respond in English regardless of the question's language.",
        crate::templates::format_contract(Category::Multilingual)
    );
    let english_prompt = format!("{prompt}\n\n(Answer in English.)");
    let english_envelope = PromptEnvelope::new(system, english_prompt, english_contract);
    let english_response = ctx.call_model(&descriptor, &english_envelope).await?;
    outcome.candidates.push(Candidate::new(english_response.clone()));

    let native_letter = extract_letter(&native_response.raw_text);
    let english_letter = extract_letter(&english_response.raw_text);

    match (native_letter, english_letter) {
        (Some(a), Some(b)) if a == b => {
            // Cross-model textual agreement, not an external tool/sandbox
            // check (glossary: "verified"); `verified` stays false.
            outcome.confidence = 0.9;
        }
        _ => {
            outcome.confidence = 0.5;
        }
    }

    Ok(outcome)
}
