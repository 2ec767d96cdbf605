//! Reasoning handler (spec.md §4.6), MMLU-style multiple choice.
//!
//! Adaptive by complexity: simple prompts skip voting and use the
//! single highest-capability model. Otherwise three diverse elite
//! models vote (weight 2x), escalating to next-tier verifiers on a tie
//! and finally to the highest-capability model with `confidence <= 0.6`
//! on a second tie.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::{Candidate, Category, Complexity, ModelDescriptor, QueryAnalysis, Tier};
use crate::error::HandlerError;

use super::{HandlerContext, HandlerOutcome};

fn letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*([A-E])\s*$").unwrap())
}

fn extract_letter(raw_text: &str) -> Option<String> {
    letter_re()
        .find_iter(raw_text)
        .last()
        .map(|m| m.as_str().trim().to_string())
        .or_else(|| {
            Regex::new(r"\b([A-E])\b")
                .unwrap()
                .find_iter(raw_text)
                .last()
                .map(|m| m.as_str().to_string())
        })
}

pub async fn handle(ctx: &HandlerContext<'_>, analysis: &QueryAnalysis, prompt: &str) -> Result<HandlerOutcome, HandlerError> {
    let system = crate::templates::system_preamble(Category::Reasoning);
    let elimination_contract = format!(
        "{}\n\nFirst eliminate options you can rule out, then commit to one.",
        crate::templates::format_contract(Category::Reasoning)
    );

    if analysis.complexity == Complexity::Simple {
        let descriptor = ctx
            .catalog
            .top_for(Category::Reasoning, 1, Tier::Elite)
            .into_iter()
            .next()
            .ok_or_else(|| HandlerError::CapabilityUnavailable {
                category: Category::Reasoning.to_string(),
            })?;
        let envelope = crate::domain::PromptEnvelope::new(system, prompt, elimination_contract);
        let response = ctx.call_model(&descriptor, &envelope).await?;
        let letter = extract_letter(&response.raw_text);
        let mut outcome = HandlerOutcome::new(letter.unwrap_or_default(), 0.85);
        outcome.models_used.push(descriptor.id.clone());
        outcome.candidates.push(Candidate::new(response));
        // Single-model answer, no external check; `verified` stays false.
        return Ok(outcome);
    }

    let primaries = ctx.catalog.diverse_top_for(Category::Reasoning, 3, Tier::Elite);
    if primaries.is_empty() {
        return Err(HandlerError::CapabilityUnavailable {
            category: Category::Reasoning.to_string(),
        });
    }

    let mut outcome = HandlerOutcome::new(String::new(), 0.0);
    let mut letters: Vec<(String, f32)> = Vec::new();
    let mut primary_letters: Vec<(ModelDescriptor, Option<String>)> = Vec::new();

    for descriptor in &primaries {
        let envelope = crate::domain::PromptEnvelope::new(system.clone(), prompt, elimination_contract.clone());
        let response = ctx.call_model(descriptor, &envelope).await?;
        let letter = extract_letter(&response.raw_text);
        if let Some(letter) = &letter {
            letters.push((letter.clone(), 2.0));
        }
        primary_letters.push((descriptor.clone(), letter));
        outcome.models_used.push(descriptor.id.clone());
        outcome.candidates.push(Candidate::new(response));
    }

    let mut answers: Vec<String> = letters.iter().map(|(l, _)| l.clone()).collect();

    let weighted: Vec<crate::consensus::WeightedAnswer> = letters
        .iter()
        .map(|(text, weight)| crate::consensus::WeightedAnswer {
            text: text.clone(),
            weight: *weight,
        })
        .collect();
    let decision = vote(&weighted);

    if !decision.1 {
        // Tie: escalate to verifiers from the next tier and re-vote once.
        let verifiers = ctx.catalog.diverse_top_for(Category::Reasoning, 2, Tier::Free);
        for descriptor in &verifiers {
            let envelope = crate::domain::PromptEnvelope::new(system.clone(), prompt, elimination_contract.clone());
            let response = ctx.call_model(descriptor, &envelope).await?;
            if let Some(letter) = extract_letter(&response.raw_text) {
                answers.push(letter);
            }
            outcome.models_used.push(descriptor.id.clone());
            outcome.candidates.push(Candidate::new(response));
        }

        let mut second_weighted = weighted.clone();
        second_weighted.extend(
            answers
                .iter()
                .skip(letters.len())
                .map(|text| crate::consensus::WeightedAnswer {
                    text: text.clone(),
                    weight: 1.0,
                }),
        );
        let second_decision = vote(&second_weighted);

        if !second_decision.1 {
            // Second tie: return the highest-capability model's answer,
            // flagged with confidence <= 0.6 (spec.md §4.6 step 3).
            let fallback_letter = best_capability(&primaries)
                .and_then(|best| {
                    primary_letters
                        .iter()
                        .find(|(d, _)| d.id == best.id)
                        .and_then(|(_, letter)| letter.clone())
                })
                .unwrap_or_default();
            outcome.final_text = fallback_letter;
            outcome.confidence = 0.6;
            outcome.verified = false;
            return Ok(outcome);
        }

        outcome.final_text = second_decision.0.winning_answer;
        outcome.confidence = second_decision.0.confidence;
        // A weighted vote among models is not an external check
        // (glossary: "verified"); `agreed` only tells the orchestrator
        // the escalated re-vote reached a strict winner.
        outcome.agreed = true;
        return Ok(outcome);
    }

    outcome.final_text = decision.0.winning_answer;
    outcome.confidence = decision.0.confidence;
    outcome.agreed = true;
    let _ = analysis;
    Ok(outcome)
}

/// Runs the weighted vote and reports whether the top answer strictly
/// beat the runner-up (spec.md §4.6 step 2: "If the top-weighted letter
/// has strictly greater weight than the runner-up").
fn vote(weighted: &[crate::consensus::WeightedAnswer]) -> (crate::domain::ConsensusDecision, bool) {
    let decision = weighted_vote_with_margin(weighted);
    decision
}

fn weighted_vote_with_margin(weighted: &[crate::consensus::WeightedAnswer]) -> (crate::domain::ConsensusDecision, bool) {
    use std::collections::HashMap;
    let mut totals: HashMap<String, f32> = HashMap::new();
    for answer in weighted {
        *totals.entry(answer.text.clone()).or_insert(0.0) += answer.weight;
    }
    let mut sorted: Vec<(String, f32)> = totals.into_iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let total_weight: f32 = sorted.iter().map(|(_, w)| w).sum();
    let (winner, winner_weight) = sorted.first().cloned().unwrap_or_default();
    let runner_up_weight = sorted.get(1).map(|(_, w)| *w).unwrap_or(0.0);
    let strictly_wins = winner_weight > runner_up_weight;
    let was_unanimous = sorted.len() <= 1;
    let confidence = if total_weight > 0.0 { winner_weight / total_weight } else { 0.0 };

    (
        crate::domain::ConsensusDecision {
            winning_answer: winner,
            confidence,
            vote_breakdown: sorted,
            was_unanimous,
        },
        strictly_wins,
    )
}

fn best_capability(descriptors: &[ModelDescriptor]) -> Option<&ModelDescriptor> {
    descriptors.iter().max_by_key(|d| d.capability_for(Category::Reasoning))
}
