//! Math handler (spec.md §4.6).
//!
//! Decomposes the problem into steps via an LLM, but treats its text as
//! a plan, not numeric truth: each step with an extractable arithmetic
//! expression is re-evaluated by the calculator, whose result overrides
//! whatever number the LLM wrote down, and is substituted into the next
//! step's prompt before that call is made.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::{Candidate, Category, QueryAnalysis};
use crate::error::HandlerError;
use crate::tools::calculator;

use super::{HandlerContext, HandlerOutcome};

const MAX_STEPS: usize = 6;

fn step_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(?:Step\s*\d+[:.)]?|\d+[.)])\s*(.+)$").unwrap())
}

fn expression_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9()][0-9()\.\s\+\-\*/\^%]*[0-9()]").unwrap())
}

pub async fn handle(ctx: &HandlerContext<'_>, analysis: &QueryAnalysis, prompt: &str) -> Result<HandlerOutcome, HandlerError> {
    let descriptor = ctx
        .catalog
        .top_for(Category::Math, 1, crate::domain::Tier::Elite)
        .into_iter()
        .next()
        .ok_or_else(|| HandlerError::CapabilityUnavailable {
            category: Category::Math.to_string(),
        })?;

    let system = crate::templates::system_preamble(Category::Math);
    let plan_contract = "List your reasoning as numbered steps, one arithmetic operation per step.";
    let envelope = crate::domain::PromptEnvelope::new(system.clone(), prompt, plan_contract);

    let response = ctx.call_model(&descriptor, &envelope).await?;
    let steps: Vec<String> = step_line_re()
        .captures_iter(&response.raw_text)
        .take(MAX_STEPS)
        .map(|c| c[1].to_string())
        .collect();

    let mut outcome = HandlerOutcome::new(String::new(), 0.9);
    outcome.models_used.push(descriptor.id.clone());
    outcome.candidates.push(Candidate::new(response.clone()));

    let mut last_value: Option<f64> = None;
    let mut any_step_evaluated = false;
    let mut working_steps = steps;

    for index in 0..working_steps.len() {
        let step_text = if let Some(value) = last_value {
            substitute_previous_result(&working_steps[index], value)
        } else {
            working_steps[index].clone()
        };
        working_steps[index] = step_text.clone();

        if let Some(expr) = expression_re().find(&step_text) {
            if let Ok(value) = calculator::evaluate(expr.as_str()) {
                last_value = Some(value);
                any_step_evaluated = true;
            }
        }
    }

    if !any_step_evaluated {
        // Fallback (spec.md §4.6): single-model chain-of-thought, still
        // enforce the format via the refiner. We do not treat this as an
        // error — the refiner's numeric-token fallback covers it.
        outcome.final_text = response.raw_text;
        return Ok(outcome);
    }

    outcome.tools_used.push("calculator".to_string());
    let final_value = last_value.unwrap();
    outcome.final_text = format!("{}\n#### {final_value}", response.raw_text.trim());
    Ok(outcome)
}

/// Replaces a leading placeholder like "the previous result" or "that
/// value" with the numeric result of the prior step, so the calculator
/// sees a concrete expression rather than prose.
fn substitute_previous_result(step: &str, previous: f64) -> String {
    let placeholders = ["the previous result", "that value", "the result above", "previous answer"];
    let mut replaced = step.to_string();
    for placeholder in placeholders {
        if replaced.to_lowercase().contains(placeholder) {
            replaced = replace_case_insensitive(&replaced, placeholder, &previous.to_string());
        }
    }
    replaced
}

fn replace_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower = haystack.to_lowercase();
    if let Some(pos) = lower.find(needle) {
        format!("{}{}{}", &haystack[..pos], replacement, &haystack[pos + needle.len()..])
    } else {
        haystack.to_string()
    }
}
