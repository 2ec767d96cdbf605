//! Ordered regex families backing [`super::Classifier`] (spec.md §4.4).
//!
//! Category rules are evaluated in a fixed order and the first match
//! wins, keeping categories disjoint. `OnceLock` compiles each family
//! once per process, the way `rlm-core/llm/router.rs` lazily builds its
//! routing table.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};

use crate::domain::{Category, Complexity};

struct CategoryRule {
    category: Category,
    set: Regex,
}

fn category_rules() -> &'static Vec<CategoryRule> {
    static RULES: OnceLock<Vec<CategoryRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            CategoryRule {
                category: Category::LongContext,
                set: Regex::new(r"(?i)find the needle|needle in (the|this) (haystack|long|embedded)|in this (long|embedded) document").unwrap(),
            },
            CategoryRule {
                category: Category::Rag,
                set: Regex::new(r"(?i)rank the following|given (these|the following) passages|which passage (best )?answers").unwrap(),
            },
            CategoryRule {
                category: Category::Coding,
                set: Regex::new(r"(?i)\bwrite (a|the) function\b|\bimplement\b.*\b(function|class|algorithm)\b|\bfix (this|the) bug\b|```|\brun this code\b").unwrap(),
            },
            CategoryRule {
                category: Category::Math,
                set: Regex::new(
                    r"(?i)\d+\s*[\+\-\*/\^%]\s*\d+|\bcompute\b|\bcalculate\b|\bsolve for\b|\bhow (far|fast|many|much)\b|\bhow long (does|will)\b|\bmph\b|\bderivative\b|\bintegral\b|\bequation\b",
                )
                .unwrap(),
            },
            CategoryRule {
                category: Category::ToolUse,
                set: Regex::new(r"(?i)\buse the calculator\b|\bcall the\b.*\btool\b|\bsearch the web\b|\blook up\b").unwrap(),
            },
            CategoryRule {
                category: Category::Multilingual,
                set: Regex::new(r"(?i)\btranslate\b|\bin (french|spanish|german|japanese|mandarin|chinese|arabic)\b").unwrap(),
            },
            CategoryRule {
                category: Category::Dialogue,
                set: Regex::new(r"(?i)^(hi|hello|hey|how are you|thanks|thank you)\b").unwrap(),
            },
            CategoryRule {
                category: Category::Reasoning,
                set: multiple_choice_re().clone(),
            },
            CategoryRule {
                category: Category::Reasoning,
                set: Regex::new(r"(?i)\bprove\b|\bwhy (is|does|would)\b|\bexplain why\b|\bwhat would happen if\b|\bwhich of the following\b").unwrap(),
            },
        ]
    })
}

pub fn detect_category(prompt: &str) -> Category {
    for rule in category_rules() {
        if rule.set.is_match(prompt) {
            return rule.category;
        }
    }
    Category::General
}

fn complexity_markers() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bthen\b|\bafter that\b|\bprove\b|\bstep by step\b|\bfirst,? .* then\b").unwrap())
}

fn technical_vocab() -> &'static RegexSet {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    RE.get_or_init(|| {
        RegexSet::new([
            r"(?i)\balgorithm\b",
            r"(?i)\basymptotic\b",
            r"(?i)\beigenvalue\b",
            r"(?i)\bhomomorphism\b",
            r"(?i)\bthermodynamic\b",
            r"(?i)\bconcurrency\b",
        ])
        .unwrap()
    })
}

const SIMPLE_WORD_THRESHOLD: usize = 12;

pub fn detect_complexity(prompt: &str) -> Complexity {
    let word_count = prompt.split_whitespace().count();
    let clause_count = prompt.matches(',').count() + prompt.matches(';').count() + 1;

    if complexity_markers().is_match(prompt) || technical_vocab().matches(prompt).matched_any() {
        return Complexity::Complex;
    }
    if clause_count <= 1 && word_count <= SIMPLE_WORD_THRESHOLD {
        return Complexity::Simple;
    }
    if is_well_formed_factual_question(prompt) && word_count <= SIMPLE_WORD_THRESHOLD {
        return Complexity::Simple;
    }
    Complexity::Medium
}

fn wh_question_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(who|what|when|where)\b.*\?\s*$").unwrap())
}

fn is_well_formed_factual_question(prompt: &str) -> bool {
    wh_question_re().is_match(prompt.trim())
}

/// Matches a lettered option marker either at the start of its own line
/// ("A. one\nB. two") or inline after whitespace ("... A) London B)
/// Berlin"), since MCQ prompts appear in both shapes in practice.
fn multiple_choice_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(?:^|\s)[A-Da-d][\.\)]\s").unwrap())
}

/// "Never clarify" family (spec.md §4.4): well-formed wh-questions with a
/// concrete object, multiple-choice questions, or any `?`-terminated
/// query of at least 4 words.
pub fn matches_never_clarify(prompt: &str) -> bool {
    let trimmed = prompt.trim();
    if wh_question_re().is_match(trimmed) {
        return true;
    }
    if multiple_choice_re().is_match(trimmed) {
        return true;
    }
    if trimmed.ends_with('?') && trimmed.split_whitespace().count() >= 4 {
        return true;
    }
    false
}

/// Everything not covered by the "never clarify" family is a candidate
/// for clarification only when it is vague: short, imperative, and
/// lacking any concrete object. This is intentionally conservative — the
/// default is to attempt the query, not to stall on clarification.
pub fn needs_clarification(prompt: &str) -> bool {
    let trimmed = prompt.trim();
    let word_count = trimmed.split_whitespace().count();
    word_count <= 2 && !trimmed.ends_with('?')
}

fn arithmetic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\s*[\+\-\*/\^%]\s*\d+").unwrap())
}

pub fn has_arithmetic_expression(lower_prompt: &str) -> bool {
    arithmetic_re().is_match(lower_prompt)
}

fn run_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\brun this code\b|\brun the (tests|code)\b|\bexecute this\b").unwrap())
}

pub fn mentions_run_this_code(lower_prompt: &str) -> bool {
    run_code_re().is_match(lower_prompt)
}

fn time_sensitive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blatest\b|\btoday\b|\bcurrent(ly)?\b|\bright now\b|\bthis (week|month|year)\b").unwrap())
}

pub fn mentions_time_sensitive_terms(lower_prompt: &str) -> bool {
    time_sensitive_re().is_match(lower_prompt)
}

fn passage_list_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bpassages?\b|\bdocuments?\b.*\b(below|above|following)\b").unwrap())
}

pub fn mentions_passage_list(lower_prompt: &str) -> bool {
    passage_list_re().is_match(lower_prompt)
}

/// Best-effort language detection. This is not a linguistic model — it
/// is a cheap ASCII/diacritics heuristic sufficient to flag
/// non-English prompts for the multilingual handler (spec.md Non-goals
/// exclude a real language-ID model as out of scope for this core).
pub fn detect_language(prompt: &str) -> String {
    let non_ascii = prompt.chars().filter(|c| !c.is_ascii()).count();
    let total = prompt.chars().count().max(1);
    if non_ascii as f32 / total as f32 > 0.2 {
        "non_english".to_string()
    } else {
        "english".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coding_takes_precedence_over_general_for_fenced_blocks() {
        assert_eq!(detect_category("```rust\nfn main() {}\n```"), Category::Coding);
    }

    #[test]
    fn simple_short_question_is_simple() {
        assert_eq!(detect_complexity("Who wrote Hamlet?"), Complexity::Simple);
    }

    #[test]
    fn prove_marker_forces_complex() {
        assert_eq!(detect_complexity("Prove that the square root of two is irrational."), Complexity::Complex);
    }

    #[test]
    fn multiple_choice_never_clarifies() {
        assert!(matches_never_clarify("Which is correct?\nA. one\nB. two"));
    }
}
