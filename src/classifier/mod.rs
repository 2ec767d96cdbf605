//! Query Classifier / PromptOps (spec.md §4.4): a rule-driven, versioned
//! classifier. Category assignment is disjoint and first-match, the way
//! `router/task_classifier.rs` picks a single `TaskType` rather than a
//! weighted blend; here the rule families are regex-driven instead of
//! keyword lists since categories must stay disjoint under a much wider
//! vocabulary than that crate's six task types.

mod rules;

use std::collections::BTreeSet;

use crate::domain::{Category, Complexity, Query, QueryAnalysis, ToolId};
use crate::error::ClassifierError;

/// Bumped whenever a rule family changes meaning, not whenever a rule is
/// added — the version identifies *behavior*, not file revision (spec.md
/// §3 invariant 5: "classifier output is stable given identical input
/// and classifier version").
pub const CLASSIFIER_VERSION: &str = "classifier-v1";

pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Classifies `query`, producing a [`QueryAnalysis`]. Only an empty
    /// prompt is rejected outright; everything else falls through to
    /// `Category::General` with `complexity = Medium` rather than
    /// erroring (spec.md: classifier never refuses a non-empty prompt).
    pub fn classify(&self, query: &Query) -> Result<QueryAnalysis, ClassifierError> {
        let prompt = query.prompt.trim();
        if prompt.is_empty() {
            return Err(ClassifierError::EmptyPrompt);
        }

        let category = query.category_override.unwrap_or_else(|| rules::detect_category(prompt));
        let complexity = rules::detect_complexity(prompt);
        let needs_clarification = !rules::matches_never_clarify(prompt) && rules::needs_clarification(prompt);
        let tool_hints = detect_tool_hints(prompt, category);
        let detected_language = rules::detect_language(prompt);

        Ok(QueryAnalysis {
            category,
            complexity,
            tool_hints,
            needs_clarification,
            rewritten_prompt: prompt.to_string(),
            detected_language,
            classifier_version: CLASSIFIER_VERSION.to_string(),
        })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Tool hints (spec.md §4.4): math → calculator, explicit "run this
/// code" → sandbox, time-sensitive terms → web search, long passage
/// lists → retriever/reranker.
fn detect_tool_hints(prompt: &str, category: Category) -> BTreeSet<ToolId> {
    let mut hints = BTreeSet::new();
    let lower = prompt.to_lowercase();

    if category == Category::Math || rules::has_arithmetic_expression(&lower) {
        hints.insert(ToolId::Calculator);
    }
    if rules::mentions_run_this_code(&lower) {
        hints.insert(ToolId::CodeSandbox);
    }
    if rules::mentions_time_sensitive_terms(&lower) {
        hints.insert(ToolId::WebSearch);
    }
    if category == Category::Rag || rules::mentions_passage_list(&lower) {
        hints.insert(ToolId::Retrieve);
        hints.insert(ToolId::Rerank);
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(prompt: &str) -> QueryAnalysis {
        Classifier::new().classify(&Query::new(prompt)).unwrap()
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let err = Classifier::new().classify(&Query::new("   ")).unwrap_err();
        assert!(matches!(err, ClassifierError::EmptyPrompt));
    }

    #[test]
    fn word_problem_math_maps_to_math_without_operators() {
        let analysis = classify("If a train leaves the station at 60 mph, how far does it travel in 3 hours?");
        assert_eq!(analysis.category, Category::Math);
        assert!(analysis.tool_hints.contains(&ToolId::Calculator));
    }

    #[test]
    fn needle_in_haystack_maps_to_long_context() {
        let analysis = classify("Find the needle in this long embedded document and report the sentence it appears in.");
        assert_eq!(analysis.category, Category::LongContext);
    }

    #[test]
    fn rank_the_following_maps_to_rag() {
        let analysis = classify("Given these passages, rank the following by relevance to the question.");
        assert_eq!(analysis.category, Category::Rag);
        assert!(analysis.tool_hints.contains(&ToolId::Retrieve));
    }

    #[test]
    fn run_this_code_hints_sandbox() {
        let analysis = classify("Here is a function, run this code against the provided tests.");
        assert!(analysis.tool_hints.contains(&ToolId::CodeSandbox));
    }

    #[test]
    fn short_factual_question_is_simple_and_never_clarifies() {
        let analysis = classify("Who wrote Hamlet?");
        assert_eq!(analysis.complexity, Complexity::Simple);
        assert!(!analysis.needs_clarification);
    }

    #[test]
    fn multi_step_markers_raise_complexity() {
        let analysis = classify("First compute the derivative, then evaluate it at x=2, after that prove it is positive.");
        assert_eq!(analysis.complexity, Complexity::Complex);
    }

    #[test]
    fn classifier_version_is_stamped() {
        let analysis = classify("hello");
        assert_eq!(analysis.classifier_version, CLASSIFIER_VERSION);
    }
}
