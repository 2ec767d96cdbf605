//! Scoring rules (spec.md §4.10): declarative, data-driven scorers over
//! an `OrchestrationResult`. Keyword matching (`exact_contains`) is one
//! option among several here, never the implicit default (spec.md §9).

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::OrchestrationResult;

use super::suite::{Expected, ScoringRule, Scoring, SuiteItem};

/// Outcome of scoring one item against one orchestration result.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    /// Whether the item's rule judged the answer correct.
    pub passed: bool,
    /// Weighted composite score in `[0, objective_weight + rubric_weight]`.
    pub composite: f64,
    pub detail: String,
}

/// Scores `result.final_text` against `item`'s expectation using the
/// rule `item.scoring.rule` names. The composite score is the
/// configured weighted sum (spec.md §4.10): `objective_weight` if the
/// mechanical rule passed, plus `rubric_weight` only when a rubric score
/// was supplied (this engine has no LLM-judge rubric stage, so rubric
/// credit is simply withheld rather than fabricated).
pub fn score_item(item: &SuiteItem, result: &OrchestrationResult) -> ScoreResult {
    let Scoring {
        objective_weight, ..
    } = item.scoring;
    let (passed, detail) = match item.scoring.rule {
        ScoringRule::ExactContains => score_contains(&item.expected, &result.final_text),
        ScoringRule::Regex => score_regex(&item.expected, &result.final_text),
        ScoringRule::NumericEqual => score_numeric(&item.expected, &result.final_text),
        ScoringRule::NotContains => score_not_contains(&item.expected, &result.final_text),
        ScoringRule::RankingMrrAtK => score_ranking(&item.expected, &result.final_text),
        ScoringRule::CodeTestsPass => score_code_tests(result),
    };
    let composite = if passed { objective_weight } else { 0.0 };
    ScoreResult {
        passed,
        composite,
        detail,
    }
}

fn score_contains(expected: &Expected, text: &str) -> (bool, String) {
    match &expected.contains {
        Some(needle) => (text.contains(needle.as_str()), format!("expected substring '{needle}'")),
        None => (false, "no `contains` expectation configured".to_string()),
    }
}

fn score_not_contains(expected: &Expected, text: &str) -> (bool, String) {
    match &expected.not_contains {
        Some(needle) => (
            !text.contains(needle.as_str()),
            format!("forbidden substring '{needle}'"),
        ),
        None => (false, "no `not_contains` expectation configured".to_string()),
    }
}

fn score_regex(expected: &Expected, text: &str) -> (bool, String) {
    match &expected.regex {
        Some(pattern) => match Regex::new(pattern) {
            Ok(re) => (re.is_match(text.trim()), format!("expected match for /{pattern}/")),
            Err(e) => (false, format!("invalid regex '{pattern}': {e}")),
        },
        None => (false, "no `regex` expectation configured".to_string()),
    }
}

/// Numeric equality after normalisation (spec.md §4.7 similarity
/// measure): strips thousands separators and trims trailing zeros
/// before comparing within `tolerance`.
fn score_numeric(expected: &Expected, text: &str) -> (bool, String) {
    let Some(numeric) = &expected.numeric else {
        return (false, "no `numeric` expectation configured".to_string());
    };
    match extract_trailing_number(text) {
        Some(actual) => {
            let diff = (actual - numeric.value).abs();
            (
                diff <= numeric.tolerance,
                format!("expected {} ± {}, got {actual}", numeric.value, numeric.tolerance),
            )
        }
        None => (false, "no numeric token found in final_text".to_string()),
    }
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?[0-9][0-9,]*(?:\.[0-9]+)?").unwrap())
}

fn extract_trailing_number(text: &str) -> Option<f64> {
    let m = number_re().find_iter(text).last()?;
    m.as_str().replace(',', "").parse::<f64>().ok()
}

/// Mean reciprocal rank at k over the comma-separated ranking
/// `final_text` produces, against the expected ranking's first element
/// (the single relevant passage id, per spec.md §8's RAG scenario).
/// Passes when MRR is nonzero, i.e. the relevant id appears at all.
fn score_ranking(expected: &Expected, text: &str) -> (bool, String) {
    if expected.ranking.is_empty() {
        return (false, "no `ranking` expectation configured".to_string());
    }
    let relevant = &expected.ranking[0];
    let produced: Vec<&str> = text.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    let rank = produced.iter().position(|id| id == relevant);
    match rank {
        Some(0) => (true, format!("'{relevant}' ranked first")),
        Some(pos) => (
            false,
            format!("'{relevant}' ranked at position {} (mrr={:.3})", pos + 1, 1.0 / (pos as f64 + 1.0)),
        ),
        None => (false, format!("'{relevant}' not present in ranking")),
    }
}

/// `code_tests_pass` defers to [`OrchestrationResult::verified`], which
/// the coding handler only sets `true` after the sandbox ran the
/// visible tests and all passed (spec.md §3 invariant 3) — this scorer
/// never re-runs the sandbox itself.
fn score_code_tests(result: &OrchestrationResult) -> (bool, String) {
    (
        result.verified,
        format!("OrchestrationResult.verified = {}", result.verified),
    )
}

/// Mean reciprocal rank at k, exposed standalone for suites that want to
/// report the continuous metric rather than a pass/fail bucket.
pub fn mrr_at_k(ranking: &[String], relevant: &str, k: usize) -> f64 {
    ranking
        .iter()
        .take(k)
        .position(|id| id == relevant)
        .map(|pos| 1.0 / (pos as f64 + 1.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;

    fn result_with_text(text: &str) -> OrchestrationResult {
        OrchestrationResult {
            final_text: text.to_string(),
            category: Category::Math,
            models_used: vec![],
            tools_used: vec![],
            strategy: "single-best".to_string(),
            confidence: 1.0,
            verified: false,
            stage_latency_ms: vec![],
            cost_usd: 0.0,
            errors: vec![],
        }
    }

    fn item_with(rule: ScoringRule, expected: Expected) -> SuiteItem {
        SuiteItem {
            id: "t1".to_string(),
            category: Category::Math,
            prompt: "x".to_string(),
            expected,
            requirements: Default::default(),
            scoring: Scoring {
                rule,
                objective_weight: 1.0,
                rubric_weight: 0.0,
                critical: false,
            },
            notes: None,
        }
    }

    #[test]
    fn numeric_equal_within_tolerance_passes() {
        let expected = Expected {
            numeric: Some(super::super::suite::NumericExpectation { value: 18.0, tolerance: 0.01 }),
            ..Default::default()
        };
        let item = item_with(ScoringRule::NumericEqual, expected);
        let result = result_with_text("steps...\n#### 18");
        let score = score_item(&item, &result);
        assert!(score.passed);
        assert_eq!(score.composite, 1.0);
    }

    #[test]
    fn numeric_equal_outside_tolerance_fails() {
        let expected = Expected {
            numeric: Some(super::super::suite::NumericExpectation { value: 18.0, tolerance: 0.01 }),
            ..Default::default()
        };
        let item = item_with(ScoringRule::NumericEqual, expected);
        let result = result_with_text("#### 19");
        assert!(!score_item(&item, &result).passed);
    }

    #[test]
    fn ranking_mrr_passes_when_relevant_id_first() {
        let expected = Expected {
            ranking: vec!["4".to_string()],
            ..Default::default()
        };
        let item = item_with(ScoringRule::RankingMrrAtK, expected);
        let result = result_with_text("4,2,7");
        assert!(score_item(&item, &result).passed);
    }

    #[test]
    fn code_tests_pass_defers_to_verified_flag() {
        let item = item_with(ScoringRule::CodeTestsPass, Expected::default());
        let mut result = result_with_text("```def f(): pass```");
        result.verified = true;
        assert!(score_item(&item, &result).passed);
        result.verified = false;
        assert!(!score_item(&item, &result).passed);
    }

    #[test]
    fn mrr_at_k_standalone() {
        assert_eq!(mrr_at_k(&["4".to_string(), "2".to_string()], "2", 5), 0.5);
        assert_eq!(mrr_at_k(&["4".to_string()], "9", 5), 0.0);
    }
}
