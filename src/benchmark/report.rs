//! Aggregation and the regression gate (spec.md §4.10).
//!
//! Percentile/summary shape is grounded on
//! `coordination/src/benchmark/harness.rs::compute_metrics`, generalized
//! from session records to per-item benchmark outcomes and extended with
//! the regression-vs-previous-run comparison spec.md §4.10 requires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scoring::ScoreResult;
use super::suite::SuiteItem;
use crate::domain::OrchestrationResult;

/// One scored run of one item, the unit [`aggregate`] consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_id: String,
    pub category: String,
    pub critical: bool,
    pub passed: bool,
    pub composite_score: f64,
    pub confidence: f32,
    pub latency_ms: u64,
    pub cost_usd: f64,
}

impl ItemOutcome {
    pub fn from_run(item: &SuiteItem, result: &OrchestrationResult, score: &ScoreResult) -> Self {
        Self {
            item_id: item.id.clone(),
            category: item.category.to_string(),
            critical: item.scoring.critical,
            passed: score.passed,
            composite_score: score.composite,
            confidence: result.confidence,
            latency_ms: result.total_latency_ms(),
            cost_usd: result.cost_usd,
        }
    }
}

/// Per-category rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub item_count: usize,
    pub accuracy: f64,
    pub mean_confidence: f64,
    pub mean_latency_ms: f64,
}

/// Items present in a previous run but not reproduced in this one, or
/// vice versa, plus items whose pass/fail flipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub newly_failing: Vec<String>,
    pub newly_passing: Vec<String>,
    pub previous_failure_rate: f64,
    pub current_failure_rate: f64,
}

/// The full aggregated report (spec.md §4.10: "per-category accuracy,
/// mean confidence, mean latency, total cost, critical failure list, and
/// a regression report against the previous run").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub item_count: usize,
    pub per_category: BTreeMap<String, CategoryStats>,
    pub mean_confidence: f64,
    pub mean_latency_ms: f64,
    pub total_cost_usd: f64,
    pub critical_failures: Vec<String>,
    pub regression: Option<RegressionReport>,
}

/// Aggregates `outcomes`, optionally diffing against `previous`.
pub fn aggregate(outcomes: &[ItemOutcome], previous: Option<&[ItemOutcome]>) -> Report {
    let item_count = outcomes.len();
    let mut per_category: BTreeMap<String, Vec<&ItemOutcome>> = BTreeMap::new();
    for outcome in outcomes {
        per_category.entry(outcome.category.clone()).or_default().push(outcome);
    }

    let per_category = per_category
        .into_iter()
        .map(|(category, items)| {
            let n = items.len() as f64;
            let accuracy = items.iter().filter(|i| i.passed).count() as f64 / n;
            let mean_confidence = items.iter().map(|i| i.confidence as f64).sum::<f64>() / n;
            let mean_latency_ms = items.iter().map(|i| i.latency_ms as f64).sum::<f64>() / n;
            (
                category,
                CategoryStats {
                    item_count: items.len(),
                    accuracy,
                    mean_confidence,
                    mean_latency_ms,
                },
            )
        })
        .collect();

    let n = outcomes.len().max(1) as f64;
    let mean_confidence = outcomes.iter().map(|o| o.confidence as f64).sum::<f64>() / n;
    let mean_latency_ms = outcomes.iter().map(|o| o.latency_ms as f64).sum::<f64>() / n;
    let total_cost_usd = outcomes.iter().map(|o| o.cost_usd).sum();
    let critical_failures = outcomes
        .iter()
        .filter(|o| o.critical && !o.passed)
        .map(|o| o.item_id.clone())
        .collect();

    let regression = previous.map(|previous| diff_against(outcomes, previous));

    Report {
        item_count,
        per_category,
        mean_confidence,
        mean_latency_ms,
        total_cost_usd,
        critical_failures,
        regression,
    }
}

fn diff_against(current: &[ItemOutcome], previous: &[ItemOutcome]) -> RegressionReport {
    let prev_by_id: BTreeMap<&str, &ItemOutcome> = previous.iter().map(|o| (o.item_id.as_str(), o)).collect();
    let mut newly_failing = Vec::new();
    let mut newly_passing = Vec::new();

    for item in current {
        if let Some(prev) = prev_by_id.get(item.item_id.as_str()) {
            if prev.passed && !item.passed {
                newly_failing.push(item.item_id.clone());
            } else if !prev.passed && item.passed {
                newly_passing.push(item.item_id.clone());
            }
        }
    }

    let previous_failure_rate = failure_rate(previous);
    let current_failure_rate = failure_rate(current);

    RegressionReport {
        newly_failing,
        newly_passing,
        previous_failure_rate,
        current_failure_rate,
    }
}

fn failure_rate(outcomes: &[ItemOutcome]) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    outcomes.iter().filter(|o| !o.passed).count() as f64 / outcomes.len() as f64
}

/// Regression gate (spec.md §4.10, §8 property 9): fails the run if any
/// critical item fails, or the overall failure rate exceeds
/// `max_failure_rate`.
pub fn regression_gate_passes(report: &Report, max_failure_rate: f64) -> bool {
    if !report.critical_failures.is_empty() {
        return false;
    }
    let failure_rate = 1.0 - weighted_accuracy(report);
    failure_rate <= max_failure_rate
}

fn weighted_accuracy(report: &Report) -> f64 {
    if report.item_count == 0 {
        return 1.0;
    }
    let passed: f64 = report
        .per_category
        .values()
        .map(|stats| stats.accuracy * stats.item_count as f64)
        .sum();
    passed / report.item_count as f64
}

/// Renders a human-readable Markdown summary (`report.md`, spec.md §6).
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("# Benchmark Report\n\n");
    out.push_str(&format!(
        "- items: {}\n- mean confidence: {:.3}\n- mean latency: {:.1}ms\n- total cost: ${:.4}\n\n",
        report.item_count, report.mean_confidence, report.mean_latency_ms, report.total_cost_usd
    ));
    out.push_str("## Per-category\n\n| category | n | accuracy | mean confidence | mean latency (ms) |\n|---|---|---|---|---|\n");
    for (category, stats) in &report.per_category {
        out.push_str(&format!(
            "| {category} | {} | {:.1}% | {:.3} | {:.1} |\n",
            stats.item_count,
            stats.accuracy * 100.0,
            stats.mean_confidence,
            stats.mean_latency_ms
        ));
    }
    if !report.critical_failures.is_empty() {
        out.push_str("\n## Critical failures\n\n");
        for id in &report.critical_failures {
            out.push_str(&format!("- {id}\n"));
        }
    }
    if let Some(regression) = &report.regression {
        out.push_str("\n## Regression vs. previous run\n\n");
        out.push_str(&format!(
            "- failure rate: {:.1}% → {:.1}%\n",
            regression.previous_failure_rate * 100.0,
            regression.current_failure_rate * 100.0
        ));
        if !regression.newly_failing.is_empty() {
            out.push_str(&format!("- newly failing: {}\n", regression.newly_failing.join(", ")));
        }
        if !regression.newly_passing.is_empty() {
            out.push_str(&format!("- newly passing: {}\n", regression.newly_passing.join(", ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, category: &str, passed: bool, critical: bool) -> ItemOutcome {
        ItemOutcome {
            item_id: id.to_string(),
            category: category.to_string(),
            critical,
            passed,
            composite_score: if passed { 1.0 } else { 0.0 },
            confidence: 0.8,
            latency_ms: 100,
            cost_usd: 0.001,
        }
    }

    #[test]
    fn aggregate_computes_per_category_accuracy() {
        let outcomes = vec![
            outcome("m1", "math", true, false),
            outcome("m2", "math", false, false),
            outcome("r1", "reasoning", true, false),
        ];
        let report = aggregate(&outcomes, None);
        assert_eq!(report.per_category["math"].accuracy, 0.5);
        assert_eq!(report.per_category["reasoning"].accuracy, 1.0);
        assert!(report.regression.is_none());
    }

    #[test]
    fn critical_failure_fails_gate_regardless_of_rate() {
        let outcomes = vec![
            outcome("m1", "math", false, true),
            outcome("m2", "math", true, false),
            outcome("m3", "math", true, false),
        ];
        let report = aggregate(&outcomes, None);
        assert_eq!(report.critical_failures, vec!["m1".to_string()]);
        assert!(!regression_gate_passes(&report, 1.0));
    }

    #[test]
    fn high_failure_rate_fails_gate_even_without_critical() {
        let outcomes = vec![
            outcome("m1", "math", false, false),
            outcome("m2", "math", false, false),
            outcome("m3", "math", true, false),
        ];
        let report = aggregate(&outcomes, None);
        assert!(!regression_gate_passes(&report, 0.1));
        assert!(regression_gate_passes(&report, 0.9));
    }

    #[test]
    fn diff_against_previous_flags_newly_failing() {
        let previous = vec![outcome("m1", "math", true, false)];
        let current = vec![outcome("m1", "math", false, false)];
        let report = aggregate(&current, Some(&previous));
        let regression = report.regression.unwrap();
        assert_eq!(regression.newly_failing, vec!["m1".to_string()]);
    }

    #[test]
    fn markdown_render_includes_critical_section() {
        let outcomes = vec![outcome("m1", "math", false, true)];
        let report = aggregate(&outcomes, None);
        let md = render_markdown(&report);
        assert!(md.contains("Critical failures"));
        assert!(md.contains("m1"));
    }
}
