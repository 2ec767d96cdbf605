//! Suite file format (spec.md §6) and loading.
//!
//! Mirrors `coordination/src/benchmark/problem.rs`'s split between a
//! loadable problem definition and runtime state, but the suite itself is
//! declarative YAML rather than a scraped repo: scoring rules are data,
//! not code (spec.md §9 "Custom 'industry benchmark' scripts with
//! keyword matching" migration).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Category;
use crate::error::BenchmarkError;

/// `metadata` block of a suite file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteMetadata {
    pub suite_name: String,
    pub version: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// `expected` block of one suite item. Every field is optional; a
/// scoring rule picks the fields relevant to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Expected {
    #[serde(default)]
    pub contains: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub not_contains: Option<String>,
    #[serde(default)]
    pub numeric: Option<NumericExpectation>,
    #[serde(default)]
    pub jsonschema: Option<serde_json::Value>,
    /// Ground-truth ranking for `ranking_mrr_at_k`, most-relevant first.
    #[serde(default)]
    pub ranking: Vec<String>,
    /// Visible tests for `code_tests_pass`, each an expected stdout line.
    #[serde(default)]
    pub tests: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericExpectation {
    pub value: f64,
    pub tolerance: f64,
}

/// `requirements` block: what the item needs the engine to have done,
/// checked after the run (not enforced on the model's behalf).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub requires_rag: bool,
    #[serde(default)]
    pub requires_tools: bool,
    #[serde(default)]
    pub requires_sandbox: bool,
    #[serde(default)]
    pub requires_no_clarification: bool,
    #[serde(default)]
    pub requires_clarification: bool,
}

/// The declarative scoring rule to apply (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    ExactContains,
    Regex,
    NumericEqual,
    NotContains,
    RankingMrrAtK,
    CodeTestsPass,
}

/// `scoring` block of one suite item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scoring {
    pub rule: ScoringRule,
    #[serde(default = "default_weight")]
    pub objective_weight: f64,
    #[serde(default)]
    pub rubric_weight: f64,
    #[serde(default)]
    pub critical: bool,
}

fn default_weight() -> f64 {
    1.0
}

/// One item in a suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteItem {
    pub id: String,
    pub category: Category,
    pub prompt: String,
    #[serde(default)]
    pub expected: Expected,
    #[serde(default)]
    pub requirements: Requirements,
    pub scoring: Scoring,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A full benchmark suite: metadata plus its ordered items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub metadata: SuiteMetadata,
    pub prompts: Vec<SuiteItem>,
}

impl Suite {
    /// Loads and parses a suite file from `path` (spec.md §6 "Suite file
    /// format (YAML)"). Fails fast on malformed YAML rather than
    /// skipping items silently.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BenchmarkError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BenchmarkError::SuiteLoad(format!("{}: {e}", path.display())))?;
        let suite: Suite = serde_yaml::from_str(&raw)
            .map_err(|e| BenchmarkError::SuiteLoad(format!("{}: {e}", path.display())))?;
        if suite.prompts.is_empty() {
            return Err(BenchmarkError::SuiteLoad(format!(
                "{}: suite has no prompts",
                path.display()
            )));
        }
        Ok(suite)
    }

    /// Items restricted to `categories` (empty selector keeps all items).
    pub fn filter_categories<'a>(&'a self, categories: &[String]) -> Vec<&'a SuiteItem> {
        if categories.is_empty() {
            return self.prompts.iter().collect();
        }
        self.prompts
            .iter()
            .filter(|item| categories.iter().any(|c| c == item.category.as_str()))
            .collect()
    }

    /// Items restricted to explicit ids (empty selector keeps all items).
    pub fn filter_ids<'a>(&'a self, ids: &[String]) -> Vec<&'a SuiteItem> {
        if ids.is_empty() {
            return self.prompts.iter().collect();
        }
        self.prompts.iter().filter(|item| ids.contains(&item.id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
metadata:
  suite_name: smoke
  version: "1"
  categories: [math, reasoning]
prompts:
  - id: m1
    category: math
    prompt: "2 + 2 = ?"
    expected:
      numeric:
        value: 4
        tolerance: 0.01
    scoring:
      rule: numeric_equal
      objective_weight: 1.0
      critical: true
  - id: r1
    category: reasoning
    prompt: "Pick A or B. A) yes B) no"
    expected:
      regex: "^[AB]$"
    scoring:
      rule: regex
      objective_weight: 1.0
"#;

    #[test]
    fn parses_sample_suite() {
        let suite: Suite = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(suite.metadata.suite_name, "smoke");
        assert_eq!(suite.prompts.len(), 2);
        assert_eq!(suite.prompts[0].category, Category::Math);
        assert!(suite.prompts[0].scoring.critical);
    }

    #[test]
    fn load_rejects_missing_file() {
        let err = Suite::load("/nonexistent/suite.yaml").unwrap_err();
        assert!(matches!(err, BenchmarkError::SuiteLoad(_)));
    }

    #[test]
    fn filter_categories_empty_selector_keeps_all() {
        let suite: Suite = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(suite.filter_categories(&[]).len(), 2);
        assert_eq!(suite.filter_categories(&["math".to_string()]).len(), 1);
    }
}
