//! `Query` and `QueryAnalysis` (spec.md §3).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Category, Complexity, Tier};

/// Caller-supplied constraints on how a query may be handled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryConstraints {
    pub max_latency_tier: Option<u8>,
    pub temperature: Option<f32>,
}

/// Input to the orchestration pipeline (spec.md §3 "Query (input)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub prompt: String,
    #[serde(default)]
    pub prior_context: Option<String>,
    #[serde(default)]
    pub tier_hint: Option<Tier>,
    #[serde(default)]
    pub category_override: Option<Category>,
    #[serde(default)]
    pub constraints: QueryConstraints,
}

impl Query {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            prior_context: None,
            tier_hint: None,
            category_override: None,
            constraints: QueryConstraints::default(),
        }
    }

    pub fn with_tier_hint(mut self, tier: Tier) -> Self {
        self.tier_hint = Some(tier);
        self
    }

    pub fn with_category_override(mut self, category: Category) -> Self {
        self.category_override = Some(category);
        self
    }
}

/// Stable identifiers for tools the broker can invoke (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    Calculator,
    CodeSandbox,
    WebSearch,
    Retrieve,
    Rerank,
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Calculator => "calculator",
            Self::CodeSandbox => "code_sandbox",
            Self::WebSearch => "web_search",
            Self::Retrieve => "retrieve",
            Self::Rerank => "rerank",
        };
        write!(f, "{s}")
    }
}

/// Output of the Classifier (spec.md §3 "QueryAnalysis", §4.4).
///
/// Classifier output is stable given identical input and classifier
/// version (spec.md §3 invariant 5); `classifier_version` is carried
/// end-to-end so the engine can record which ruleset produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub category: Category,
    pub complexity: Complexity,
    pub tool_hints: BTreeSet<ToolId>,
    pub needs_clarification: bool,
    pub rewritten_prompt: String,
    pub detected_language: String,
    pub classifier_version: String,
}
