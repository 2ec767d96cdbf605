//! `PromptEnvelope`, `ModelResponse`, `Candidate` (spec.md §3, §4.5).

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

use super::tool::ToolResult;

/// The fully-assembled prompt handed to the Provider Gateway, including the
/// category's output-format contract (spec.md §3 "PromptEnvelope").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptEnvelope {
    pub system: String,
    pub user: String,
    pub tool_results_block: Option<String>,
    /// Human-readable description of the required output shape, e.g.
    /// "end with `#### N`" (spec.md §4.5).
    pub format_contract: String,
}

impl PromptEnvelope {
    pub fn new(system: impl Into<String>, user: impl Into<String>, format_contract: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            tool_results_block: None,
            format_contract: format_contract.into(),
        }
    }

    /// Injects tool results as a clearly delimited block (spec.md §4.2).
    pub fn with_tool_results(mut self, results: &[ToolResult]) -> Self {
        if results.is_empty() {
            return self;
        }
        let mut block = String::from("```tool-results\n");
        for r in results {
            block.push_str(&format!("{}: ok={} {:?}\n", r.id, r.ok, r.output));
        }
        block.push_str("```");
        self.tool_results_block = Some(block);
        self
    }

    /// Full rendered user-visible prompt text (system + tool block + user).
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.system.is_empty() {
            out.push_str(&self.system);
            out.push_str("\n\n");
        }
        if let Some(block) = &self.tool_results_block {
            out.push_str(block);
            out.push_str("\n\n");
        }
        out.push_str(&self.user);
        out.push_str("\n\n");
        out.push_str(&self.format_contract);
        out
    }
}

/// Token and dollar usage recorded from a single gateway call (spec.md §4.1:
/// "records raw usage ... with no post-hoc estimation").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
}

/// The result of one Provider Gateway call (spec.md §3 "ModelResponse").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub model_id: String,
    pub raw_text: String,
    /// Category-specific extracted structured answer, left as a string here
    /// and parsed by the refiner/handler that understands the category.
    pub extracted: Option<String>,
    pub usage: Usage,
    pub latency_ms: u64,
    pub error: Option<ErrorKind>,
}

impl ModelResponse {
    pub fn ok(model_id: impl Into<String>, raw_text: impl Into<String>, usage: Usage, latency_ms: u64) -> Self {
        Self {
            model_id: model_id.into(),
            raw_text: raw_text.into(),
            extracted: None,
            usage,
            latency_ms,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A `ModelResponse` enriched with a verification score and optional
/// critique (spec.md §3 "Candidate").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub response: ModelResponse,
    pub verification_score: f32,
    pub critique: Option<String>,
}

impl Candidate {
    pub fn new(response: ModelResponse) -> Self {
        Self {
            response,
            verification_score: 0.0,
            critique: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.verification_score = score;
        self
    }
}
