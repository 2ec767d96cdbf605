//! `ToolRequest`/`ToolResult` (spec.md §3, §4.2).

use serde::{Deserialize, Serialize};

use super::query::ToolId;

/// Typed payload sent to a tool. Never a free-form `eval` string for the
/// calculator — the grammar lives in `tools::calculator`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolPayload {
    Calculator { expression: String },
    CodeSandbox { program: String, tests: Vec<String> },
    WebSearch { query: String },
    Retrieve { query: String, top_k: usize },
    Rerank { query: String, passages: Vec<(String, String)> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: ToolId,
    pub payload: ToolPayload,
}

/// A single result a tool returned. Never fabricated (spec.md §3): `ok`
/// reflects whether the tool actually produced a deterministic result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub id: ToolId,
    pub ok: bool,
    pub output: ToolOutput,
}

/// Structured, tool-specific output (spec.md §9: "tagged data shape with
/// defensive coercion at the ingestion boundary").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolOutput {
    Calculator {
        value: Option<f64>,
        error: Option<String>,
    },
    CodeSandbox {
        per_test_pass: Vec<bool>,
        stderr: String,
    },
    WebSearch {
        results: Vec<WebSearchHit>,
    },
    Retrieve {
        passages: Vec<Passage>,
    },
    Rerank {
        scored: Vec<(String, f32)>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub score: f32,
}

impl ToolResult {
    pub fn calculator_ok(value: f64) -> Self {
        Self {
            id: ToolId::Calculator,
            ok: true,
            output: ToolOutput::Calculator {
                value: Some(value),
                error: None,
            },
        }
    }

    pub fn calculator_err(error: impl Into<String>) -> Self {
        Self {
            id: ToolId::Calculator,
            ok: false,
            output: ToolOutput::Calculator {
                value: None,
                error: Some(error.into()),
            },
        }
    }
}
