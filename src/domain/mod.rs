//! Core data model shared across the orchestration pipeline (spec.md §3).
//!
//! Every type here is owned by a single orchestration and does not outlive
//! it, except through the benchmark harness's per-item checkpoint record
//! (spec.md §3 "Lifecycles").

mod catalog_types;
mod envelope;
mod query;
mod result;
mod tool;

pub use catalog_types::*;
pub use envelope::*;
pub use query::*;
pub use result::*;
pub use tool::*;

use serde::{Deserialize, Serialize};

/// Task category, assigned by the Classifier (spec.md §3, glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Math,
    Coding,
    Reasoning,
    Rag,
    LongContext,
    Multilingual,
    ToolUse,
    Dialogue,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Coding => "coding",
            Self::Reasoning => "reasoning",
            Self::Rag => "rag",
            Self::LongContext => "long_context",
            Self::Multilingual => "multilingual",
            Self::ToolUse => "tool_use",
            Self::Dialogue => "dialogue",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Query complexity (spec.md §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// Quality tier. The router never crosses tiers unless explicitly asked
/// (glossary: "Elite tier / Free tier").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Elite,
    Free,
}

/// The role a model is requested under within a strategy (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Primary,
    Verifier,
    Specialist,
    Fallback,
}
