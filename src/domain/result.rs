//! `ConsensusDecision` and `OrchestrationResult` (spec.md §3).

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

use super::Category;

/// The winner of a consensus/voting round (spec.md §3 "ConsensusDecision").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusDecision {
    pub winning_answer: String,
    pub confidence: f32,
    pub vote_breakdown: Vec<(String, f32)>,
    pub was_unanimous: bool,
}

/// The final, engine-level output of one orchestration (spec.md §3
/// "OrchestrationResult").
///
/// Invariant 1 (spec.md §3): `final_text` is the output of exactly one
/// named `strategy`; no silent fallbacks — any deviation from the
/// requested plan must show up as an entry in `errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub final_text: String,
    pub category: Category,
    pub models_used: Vec<String>,
    pub tools_used: Vec<String>,
    pub strategy: String,
    pub confidence: f32,
    pub verified: bool,
    pub stage_latency_ms: Vec<(String, u64)>,
    pub cost_usd: f64,
    pub errors: Vec<ErrorKind>,
}

impl OrchestrationResult {
    pub fn total_latency_ms(&self) -> u64 {
        self.stage_latency_ms.iter().map(|(_, ms)| *ms).sum()
    }
}
