//! `ModelDescriptor` and its supporting types (spec.md §3, §4.3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Category, Tier};

/// Coarse latency bucket; lower is faster. Used for tie-breaking in
/// `top_for` (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LatencyTier(pub u8);

/// A row in the Model Catalog (spec.md §3 "ModelDescriptor").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub provider: String,
    pub context_window_tokens: u32,
    pub supports_tools: bool,
    /// Per-category capability score in `[0, 10]` (spec.md §3 describes
    /// `[0,100]`; this core's catalog data and `CAPABILITY_FLOOR` both
    /// use a 0-10 scale, comparable within a category only).
    pub capability: HashMap<Category, u8>,
    pub latency_tier: LatencyTier,
    pub cost_per_1k_tokens: f64,
    pub tier: Tier,
}

impl ModelDescriptor {
    pub fn capability_for(&self, category: Category) -> u8 {
        self.capability.get(&category).copied().unwrap_or(0)
    }
}
