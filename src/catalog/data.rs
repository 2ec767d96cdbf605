//! The static model table (spec.md §4.3). Capability scores are 0-10,
//! hand-assigned placeholders standing in for whatever benchmark numbers
//! an operator would plug in — the router only needs the scores to be
//! comparable within a category, not objectively accurate.

use std::collections::HashMap;

use crate::domain::{Category, LatencyTier, ModelDescriptor, Tier};

fn caps(pairs: &[(Category, u8)]) -> HashMap<Category, u8> {
    pairs.iter().copied().collect()
}

/// Returns the built-in model table. Operators may instead load a
/// YAML/JSON table at startup (spec.md §5 "Persisted state": "model
/// catalog YAML/JSON table") — this is the fallback when none is
/// supplied.
pub fn default_catalog() -> Vec<ModelDescriptor> {
    use Category::*;

    vec![
        ModelDescriptor {
            id: "gpt-4.1".to_string(),
            provider: "openai".to_string(),
            context_window_tokens: 128_000,
            supports_tools: true,
            capability: caps(&[
                (Math, 8),
                (Coding, 9),
                (Reasoning, 8),
                (Rag, 7),
                (LongContext, 6),
                (Multilingual, 8),
                (ToolUse, 9),
                (Dialogue, 8),
                (General, 8),
            ]),
            latency_tier: LatencyTier(2),
            cost_per_1k_tokens: 0.01,
            tier: Tier::Elite,
        },
        ModelDescriptor {
            id: "claude-3.7-sonnet".to_string(),
            provider: "anthropic".to_string(),
            context_window_tokens: 200_000,
            supports_tools: true,
            capability: caps(&[
                (Math, 8),
                (Coding, 9),
                (Reasoning, 9),
                (Rag, 8),
                (LongContext, 9),
                (Multilingual, 7),
                (ToolUse, 8),
                (Dialogue, 9),
                (General, 9),
            ]),
            latency_tier: LatencyTier(2),
            cost_per_1k_tokens: 0.012,
            tier: Tier::Elite,
        },
        ModelDescriptor {
            id: "gemini-2.0-pro".to_string(),
            provider: "gemini".to_string(),
            context_window_tokens: 1_000_000,
            supports_tools: true,
            capability: caps(&[
                (Math, 7),
                (Coding, 7),
                (Reasoning, 7),
                (Rag, 8),
                (LongContext, 10),
                (Multilingual, 9),
                (ToolUse, 7),
                (Dialogue, 7),
                (General, 7),
            ]),
            latency_tier: LatencyTier(3),
            cost_per_1k_tokens: 0.007,
            tier: Tier::Elite,
        },
        ModelDescriptor {
            id: "deepseek-v3".to_string(),
            provider: "deepseek".to_string(),
            context_window_tokens: 64_000,
            supports_tools: true,
            capability: caps(&[
                (Math, 9),
                (Coding, 8),
                (Reasoning, 8),
                (Rag, 6),
                (LongContext, 5),
                (Multilingual, 6),
                (ToolUse, 6),
                (Dialogue, 6),
                (General, 7),
            ]),
            latency_tier: LatencyTier(2),
            cost_per_1k_tokens: 0.002,
            tier: Tier::Free,
        },
        ModelDescriptor {
            id: "grok-3".to_string(),
            provider: "grok".to_string(),
            context_window_tokens: 128_000,
            supports_tools: false,
            capability: caps(&[
                (Math, 6),
                (Coding, 6),
                (Reasoning, 7),
                (Rag, 5),
                (LongContext, 6),
                (Multilingual, 5),
                (ToolUse, 2),
                (Dialogue, 7),
                (General, 6),
            ]),
            latency_tier: LatencyTier(1),
            cost_per_1k_tokens: 0.005,
            tier: Tier::Free,
        },
        ModelDescriptor {
            id: "llama-3.3-70b".to_string(),
            provider: "together".to_string(),
            context_window_tokens: 32_000,
            supports_tools: false,
            capability: caps(&[
                (Math, 5),
                (Coding, 5),
                (Reasoning, 6),
                (Rag, 6),
                (LongContext, 4),
                (Multilingual, 6),
                (ToolUse, 2),
                (Dialogue, 6),
                (General, 5),
            ]),
            latency_tier: LatencyTier(1),
            cost_per_1k_tokens: 0.0009,
            tier: Tier::Free,
        },
        ModelDescriptor {
            id: "mixtral-8x22b".to_string(),
            provider: "openrouter".to_string(),
            context_window_tokens: 64_000,
            supports_tools: false,
            capability: caps(&[
                (Math, 5),
                (Coding, 6),
                (Reasoning, 5),
                (Rag, 6),
                (LongContext, 5),
                (Multilingual, 7),
                (ToolUse, 1),
                (Dialogue, 5),
                (General, 5),
            ]),
            latency_tier: LatencyTier(1),
            cost_per_1k_tokens: 0.0012,
            tier: Tier::Free,
        },
    ]
}
