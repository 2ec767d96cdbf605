//! Selection functions over the model table (spec.md §4.3).
//!
//! The catalog is read-mostly shared state, the way `ProviderRegistry`
//! is in `coordination/src/registry/mod.rs` — no per-query mutation, so
//! a plain `Vec<ModelDescriptor>` behind a read lock is enough; there is
//! no health-tracking mutation loop to guard against here (that lives in
//! the gateway's circuit breaker instead).

use std::sync::RwLock;

use tracing::warn;

use crate::domain::{Category, ModelDescriptor, ModelRole, Tier};

use super::data::default_catalog;

/// A routed model plus the role it was requested under.
#[derive(Debug, Clone)]
pub struct RoutedModel {
    pub role: ModelRole,
    pub descriptor: ModelDescriptor,
}

/// Result of a routing request: what was found, and whether it fell
/// short of what was asked for (spec.md §4.3: "the router returns what
/// it has and records the shortfall in the result").
#[derive(Debug, Clone)]
pub struct RoutingResult {
    pub models: Vec<RoutedModel>,
    pub shortfall: usize,
}

/// One `(role, count)` line item in a routing request.
#[derive(Debug, Clone)]
pub struct RoutingRequest {
    pub category: Category,
    pub tier: Tier,
    pub roles: Vec<(ModelRole, usize)>,
    pub require_tools: bool,
}

/// Minimum capability score a model must have to be considered "fast
/// enough" by `fastest_for` (spec.md: "acceptable capability (score ≥ a
/// category floor)").
const CAPABILITY_FLOOR: u8 = 4;

pub struct Catalog {
    models: RwLock<Vec<ModelDescriptor>>,
}

impl Catalog {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models: RwLock::new(models),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_catalog())
    }

    pub fn replace(&self, models: Vec<ModelDescriptor>) {
        *self.models.write().expect("catalog lock poisoned") = models;
    }

    fn snapshot(&self) -> Vec<ModelDescriptor> {
        self.models.read().expect("catalog lock poisoned").clone()
    }

    /// The `k` models with the highest capability score for `category`
    /// within `tier`, breaking ties by latency tier then cost.
    pub fn top_for(&self, category: Category, k: usize, tier: Tier) -> Vec<ModelDescriptor> {
        let mut candidates: Vec<ModelDescriptor> =
            self.snapshot().into_iter().filter(|m| m.tier == tier).collect();
        sort_by_capability(&mut candidates, category);
        candidates.truncate(k);
        candidates
    }

    /// `top_for`, subject to a provider-diversity constraint: no two
    /// picks from the same provider until every distinct provider
    /// present has been used once.
    pub fn diverse_top_for(&self, category: Category, k: usize, tier: Tier) -> Vec<ModelDescriptor> {
        let mut candidates: Vec<ModelDescriptor> =
            self.snapshot().into_iter().filter(|m| m.tier == tier).collect();
        sort_by_capability(&mut candidates, category);

        let mut picked = Vec::new();
        let mut used_providers: std::collections::HashSet<String> = std::collections::HashSet::new();

        // First pass: one per unused provider, in score order.
        for model in &candidates {
            if picked.len() >= k {
                break;
            }
            if used_providers.insert(model.provider.clone()) {
                picked.push(model.clone());
            }
        }

        // Second pass: fill any remaining slots in score order, providers
        // may now repeat.
        if picked.len() < k {
            for model in &candidates {
                if picked.len() >= k {
                    break;
                }
                if !picked.iter().any(|p| p.id == model.id) {
                    picked.push(model.clone());
                }
            }
        }

        picked
    }

    /// `top_for` restricted to `supports_tools=true`.
    pub fn tool_capable_for(&self, category: Category, k: usize, tier: Tier) -> Vec<ModelDescriptor> {
        let mut candidates: Vec<ModelDescriptor> = self
            .snapshot()
            .into_iter()
            .filter(|m| m.tier == tier && m.supports_tools)
            .collect();
        sort_by_capability(&mut candidates, category);
        candidates.truncate(k);
        candidates
    }

    /// The single lowest-latency model with capability ≥ [`CAPABILITY_FLOOR`]
    /// for `category`, across all tiers.
    pub fn fastest_for(&self, category: Category) -> Option<ModelDescriptor> {
        self.snapshot()
            .into_iter()
            .filter(|m| m.capability_for(category) >= CAPABILITY_FLOOR)
            .min_by(|a, b| {
                a.latency_tier
                    .cmp(&b.latency_tier)
                    .then(a.cost_per_1k_tokens.partial_cmp(&b.cost_per_1k_tokens).unwrap_or(std::cmp::Ordering::Equal))
            })
    }

    /// Resolves a full [`RoutingRequest`] role-by-role, recording any
    /// shortfall when the catalog cannot satisfy a requested count.
    pub fn route(&self, request: &RoutingRequest) -> RoutingResult {
        let mut models = Vec::new();
        let mut shortfall = 0usize;

        for (role, count) in &request.roles {
            let found = if request.require_tools {
                self.tool_capable_for(request.category, *count, request.tier)
            } else {
                self.diverse_top_for(request.category, *count, request.tier)
            };

            if found.len() < *count {
                let missing = count - found.len();
                shortfall += missing;
                warn!(
                    category = %request.category,
                    role = ?role,
                    requested = count,
                    found = found.len(),
                    "router shortfall"
                );
            }

            models.extend(found.into_iter().map(|descriptor| RoutedModel {
                role: *role,
                descriptor,
            }));
        }

        RoutingResult { models, shortfall }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn sort_by_capability(candidates: &mut [ModelDescriptor], category: Category) {
    candidates.sort_by(|a, b| {
        b.capability_for(category)
            .cmp(&a.capability_for(category))
            .then(a.latency_tier.cmp(&b.latency_tier))
            .then(a.cost_per_1k_tokens.partial_cmp(&b.cost_per_1k_tokens).unwrap_or(std::cmp::Ordering::Equal))
    });
}
