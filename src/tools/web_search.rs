//! Web search tool (spec.md §4.2): returns a ranked list of
//! `(title, url, snippet)` hits. Never invoked for static-knowledge
//! queries — that decision belongs to the broker, not this module.

use async_trait::async_trait;

use crate::domain::WebSearchHit;
use crate::error::ToolError;

#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<WebSearchHit>, ToolError>;
}

/// Deterministic provider for tests and `mode=local` benchmark runs: it
/// never touches the network, matching [`crate::gateway::client::MockClient`]'s
/// role on the gateway side.
pub struct StaticWebSearch {
    corpus: Vec<WebSearchHit>,
}

impl StaticWebSearch {
    pub fn new(corpus: Vec<WebSearchHit>) -> Self {
        Self { corpus }
    }

    pub fn empty() -> Self {
        Self { corpus: Vec::new() }
    }
}

#[async_trait]
impl WebSearchProvider for StaticWebSearch {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<WebSearchHit>, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::MalformedInput {
                tool: "web_search".to_string(),
                detail: "empty query".to_string(),
            });
        }
        let query_lower = query.to_lowercase();
        let mut scored: Vec<(usize, &WebSearchHit)> = self
            .corpus
            .iter()
            .map(|hit| {
                let haystack = format!("{} {}", hit.title, hit.snippet).to_lowercase();
                let score = query_lower
                    .split_whitespace()
                    .filter(|term| haystack.contains(*term))
                    .count();
                (score, hit)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(top_k).map(|(_, hit)| hit.clone()).collect())
    }
}
