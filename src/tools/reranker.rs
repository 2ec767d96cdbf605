//! Reranking tool (spec.md §4.2, §4.4): scores `(query, passage)` pairs
//! so a handler can re-order a retriever's output. Deterministic and
//! lexical, matching the retriever's own scoring approach rather than
//! pulling in a cross-encoder dependency the ambient stack doesn't need.

use crate::domain::Passage;
use crate::error::ToolError;

pub struct Reranker;

impl Reranker {
    pub fn new() -> Self {
        Self
    }

    /// Returns `(passage_id, score)` pairs sorted by score descending.
    /// Scoring combines term overlap with a length-normalization term so
    /// that long passages stuffed with keywords don't dominate.
    pub fn rerank(&self, query: &str, passages: &[Passage]) -> Result<Vec<(String, f32)>, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::MalformedInput {
                tool: "rerank".to_string(),
                detail: "empty query".to_string(),
            });
        }
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let query_terms: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
        let mut scored: Vec<(String, f32)> = passages
            .iter()
            .map(|p| {
                let text_lower = p.text.to_lowercase();
                let hits = query_terms.iter().filter(|t| text_lower.contains(t.as_str())).count() as f32;
                let length_penalty = 1.0 + (p.text.split_whitespace().count() as f32 / 200.0);
                (p.id.clone(), hits / length_penalty)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, text: &str) -> Passage {
        Passage {
            id: id.to_string(),
            text: text.to_string(),
            score: 0.0,
        }
    }

    #[test]
    fn prefers_denser_match() {
        let passages = vec![
            passage("long", "paris paris paris and many unrelated filler words repeated to pad length out"),
            passage("short", "paris is the capital"),
        ];
        let ranked = Reranker::new().rerank("paris capital", &passages).unwrap();
        assert_eq!(ranked[0].0, "short");
    }

    #[test]
    fn empty_passages_yields_empty() {
        let ranked = Reranker::new().rerank("anything", &[]).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn empty_query_is_rejected() {
        let err = Reranker::new().rerank("", &[passage("p", "x")]).unwrap_err();
        assert!(matches!(err, ToolError::MalformedInput { .. }));
    }
}
