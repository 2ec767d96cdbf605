//! RAG retrieval tool (spec.md §4.2, §4.4): top-k passages for a query
//! over a caller-supplied corpus. No vector store or persistence layer —
//! that is explicitly out of scope (spec.md Non-goals).

use crate::domain::Passage;
use crate::error::ToolError;

/// A retrievable corpus entry. Scoring here is lexical overlap, not a
/// learned embedding — the embedding/vector-store layer is a Non-goal.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub id: String,
    pub text: String,
}

pub struct Retriever {
    corpus: Vec<CorpusEntry>,
}

impl Retriever {
    pub fn new(corpus: Vec<CorpusEntry>) -> Self {
        Self { corpus }
    }

    /// Returns the `top_k` passages by term-overlap score, descending.
    /// Empty corpus yields an empty list, not an error — callers decide
    /// whether "no passages" should fall back to another strategy.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::MalformedInput {
                tool: "retrieve".to_string(),
                detail: "empty query".to_string(),
            });
        }

        let query_terms: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
        let mut scored: Vec<Passage> = self
            .corpus
            .iter()
            .map(|entry| {
                let text_lower = entry.text.to_lowercase();
                let hits = query_terms.iter().filter(|t| text_lower.contains(t.as_str())).count();
                let score = hits as f32 / query_terms.len().max(1) as f32;
                Passage {
                    id: entry.id.clone(),
                    text: entry.text.clone(),
                    score,
                }
            })
            .filter(|p| p.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Retriever {
        Retriever::new(vec![
            CorpusEntry {
                id: "p1".to_string(),
                text: "the capital of france is paris".to_string(),
            },
            CorpusEntry {
                id: "p2".to_string(),
                text: "mount everest is the tallest mountain".to_string(),
            },
        ])
    }

    #[test]
    fn retrieves_relevant_passage_first() {
        let results = corpus().retrieve("capital of france", 2).unwrap();
        assert_eq!(results[0].id, "p1");
    }

    #[test]
    fn empty_query_is_rejected() {
        let err = corpus().retrieve("", 2).unwrap_err();
        assert!(matches!(err, ToolError::MalformedInput { .. }));
    }

    #[test]
    fn no_match_yields_empty_not_error() {
        let results = corpus().retrieve("quantum entanglement", 2).unwrap();
        assert!(results.is_empty());
    }
}
