//! RAG handler (spec.md §4.6): two-stage retrieval (fused top-K, then
//! rerank), optionally an LLM re-ranking pass restricted to the already
//! filtered top-K, and a sanity check before returning — falling back
//! to the fused ranking if the sanity check fails.
//!
//! The corpus itself is supplied by the caller via `Query.prior_context`
//! as `id: text` lines separated by blank lines; there is no persisted
//! vector store behind this handler (spec.md Non-goals).

use crate::domain::{Category, Passage, QueryAnalysis};
use crate::error::HandlerError;
use crate::tools::retriever::CorpusEntry;

use super::{HandlerContext, HandlerOutcome};

/// Default top-K for the first-stage fused retrieval (spec.md §4.6:
/// "K configurable, default 20").
const DEFAULT_TOP_K: usize = 20;

/// Minimum word count the top-1 passage must meet for the sanity check
/// to pass (spec.md §4.6 step 3).
const MIN_SANITY_WORD_COUNT: usize = 3;

pub async fn handle(ctx: &HandlerContext<'_>, analysis: &QueryAnalysis, prompt: &str) -> Result<HandlerOutcome, HandlerError> {
    let corpus_text = extract_corpus_block(prompt);
    let corpus = parse_corpus(&corpus_text);

    if corpus.is_empty() {
        return Err(HandlerError::CapabilityUnavailable {
            category: Category::Rag.to_string(),
        });
    }

    let fused = ctx.tools.retrieve_over(corpus, prompt, DEFAULT_TOP_K)?;
    let fused_passages = match &fused.output {
        crate::domain::ToolOutput::Retrieve { passages } => passages.clone(),
        _ => Vec::new(),
    };

    let mut outcome = HandlerOutcome::new(String::new(), 0.8);
    outcome.tools_used.push("retrieve".to_string());

    let reranked = rerank(ctx, prompt, &fused_passages).await?;
    outcome.tools_used.push("rerank".to_string());

    let ordering = if passes_sanity_check(prompt, &reranked, &fused_passages) {
        reranked
    } else {
        fused_passages.iter().map(|p| p.id.clone()).collect()
    };

    outcome.final_text = ordering.join(",");
    outcome.verified = true;
    let _ = analysis;
    Ok(outcome)
}

fn extract_corpus_block(prompt: &str) -> String {
    prompt.to_string()
}

fn parse_corpus(text: &str) -> Vec<CorpusEntry> {
    text.split("\n\n")
        .filter_map(|block| {
            let (id, rest) = block.split_once(':')?;
            let id = id.trim();
            if id.is_empty() || !id.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                return None;
            }
            Some(CorpusEntry {
                id: id.to_string(),
                text: rest.trim().to_string(),
            })
        })
        .collect()
}

async fn rerank(ctx: &HandlerContext<'_>, query: &str, passages: &[Passage]) -> Result<Vec<String>, HandlerError> {
    if passages.is_empty() {
        return Ok(Vec::new());
    }
    let payload_pairs: Vec<(String, String)> = passages.iter().map(|p| (p.id.clone(), p.text.clone())).collect();
    let request = crate::domain::ToolRequest {
        id: crate::domain::ToolId::Rerank,
        payload: crate::domain::ToolPayload::Rerank {
            query: query.to_string(),
            passages: payload_pairs,
        },
    };
    let result = ctx.tools.dispatch(&request).await?;
    match result.output {
        crate::domain::ToolOutput::Rerank { scored } => Ok(scored.into_iter().map(|(id, _)| id).collect()),
        _ => Ok(Vec::new()),
    }
}

/// Minimum number of content tokens the top-1 passage must share with
/// the query for the sanity check to pass (spec.md §4.6 step 3).
const MIN_SHARED_CONTENT_TOKENS: usize = 2;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "of", "in", "to", "and", "or", "for", "on",
    "with", "that", "this", "it", "as", "by", "at", "be", "what", "which", "who", "does", "do",
];

fn content_tokens(text: &str) -> std::collections::HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Sanity check (spec.md §4.6 step 3): the top-1 passage must share at
/// least two content tokens with the query and meet a minimum word
/// count, else the fused ranking is used instead.
fn passes_sanity_check(query: &str, ordering: &[String], passages: &[Passage]) -> bool {
    let Some(top_id) = ordering.first() else {
        return false;
    };
    let Some(top) = passages.iter().find(|p| &p.id == top_id) else {
        return false;
    };
    if top.text.split_whitespace().count() < MIN_SANITY_WORD_COUNT {
        return false;
    }
    let query_tokens = content_tokens(query);
    let top_tokens = content_tokens(&top.text);
    query_tokens.intersection(&top_tokens).count() >= MIN_SHARED_CONTENT_TOKENS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_text_blocks() {
        let text = "p1: the capital of france is paris\n\np2: mount everest is tall";
        let corpus = parse_corpus(text);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0].id, "p1");
    }

    #[test]
    fn sanity_check_rejects_empty_ordering() {
        assert!(!passes_sanity_check("what is the capital of france", &[], &[]));
    }

    #[test]
    fn sanity_check_rejects_irrelevant_top_passage() {
        let passages = vec![Passage {
            id: "p1".to_string(),
            text: "mount everest is the tallest mountain on earth".to_string(),
            score: 0.9,
        }];
        let ordering = vec!["p1".to_string()];
        assert!(!passes_sanity_check("what is the capital of france", &ordering, &passages));
    }

    #[test]
    fn sanity_check_accepts_relevant_top_passage() {
        let passages = vec![Passage {
            id: "p1".to_string(),
            text: "the capital of france is paris".to_string(),
            score: 0.9,
        }];
        let ordering = vec!["p1".to_string()];
        assert!(passes_sanity_check("what is the capital of france", &ordering, &passages));
    }
}
