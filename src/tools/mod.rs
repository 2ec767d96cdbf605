//! Tool Broker (spec.md §4.2): dispatches a [`ToolRequest`] to the right
//! tool implementation and returns a [`ToolResult`], never inventing a
//! result for a tool that did not actually run.
//!
//! Dispatch is a flat match on [`ToolId`], in the keyword-driven style of
//! `coordination/src/router/task_classifier.rs` rather than a trait-object
//! registry — there are exactly five tools and they are not user
//! extensible, so the extra indirection buys nothing.

pub mod calculator;
pub mod reranker;
pub mod retriever;
pub mod sandbox;
pub mod web_search;

use std::time::Duration;

use tracing::warn;

use crate::domain::{ToolId, ToolOutput, ToolPayload, ToolRequest, ToolResult};
use crate::error::ToolError;
use reranker::Reranker;
use retriever::{CorpusEntry, Retriever};
use sandbox::TestCase;
use web_search::{StaticWebSearch, WebSearchProvider};

/// Broker configuration: the corpora and providers that back `retrieve`,
/// `rerank`, and `web_search`. Handlers supply these per call; the broker
/// itself holds no state across queries (spec.md: no conversation
/// persistence).
pub struct ToolBroker {
    web_search: Box<dyn WebSearchProvider>,
    sandbox_timeout: Duration,
}

impl ToolBroker {
    pub fn new(web_search: Box<dyn WebSearchProvider>) -> Self {
        Self {
            web_search,
            sandbox_timeout: sandbox::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_sandbox_timeout(mut self, timeout: Duration) -> Self {
        self.sandbox_timeout = timeout;
        self
    }

    /// Executes one tool request and returns its typed result. Failures
    /// in the tool itself are surfaced as `ok: false` results, not as a
    /// propagated `Err` — only requests malformed enough that no tool
    /// could possibly run are rejected at the top.
    pub async fn dispatch(&self, request: &ToolRequest) -> Result<ToolResult, ToolError> {
        match (&request.id, &request.payload) {
            (ToolId::Calculator, ToolPayload::Calculator { expression }) => {
                Ok(match calculator::evaluate(expression) {
                    Ok(value) => ToolResult::calculator_ok(value),
                    Err(e) => ToolResult::calculator_err(e.to_string()),
                })
            }
            (ToolId::CodeSandbox, ToolPayload::CodeSandbox { program, tests }) => {
                let cases: Vec<TestCase> = tests
                    .iter()
                    .map(|t| TestCase {
                        input: String::new(),
                        expected_stdout: t.clone(),
                    })
                    .collect();
                match sandbox::run_tests(program, &cases, self.sandbox_timeout).await {
                    Ok(report) => Ok(ToolResult {
                        id: ToolId::CodeSandbox,
                        ok: report.all_pass(),
                        output: ToolOutput::CodeSandbox {
                            per_test_pass: report.per_test_pass,
                            stderr: report.stderr,
                        },
                    }),
                    Err(e) => {
                        warn!(tool = "code_sandbox", error = %e, "sandbox failed");
                        Err(e)
                    }
                }
            }
            (ToolId::WebSearch, ToolPayload::WebSearch { query }) => {
                match self.web_search.search(query, 5).await {
                    Ok(results) => Ok(ToolResult {
                        id: ToolId::WebSearch,
                        ok: !results.is_empty(),
                        output: ToolOutput::WebSearch { results },
                    }),
                    Err(e) => Err(e),
                }
            }
            (ToolId::Retrieve, ToolPayload::Retrieve { query, top_k }) => {
                // The broker holds no corpus of its own; retrieval against
                // a caller-supplied corpus goes through `retrieve_over`.
                let _ = (query, top_k);
                Err(ToolError::MalformedInput {
                    tool: "retrieve".to_string(),
                    detail: "retrieve requires a corpus; use ToolBroker::retrieve_over".to_string(),
                })
            }
            (ToolId::Rerank, ToolPayload::Rerank { query, passages }) => {
                let passages: Vec<crate::domain::Passage> = passages
                    .iter()
                    .map(|(id, text)| crate::domain::Passage {
                        id: id.clone(),
                        text: text.clone(),
                        score: 0.0,
                    })
                    .collect();
                match Reranker::new().rerank(query, &passages) {
                    Ok(scored) => Ok(ToolResult {
                        id: ToolId::Rerank,
                        ok: true,
                        output: ToolOutput::Rerank { scored },
                    }),
                    Err(e) => Err(e),
                }
            }
            (id, payload) => Err(ToolError::MalformedInput {
                tool: id.to_string(),
                detail: format!("payload does not match tool id: {payload:?}"),
            }),
        }
    }

    /// Retrieval against an explicit corpus (spec.md §4.4's RAG handler
    /// supplies its own corpus per query; there is no persisted index).
    pub fn retrieve_over(&self, corpus: Vec<CorpusEntry>, query: &str, top_k: usize) -> Result<ToolResult, ToolError> {
        let passages = Retriever::new(corpus).retrieve(query, top_k)?;
        Ok(ToolResult {
            id: ToolId::Retrieve,
            ok: !passages.is_empty(),
            output: ToolOutput::Retrieve { passages },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker() -> ToolBroker {
        ToolBroker::new(Box::new(StaticWebSearch::empty()))
    }

    #[tokio::test]
    async fn calculator_dispatch_succeeds() {
        let result = broker()
            .dispatch(&ToolRequest {
                id: ToolId::Calculator,
                payload: ToolPayload::Calculator {
                    expression: "2+2".to_string(),
                },
            })
            .await
            .unwrap();
        assert!(result.ok);
    }

    #[tokio::test]
    async fn calculator_malformed_expression_is_ok_false_not_err() {
        let result = broker()
            .dispatch(&ToolRequest {
                id: ToolId::Calculator,
                payload: ToolPayload::Calculator {
                    expression: "2 + ".to_string(),
                },
            })
            .await
            .unwrap();
        assert!(!result.ok);
    }

    #[tokio::test]
    async fn mismatched_payload_is_rejected() {
        let err = broker()
            .dispatch(&ToolRequest {
                id: ToolId::Calculator,
                payload: ToolPayload::WebSearch {
                    query: "x".to_string(),
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn sandbox_dispatch_runs_tests() {
        let result = broker()
            .dispatch(&ToolRequest {
                id: ToolId::CodeSandbox,
                payload: ToolPayload::CodeSandbox {
                    program: "print('hello')".to_string(),
                    tests: vec!["hello".to_string()],
                },
            })
            .await
            .unwrap();
        assert!(result.ok);
    }

    #[test]
    fn retrieve_over_explicit_corpus() {
        let corpus = vec![CorpusEntry {
            id: "p1".to_string(),
            text: "rust ownership model".to_string(),
        }];
        let result = broker().retrieve_over(corpus, "ownership", 3).unwrap();
        assert!(result.ok);
    }
}
