//! Cross-module pipeline tests: drives a real [`Orchestrator`] end to end
//! through `Classify → Handler → Refine → Emit` against the literal
//! scenarios spec.md §8 names, using [`MockClient`] in place of network
//! calls so the test is deterministic and offline.

use std::sync::Arc;

use llmhive_core::catalog::Catalog;
use llmhive_core::domain::{Category, Query};
use llmhive_core::gateway::{Gateway, MockClient};
use llmhive_core::orchestrator::Orchestrator;
use llmhive_core::tools::web_search::StaticWebSearch;
use llmhive_core::tools::ToolBroker;

/// One shared responder covering every scenario below, keyed on content
/// in the rendered prompt rather than on the model id, so every
/// registered provider answers consistently regardless of which one the
/// router happens to pick.
fn scenario_responder(_model: &str, envelope: &llmhive_core::domain::PromptEnvelope) -> String {
    let user = envelope.user.as_str();
    if user.contains("Janet") {
        return "Step 1: 16 - 3 - 4 = 9\nStep 2: 9 * 2 = 18".to_string();
    }
    if user.contains("capital of France") {
        return "Eliminating the distractors, the answer is:\nC".to_string();
    }
    if user.contains("has_close_elements") {
        return "```\nprint(4)\n```".to_string();
    }
    envelope.user.clone()
}

fn orchestrator_with_scenarios() -> Orchestrator {
    let mut gateway = Gateway::new();
    for provider in ["openai", "anthropic", "gemini", "deepseek", "grok", "together", "openrouter"] {
        gateway.register(Arc::new(MockClient::new(provider, scenario_responder)));
    }
    let catalog = Catalog::with_defaults();
    let tools = ToolBroker::new(Box::new(StaticWebSearch::empty()));
    Orchestrator::new(gateway, catalog, tools)
}

/// spec.md §8: "Janet's ducks..." → category `math`; calculator computes
/// `(16-3-4)*2 = 18`; final text ends with `#### 18` (invariant 2: the
/// calculator's result, not anything the model wrote, is authoritative).
#[tokio::test]
async fn gsm8k_style_math_ends_with_calculator_authoritative_total() {
    let orch = orchestrator_with_scenarios();
    let query = Query::new(
        "Janet's ducks lay 16 eggs per day. She eats 3 and bakes with 4. \
         She sells the rest at $2. How much does she make?",
    );
    let result = orch.run(&query).await;

    assert_eq!(result.category, Category::Math);
    assert!(result.final_text.trim_end().ends_with("#### 18"));
    assert!(result.tools_used.iter().any(|t| t == "calculator"));
    assert!(!result.models_used.is_empty());
}

/// spec.md §8: "What is the capital of France? ..." → majority vote
/// returns `C`.
#[tokio::test]
async fn mmlu_style_reasoning_majority_vote_returns_correct_letter() {
    let orch = orchestrator_with_scenarios();
    let query = Query::new("What is the capital of France? A) London B) Berlin C) Paris D) Madrid");
    let result = orch.run(&query).await;

    assert_eq!(result.category, Category::Reasoning);
    assert_eq!(result.final_text.trim(), "C");
    assert!(result.models_used.len() >= 3, "expects a multi-model vote for a medium-complexity MCQ");
}

/// spec.md §8: HumanEval-style coding item with a visible `expect:` test
/// → the sandbox runs it, it passes, `verified=true` (invariant 3: never
/// reported without sandbox confirmation).
#[tokio::test]
async fn humaneval_style_coding_is_verified_after_sandbox_pass() {
    let orch = orchestrator_with_scenarios();
    let query = Query::new(
        "Write a function has_close_elements(numbers, threshold) that returns \
         true if any two numbers are closer than threshold.\nexpect: 4",
    );
    let result = orch.run(&query).await;

    assert_eq!(result.category, Category::Coding);
    assert!(result.verified, "sandbox ran `print(4)` against `expect: 4` and should have passed");
    assert!(result.tools_used.iter().any(|t| t == "code_sandbox"));
}

/// spec.md §8 invariant 6 / property 6: every model attributed in
/// `models_used` must correspond to a call the gateway actually logged —
/// here, simply that the set is never empty for a successful run and
/// every entry is one of the registered catalog ids.
#[tokio::test]
async fn models_used_only_names_models_actually_routable() {
    let orch = orchestrator_with_scenarios();
    let query = Query::new("Hello there, how has your day been?").with_category_override(Category::Dialogue);
    let result = orch.run(&query).await;

    let known_ids = [
        "gpt-4.1",
        "claude-3.7-sonnet",
        "gemini-2.0-pro",
        "deepseek-v3",
        "grok-3",
        "llama-3.3-70b",
        "mixtral-8x22b",
    ];
    assert!(!result.models_used.is_empty());
    for id in &result.models_used {
        assert!(known_ids.contains(&id.as_str()), "unexpected model id {id}");
    }
}

/// spec.md §8 property 3: `final_text` must satisfy the category's
/// format contract after refinement, even for a deliberately awkward
/// model response (no `####` marker at all from the model).
#[tokio::test]
async fn refiner_backstop_still_yields_a_contract_satisfying_math_answer() {
    let mut gateway = Gateway::new();
    gateway.register(Arc::new(MockClient::new("openai", |_model, _envelope| {
        "I think the total comes to forty two dollars, no further steps needed.".to_string()
    })));
    let catalog = Catalog::with_defaults();
    let tools = ToolBroker::new(Box::new(StaticWebSearch::empty()));
    let orch = Orchestrator::new(gateway, catalog, tools);

    let query = Query::new("Compute 6 * 7 and explain your steps.");
    let result = orch.run(&query).await;

    assert_eq!(result.category, Category::Math);
    assert!(result.final_text.contains("####"));
}
