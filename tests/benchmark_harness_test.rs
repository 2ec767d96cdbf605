//! Cross-module benchmark harness tests: loads a suite file, drives it
//! through a real [`Orchestrator`] via [`benchmark::run`], and checks the
//! regression gate spec.md §4.10/§8 property 9 describes ("fails the run
//! iff a critical item fails").

use std::sync::Arc;

use llmhive_core::benchmark::{self, RunConfig, RunMode};
use llmhive_core::catalog::Catalog;
use llmhive_core::gateway::{Gateway, MockClient};
use llmhive_core::orchestrator::Orchestrator;
use llmhive_core::tools::web_search::StaticWebSearch;
use llmhive_core::tools::ToolBroker;

const SUITE_YAML: &str = r#"
metadata:
  suite_name: integration-smoke
  version: "1"
  categories: [math, reasoning]
prompts:
  - id: ducks
    category: math
    prompt: "Janet's ducks lay 16 eggs per day. She eats 3 and bakes with 4. She sells the rest at $2. How much does she make?"
    expected:
      numeric:
        value: 18
        tolerance: 0.01
    scoring:
      rule: numeric_equal
      objective_weight: 1.0
      critical: true
  - id: capital
    category: reasoning
    prompt: "What is the capital of France? A) London B) Berlin C) Paris D) Madrid"
    expected:
      regex: "^C$"
    scoring:
      rule: regex
      objective_weight: 1.0
      critical: false
"#;

fn scenario_responder(_model: &str, envelope: &llmhive_core::domain::PromptEnvelope) -> String {
    let user = envelope.user.as_str();
    if user.contains("Janet") {
        return "Step 1: 16 - 3 - 4 = 9\nStep 2: 9 * 2 = 18".to_string();
    }
    if user.contains("capital of France") {
        return "C".to_string();
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

/// Both items pass: the gate must pass and `report.json`/`report.md` must
/// both land on disk (spec.md §6 CLI output contract).
#[tokio::test]
async fn passing_suite_clears_the_regression_gate_and_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    let suite: benchmark::Suite = serde_yaml::from_str(SUITE_YAML).unwrap();
    let orch = orchestrator_with_scenarios();

    let mut config = RunConfig::new(dir.path());
    config.mode = RunMode::Local;
    config.seed = 7;

    let outcome = benchmark::run(&suite, Some(&orch), &config).await.unwrap();

    assert_eq!(outcome.report.item_count, 2);
    assert!(outcome.report.critical_failures.is_empty());
    assert!(outcome.gate_passed);
    assert!(dir.path().join("report.json").exists());
    assert!(dir.path().join("report.md").exists());
    assert!(dir.path().join("cases/ducks_default_0.json").exists());
    assert!(dir.path().join("cases/capital_default_0.json").exists());
}

/// spec.md §8 property 9: a critical item that fails must fail the gate,
/// even when the overall failure rate would otherwise be acceptable.
#[tokio::test]
async fn failing_critical_item_fails_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    let suite: benchmark::Suite = serde_yaml::from_str(SUITE_YAML).unwrap();

    // A model that always answers wrong on the math item: the critical
    // `ducks` case will fail numeric_equal against 18.
    let mut gateway = Gateway::new();
    for provider in ["openai", "anthropic", "gemini", "deepseek", "grok", "together", "openrouter"] {
        gateway.register(Arc::new(MockClient::new(provider, |_model, _envelope| {
            "Step 1: 1 + 1 = 2\n#### 2".to_string()
        })));
    }
    let catalog = Catalog::with_defaults();
    let tools = ToolBroker::new(Box::new(StaticWebSearch::empty()));
    let orch = Orchestrator::new(gateway, catalog, tools);

    let mut config = RunConfig::new(dir.path());
    config.seed = 3;

    let outcome = benchmark::run(&suite, Some(&orch), &config).await.unwrap();

    assert!(!outcome.report.critical_failures.is_empty());
    assert!(!outcome.gate_passed, "a failing critical item must fail the regression gate");
}

/// Deterministic sampling (spec.md §4.10): the same seed and suite
/// version produce the same item ordering across two independent runs.
#[tokio::test]
async fn identical_seed_produces_identical_item_order() {
    let suite: benchmark::Suite = serde_yaml::from_str(SUITE_YAML).unwrap();
    let first = benchmark::sample_order(suite.prompts.len(), 42, &suite.metadata.version);
    let second = benchmark::sample_order(suite.prompts.len(), 42, &suite.metadata.version);
    assert_eq!(first.indices, second.indices);
}

/// `critical_only` restricts the run to critical items only (spec.md §6
/// `bench run --critical-only`).
#[tokio::test]
async fn critical_only_runs_just_the_critical_item() {
    let dir = tempfile::tempdir().unwrap();
    let suite: benchmark::Suite = serde_yaml::from_str(SUITE_YAML).unwrap();
    let orch = orchestrator_with_scenarios();

    let mut config = RunConfig::new(dir.path());
    config.critical_only = true;

    let outcome = benchmark::run(&suite, Some(&orch), &config).await.unwrap();
    assert_eq!(outcome.report.item_count, 1);
}
