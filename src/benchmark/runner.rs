//! Drives an engine against a suite (spec.md §4.10, §6 `bench run`).
//!
//! Two execution modes: `local` drives an in-process [`Orchestrator`]
//! directly (no network hop, used in CI and tests); `http` drives a
//! running server's `/v1/chat` endpoint, the way an external load
//! generator would. Grounded on `coordination/src/benchmark/problem.rs`'s
//! `BenchmarkSession` for per-item iteration, generalized to run each
//! item under N named "systems" and M repeats.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Category, Query, Tier};
use crate::error::BenchmarkError;
use crate::orchestrator::Orchestrator;

use super::checkpoint::{CheckpointRecord, CheckpointStore};
use super::report::{aggregate, render_markdown, ItemOutcome, Report};
use super::sampling::sample_order;
use super::scoring::score_item;
use super::suite::{Suite, SuiteItem};

/// How the harness reaches the engine under test.
pub enum RunMode {
    /// Drives an in-process [`Orchestrator`] directly.
    Local,
    /// POSTs to a running server's `/v1/chat` (spec.md §6).
    Http { base_url: String },
}

/// One `bench run` invocation's resolved configuration (spec.md §6 CLI grammar).
pub struct RunConfig {
    pub systems: Vec<String>,
    pub runs_per_case: usize,
    pub mode: RunMode,
    pub outdir: PathBuf,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub categories: Vec<String>,
    pub prompt_ids: Vec<String>,
    pub critical_only: bool,
    pub verbose: bool,
    pub seed: u64,
    pub max_failure_rate: f64,
}

impl RunConfig {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            systems: vec!["default".to_string()],
            runs_per_case: 1,
            mode: RunMode::Local,
            outdir: outdir.into(),
            temperature: 0.0,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            categories: Vec::new(),
            prompt_ids: Vec::new(),
            critical_only: false,
            verbose: false,
            seed: 0,
            max_failure_rate: 0.2,
        }
    }
}

/// One recorded case, written verbatim to `cases/<id>_<system>_<run>.json`.
#[derive(Debug, Clone, Serialize)]
struct CaseRecord<'a> {
    item_id: &'a str,
    system: &'a str,
    run_index: usize,
    prompt: &'a str,
    final_text: String,
    category: String,
    strategy: String,
    confidence: f32,
    verified: bool,
    cost_usd: f64,
    latency_ms: u64,
    passed: bool,
    score_detail: String,
    errors: Vec<crate::error::ErrorKind>,
}

/// Final outcome of one `bench run` invocation.
pub struct RunOutcome {
    pub run_id: String,
    pub report: Report,
    pub gate_passed: bool,
}

/// Executes `suite` under `config` against the in-process `orchestrator`
/// (required for [`RunMode::Local`], ignored for [`RunMode::Http`]).
/// Writes `report.json`, `report.md`, and one case file per run to
/// `config.outdir`, checkpointing after every item so an interrupted run
/// can resume.
pub async fn run(
    suite: &Suite,
    orchestrator: Option<&Orchestrator>,
    config: &RunConfig,
) -> Result<RunOutcome, BenchmarkError> {
    std::fs::create_dir_all(&config.outdir)?;
    std::fs::create_dir_all(config.outdir.join("cases"))?;

    let run_id = Uuid::new_v4().to_string();
    let checkpoint = CheckpointStore::new(config.outdir.join("checkpoints.jsonl"));

    let mut items = suite.filter_categories(&config.categories);
    items = intersect_ids(items, &suite.filter_ids(&config.prompt_ids));
    if config.critical_only {
        items.retain(|item| item.scoring.critical);
    }

    let order = sample_order(items.len(), config.seed, &suite.metadata.version);
    let ordered: Vec<&SuiteItem> = order.indices.iter().map(|&i| items[i]).collect();

    let mut outcomes = Vec::new();
    let already_done = checkpoint.completed_items(&suite.metadata.version, &run_id).unwrap_or_default();

    for item in &ordered {
        for system in &config.systems {
            for run_index in 0..config.runs_per_case {
                let checkpoint_key = format!("{}:{}:{}", item.id, system, run_index);
                if already_done.contains(&checkpoint_key) {
                    continue;
                }
                if config.verbose {
                    tracing::info!(item = %item.id, system = %system, run_index, "bench item starting");
                }

                let (result, latency_ms) = match &config.mode {
                    RunMode::Local => {
                        let orchestrator = orchestrator
                            .ok_or_else(|| BenchmarkError::SuiteLoad("local mode requires an Orchestrator".to_string()))?;
                        run_local(orchestrator, item, system).await
                    }
                    RunMode::Http { base_url } => run_http(base_url, item, system, config).await?,
                };

                let score = score_item(item, &result);
                let outcome = ItemOutcome::from_run(item, &result, &score);

                let case = CaseRecord {
                    item_id: &item.id,
                    system,
                    run_index,
                    prompt: &item.prompt,
                    final_text: result.final_text.clone(),
                    category: result.category.to_string(),
                    strategy: result.strategy.clone(),
                    confidence: result.confidence,
                    verified: result.verified,
                    cost_usd: result.cost_usd,
                    latency_ms,
                    passed: score.passed,
                    score_detail: score.detail.clone(),
                    errors: result.errors.clone(),
                };
                let case_path = config
                    .outdir
                    .join("cases")
                    .join(format!("{}_{}_{}.json", item.id, system, run_index));
                std::fs::write(&case_path, serde_json::to_vec_pretty(&case).map_err(|e| BenchmarkError::Checkpoint(e.to_string()))?)?;

                checkpoint.record(CheckpointRecord {
                    suite_version: suite.metadata.version.clone(),
                    run_id: run_id.clone(),
                    item_id: checkpoint_key,
                    score: score.composite,
                    passed: score.passed,
                    cost_usd: result.cost_usd,
                    latency_ms,
                    timestamp: Utc::now(),
                })?;

                outcomes.push(outcome);
            }
        }
    }

    let previous_outcomes = load_previous_report_outcomes(&config.outdir);
    let report = aggregate(&outcomes, previous_outcomes.as_deref());
    let gate_passed = super::report::regression_gate_passes(&report, config.max_failure_rate);

    std::fs::write(
        config.outdir.join("report.json"),
        serde_json::to_vec_pretty(&report).map_err(|e| BenchmarkError::Checkpoint(e.to_string()))?,
    )?;
    std::fs::write(config.outdir.join("report.md"), render_markdown(&report))?;
    std::fs::write(
        config.outdir.join("outcomes.json"),
        serde_json::to_vec_pretty(&outcomes).map_err(|e| BenchmarkError::Checkpoint(e.to_string()))?,
    )?;

    Ok(RunOutcome {
        run_id,
        report,
        gate_passed,
    })
}

fn intersect_ids<'a>(a: Vec<&'a SuiteItem>, b: &[&'a SuiteItem]) -> Vec<&'a SuiteItem> {
    let b_ids: std::collections::HashSet<&str> = b.iter().map(|item| item.id.as_str()).collect();
    a.into_iter().filter(|item| b_ids.contains(item.id.as_str())).collect()
}

/// Best-effort regression baseline: `outcomes.json` left by a previous run
/// in the same `outdir` (spec.md §4.10 "regression report against the
/// previous run"). Missing or unparsable is simply "no baseline", never a
/// hard error — a fresh `outdir` just skips the regression section.
fn load_previous_report_outcomes(outdir: &std::path::Path) -> Option<Vec<ItemOutcome>> {
    let bytes = std::fs::read(outdir.join("outcomes.json")).ok()?;
    serde_json::from_slice(&bytes).ok()
}

async fn run_local(orchestrator: &Orchestrator, item: &SuiteItem, system: &str) -> (crate::domain::OrchestrationResult, u64) {
    let tier = system_tier(system);
    let mut query = Query::new(item.prompt.clone()).with_category_override(item.category);
    if let Some(tier) = tier {
        query = query.with_tier_hint(tier);
    }
    let result = orchestrator.run(&query).await;
    let latency_ms = result.total_latency_ms();
    (result, latency_ms)
}

async fn run_http(
    base_url: &str,
    item: &SuiteItem,
    system: &str,
    config: &RunConfig,
) -> Result<(crate::domain::OrchestrationResult, u64), BenchmarkError> {
    #[derive(Serialize)]
    struct ChatRequest<'a> {
        prompt: &'a str,
        category: &'a str,
        tier: Option<&'static str>,
    }

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| BenchmarkError::SuiteLoad(e.to_string()))?;

    let body = ChatRequest {
        prompt: &item.prompt,
        category: item.category.as_str(),
        tier: system_tier(system).map(|t| if t == Tier::Elite { "elite" } else { "free" }),
    };

    let response = client
        .post(format!("{base_url}/v1/chat"))
        .json(&body)
        .send()
        .await
        .map_err(|e| BenchmarkError::Checkpoint(format!("http mode request failed: {e}")))?;

    let api_response: crate::api::ChatResponse = response
        .json()
        .await
        .map_err(|e| BenchmarkError::Checkpoint(format!("http mode response decode failed: {e}")))?;

    let latency_ms = api_response.latency_ms;
    Ok((api_response.into_orchestration_result(item.category), latency_ms))
}

fn system_tier(system: &str) -> Option<Tier> {
    match system {
        "elite" => Some(Tier::Elite),
        "free" => Some(Tier::Free),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::gateway::{Gateway, MockClient};
    use crate::tools::web_search::StaticWebSearch;
    use crate::tools::ToolBroker;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn orchestrator_with_echo() -> Orchestrator {
        let mut gateway = Gateway::new();
        for provider in ["openai", "anthropic", "gemini", "deepseek", "grok", "together", "openrouter"] {
            gateway.register(Arc::new(MockClient::echo(provider)));
        }
        let catalog = Catalog::with_defaults();
        let tools = ToolBroker::new(Box::new(StaticWebSearch::empty()));
        Orchestrator::new(gateway, catalog, tools)
    }

    fn suite_with_one_item() -> Suite {
        let yaml = r#"
metadata:
  suite_name: smoke
  version: "1"
prompts:
  - id: d1
    category: dialogue
    prompt: "Hello there, how are you?"
    scoring:
      rule: exact_contains
      objective_weight: 1.0
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn local_run_produces_report_and_case_file() {
        let dir = tempdir().unwrap();
        let suite = suite_with_one_item();
        let orch = orchestrator_with_echo();
        let mut config = RunConfig::new(dir.path());
        config.seed = 1;
        let outcome = run(&suite, Some(&orch), &config).await.unwrap();
        assert_eq!(outcome.report.item_count, 1);
        assert!(dir.path().join("report.json").exists());
        assert!(dir.path().join("report.md").exists());
        assert!(dir.path().join("cases/d1_default_0.json").exists());
    }

    #[tokio::test]
    async fn local_mode_without_orchestrator_errors() {
        let dir = tempdir().unwrap();
        let suite = suite_with_one_item();
        let config = RunConfig::new(dir.path());
        let err = run(&suite, None, &config).await.unwrap_err();
        assert!(matches!(err, BenchmarkError::SuiteLoad(_)));
    }

    #[tokio::test]
    async fn second_run_in_same_outdir_diffs_against_first() {
        let dir = tempdir().unwrap();
        let suite = suite_with_one_item();
        let orch = orchestrator_with_echo();
        let mut config = RunConfig::new(dir.path());
        config.seed = 1;

        let first = run(&suite, Some(&orch), &config).await.unwrap();
        assert!(first.report.regression.is_none());

        config.systems = vec!["rerun".to_string()];
        let second = run(&suite, Some(&orch), &config).await.unwrap();
        assert!(second.report.regression.is_some());
        assert!(dir.path().join("outcomes.json").exists());
    }

    #[tokio::test]
    async fn critical_only_filters_non_critical_items() {
        let dir = tempdir().unwrap();
        let suite = suite_with_one_item();
        let orch = orchestrator_with_echo();
        let mut config = RunConfig::new(dir.path());
        config.critical_only = true;
        let outcome = run(&suite, Some(&orch), &config).await.unwrap();
        assert_eq!(outcome.report.item_count, 0);
    }
}
