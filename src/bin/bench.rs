//! `llmhive-bench`: the benchmark harness CLI (spec.md §6 `bench run`).
//!
//! Exit codes (spec.md §6): `0` success, `1` regression, `2` setup
//! error, `3` cancelled.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use llmhive_core::benchmark::{run, RunConfig, RunMode, Suite};
use llmhive_core::catalog::Catalog;
use llmhive_core::gateway;
use llmhive_core::orchestrator::Orchestrator;
use llmhive_core::tools::web_search::StaticWebSearch;
use llmhive_core::tools::ToolBroker;

#[derive(Parser, Debug)]
#[command(author, version, about = "LLMHive benchmark harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs a labelled suite against the engine (spec.md §6).
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[arg(long)]
    suite: PathBuf,
    #[arg(long, value_delimiter = ',', default_value = "default")]
    systems: Vec<String>,
    #[arg(long = "runs-per-case", default_value_t = 1)]
    runs_per_case: usize,
    #[arg(long, default_value = "local")]
    mode: String,
    /// Base URL for `--mode http` (not part of spec.md's literal grammar,
    /// but required to know where to POST — defaults to the local
    /// `llmhive-server` default bind address).
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,
    #[arg(long)]
    outdir: PathBuf,
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,
    #[arg(long = "max-tokens", default_value_t = 1024)]
    max_tokens: u32,
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    #[arg(long, value_delimiter = ',', default_value = "")]
    category: Vec<String>,
    #[arg(long, value_delimiter = ',', default_value = "")]
    prompts: Vec<String>,
    #[arg(long = "critical-only", default_value_t = false)]
    critical_only: bool,
    #[arg(long, default_value_t = false)]
    verbose: bool,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long = "max-failure-rate", default_value_t = 0.2)]
    max_failure_rate: f64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let Command::Run(args) = cli.command;

    match run_command(args).await {
        Ok(gate_passed) => {
            if gate_passed {
                ExitCode::from(0)
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "bench run setup failed");
            ExitCode::from(2)
        }
    }
}

async fn run_command(args: RunArgs) -> anyhow::Result<bool> {
    let suite = Suite::load(&args.suite)?;

    let mode = match args.mode.as_str() {
        "local" => RunMode::Local,
        "http" => RunMode::Http {
            base_url: args.base_url.clone(),
        },
        other => anyhow::bail!("unknown --mode '{other}', expected 'local' or 'http'"),
    };

    let orchestrator = match &mode {
        RunMode::Local => Some(Orchestrator::new(
            gateway::from_env(),
            Catalog::with_defaults(),
            ToolBroker::new(Box::new(StaticWebSearch::empty())),
        )),
        RunMode::Http { .. } => None,
    };

    let categories: Vec<String> = args.category.into_iter().filter(|c| !c.is_empty()).collect();
    let prompt_ids: Vec<String> = args.prompts.into_iter().filter(|c| !c.is_empty()).collect();

    let config = RunConfig {
        systems: args.systems,
        runs_per_case: args.runs_per_case,
        mode,
        outdir: args.outdir,
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        timeout: Duration::from_secs(args.timeout),
        categories,
        prompt_ids,
        critical_only: args.critical_only,
        verbose: args.verbose,
        seed: args.seed,
        max_failure_rate: args.max_failure_rate,
    };

    let outcome = run(&suite, orchestrator.as_ref(), &config).await?;
    tracing::info!(
        run_id = %outcome.run_id,
        items = outcome.report.item_count,
        gate_passed = outcome.gate_passed,
        "bench run complete"
    );
    Ok(outcome.gate_passed)
}
