//! `llmhive-server`: the HTTP surface binary (spec.md §6).
//!
//! Wires a [`Gateway`] with one client per configured provider secret, a
//! default [`Catalog`], and a [`ToolBroker`] into an [`Orchestrator`],
//! then serves it behind axum. Grounded on `coordination/src/main.rs`'s
//! `clap::Parser` CLI shape and `ConaryLabs-Mira/mira-chat/src/server.rs`'s
//! `axum::serve` bring-up.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use llmhive_core::api::{router, AppState};
use llmhive_core::catalog::Catalog;
use llmhive_core::config;
use llmhive_core::gateway;
use llmhive_core::orchestrator::Orchestrator;
use llmhive_core::tools::web_search::StaticWebSearch;
use llmhive_core::tools::ToolBroker;

#[derive(Parser, Debug)]
#[command(author, version, about = "LLMHive orchestration HTTP server", long_about = None)]
struct Args {
    /// Bind address.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Bind port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = config::settings();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let gateway = gateway::from_env();
    for warning in settings.diagnostics().warnings {
        tracing::warn!(warning, "startup diagnostic");
    }

    let catalog = Catalog::with_defaults();
    let tools = ToolBroker::new(Box::new(StaticWebSearch::empty()));
    let orchestrator = Arc::new(Orchestrator::new(gateway, catalog, tools));
    let state = Arc::new(AppState { orchestrator });

    let app = router(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr, "llmhive-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
