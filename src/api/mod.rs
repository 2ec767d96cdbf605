//! External HTTP surface (spec.md §6): `/v1/chat`, the diagnostics
//! endpoint, and provider discovery. Everything upstream of this module
//! (auth, billing, the chat frontend) is an external collaborator —
//! this surface only exposes the orchestration engine itself.
//!
//! Router composition mirrors `ConaryLabs-Mira/mira-chat/src/server.rs`:
//! a plain `Router<Arc<AppState>>` with a CORS layer, no middleware
//! stack beyond what each handler does inline.

mod handlers;
mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::orchestrator::Orchestrator;

pub use types::{ApiError, ChatRequest, ChatResponse, DiagnosticsResponse, ProvidersResponse};

/// Shared state every handler reads from. One per process; the
/// orchestrator itself holds no per-request state (spec.md §5).
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Builds the full router (spec.md §6's three endpoints), with CORS
/// origins drawn from `config::settings().cors_origins` (spec.md §6
/// `CORS_ORIGINS`). An empty configured list permits any origin, which
/// is the right default for a service with no browser session/cookie
/// auth to protect (the only credential is the `X-API-Key` header).
pub fn router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .route("/v1/chat", post(handlers::chat))
        .route("/v1/status/diagnostics/config", get(handlers::diagnostics))
        .route("/v1/providers", get(handlers::providers))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer() -> CorsLayer {
    let origins = crate::config::settings().cors_origins;
    if origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
