//! Axum handlers for the three endpoints spec.md §6 names. Grounded on
//! `ConaryLabs-Mira/mira-chat/src/server.rs`'s `State<Arc<...>>` +
//! `Json<...>` handler shape.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::info;

use crate::config;
use crate::domain::Query;

use super::types::{ApiError, ChatRequest, ChatResponse, DiagnosticsResponse, ProvidersResponse};
use super::AppState;

const API_KEY_HEADER: &str = "x-api-key";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `POST /v1/chat` (spec.md §6).
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ApiError>)> {
    if !config::settings().authorize_inbound(header_value(&headers, API_KEY_HEADER)) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError {
                error: "unauthorized".to_string(),
            }),
        ));
    }

    if request.prompt.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "prompt must not be empty".to_string(),
            }),
        ));
    }

    let query: Query = request.into();
    info!(prompt_len = query.prompt.len(), "chat request received");
    let result = state.orchestrator.run(&query).await;
    Ok(Json(ChatResponse::from(result)))
}

/// `GET /v1/status/diagnostics/config` (spec.md §6). Never returns a
/// secret value, only presence flags (spec.md §4.11, §8 property 7).
pub async fn diagnostics(State(_state): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    Json(DiagnosticsResponse::from(config::settings().diagnostics()))
}

/// `GET /v1/providers` (spec.md §6).
pub async fn providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    let settings = config::settings();
    let all_known: Vec<String> = config::PROVIDER_ENV_KEYS.iter().map(|(name, _)| name.to_string()).collect();
    let registered = state.orchestrator.gateway().registered_providers();

    let available_providers: Vec<String> = all_known
        .iter()
        .filter(|name| settings.provider_configured(name) && registered.contains(name))
        .cloned()
        .collect();
    let unavailable_providers: Vec<String> = all_known
        .into_iter()
        .filter(|name| !available_providers.contains(name))
        .collect();

    Json(ProvidersResponse {
        available_providers,
        unavailable_providers,
        fail_on_stub: settings.environment == "production",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::gateway::{Gateway, MockClient};
    use crate::orchestrator::Orchestrator;
    use crate::tools::web_search::StaticWebSearch;
    use crate::tools::ToolBroker;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state_with_echo() -> Arc<AppState> {
        let mut gateway = Gateway::new();
        gateway.register(Arc::new(MockClient::echo("openai")));
        let catalog = Catalog::with_defaults();
        let tools = ToolBroker::new(Box::new(StaticWebSearch::empty()));
        Arc::new(AppState {
            orchestrator: Arc::new(Orchestrator::new(gateway, catalog, tools)),
        })
    }

    #[tokio::test]
    async fn chat_rejects_empty_prompt() {
        let state = state_with_echo();
        let app = super::super::router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"prompt": "   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_returns_result_for_valid_prompt() {
        let state = state_with_echo();
        let app = super::super::router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"prompt": "Hi there, how are you today?", "category": "dialogue"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn diagnostics_endpoint_ok() {
        let state = state_with_echo();
        let app = super::super::router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/v1/status/diagnostics/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn providers_endpoint_ok() {
        let state = state_with_echo();
        let app = super::super::router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/v1/providers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
