//! HTTP API.
//!
//! - GET /
//! - GET /health
//! - POST /chat

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONNECTION,
};
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::RelayError;
use crate::provider::{ChatProvider, CompletionRequest, Message};
use crate::server::streaming::completion_to_sse_stream;

pub const SERVICE_NAME: &str = "AI Q&A Chat API";

/// Application state shared across handlers.
pub struct AppState {
    pub settings: Arc<Settings>,
    pub provider: Arc<dyn ChatProvider>,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin, method and header, with credentials.
///
/// Wildcards cannot be combined with credentials, so the request's own
/// values are mirrored back instead.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Chat request: the conversation so far, oldest first.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{SERVICE_NAME} is running"),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, RelayError> {
    let request_id = Uuid::new_v4().to_string();

    let api_key = state.settings.api_key()?;

    info!(
        request_id = request_id,
        messages = req.messages.len(),
        "Received {} messages from client",
        req.messages.len()
    );

    let request = CompletionRequest::streaming(state.settings.model.clone(), req.messages);
    let rx = state.provider.stream_chat(api_key, request).await?;

    let headers = [
        (CACHE_CONTROL, "no-cache"),
        (CONNECTION, "keep-alive"),
        (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (ACCESS_CONTROL_ALLOW_HEADERS, "*"),
    ];

    Ok((headers, Sse::new(completion_to_sse_stream(rx))).into_response())
}
