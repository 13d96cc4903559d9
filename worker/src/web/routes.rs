//! Router shell and its handlers

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Json};
use axum::routing::{any, get};
use axum::Router;
use serde_json::json;
use tower::ServiceBuilder;

use shared::ProcessId;

use super::middleware::{original_url, request_context, track_requests};
use super::AppState;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/favicon.ico", get(favicon))
        .route("/c/*path", any(custom_response))
        .route("/custom-response", any(custom_response))
        .route("/custom-response/*path", any(custom_response))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_context))
                .layer(from_fn_with_state(state.clone(), track_requests))
                .into_inner(),
        )
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let lifetime = state.telemetry.lock().await.lifetime().request_count;
    Json(json!({
        "status": "ok",
        "worker": ProcessId::current().pid(),
        "requests": lifetime,
    }))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn favicon() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

async fn custom_response(method: Method, uri: Uri) -> impl IntoResponse {
    Json(json!({
        "method": method.as_str(),
        "url": original_url(&uri),
    }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("Route not found: {}", uri.path()) })),
    )
}
