//! HTTP endpoint layer: thin request/response mapping into the synthesis
//! pipeline and the Mistral pass-through calls.

pub mod chat_routes;
pub mod tts_routes;

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/tts", post(tts_routes::tts))
        .route("/api/v1/tts/audio", post(tts_routes::tts_audio))
        .route("/api/v1/tts/mistral", post(tts_routes::tts_mistral))
        .route("/api/v1/audio/{filename}", get(tts_routes::get_audio))
        .route("/api/v1/languages", get(tts_routes::list_languages))
        .route("/api/v1/chat", post(chat_routes::chat))
        .route("/api/v1/models", get(chat_routes::list_models))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Root endpoint - API information
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "voxnova",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "tts": "/api/v1/tts",
            "tts_audio": "/api/v1/tts/audio",
            "tts_mistral": "/api/v1/tts/mistral",
            "audio": "/api/v1/audio/{filename}",
            "languages": "/api/v1/languages",
            "chat": "/api/v1/chat",
            "models": "/api/v1/models",
        }
    }))
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Response {
    if state.mistral.is_none() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": "Mistral client is not initialized",
            })),
        )
            .into_response();
    }

    Json(json!({
        "status": "healthy",
        "api_key_configured": true,
        "engine_available": state.engine.is_available(),
    }))
    .into_response()
}
