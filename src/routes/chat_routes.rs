//! Pass-through endpoints for the Mistral chat API.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{AppError, AppResult};
use crate::mistral::{self, ChatParams, TokenUsage};
use crate::state::AppState;

fn default_model() -> String {
    mistral::DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    mistral::DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    mistral::DEFAULT_MAX_TOKENS
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub model: String,
    pub message: String,
    pub response: String,
    pub usage: TokenUsage,
}

/// POST /api/v1/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let client = state.mistral_or_unavailable()?;

    if request.message.is_empty() {
        return Err(AppError::Validation("Message must not be empty".to_string()));
    }

    let params = ChatParams {
        model: request.model.clone(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };
    let outcome = client.chat(&request.message, &params).await?;

    Ok(Json(ChatResponse {
        success: true,
        model: outcome.model,
        message: request.message,
        response: outcome.content,
        usage: outcome.usage,
    }))
}

/// GET /api/v1/models
pub async fn list_models(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<serde_json::Value>> {
    let client = state.mistral_or_unavailable()?;

    let models = client.list_models().await?;

    Ok(Json(json!({
        "success": true,
        "count": models.len(),
        "models": models,
    })))
}
