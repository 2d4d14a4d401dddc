//! Synthesis endpoints: the full TTS pipeline, the rewrite-only variant,
//! artifact retrieval, and the language listing.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::Response;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{AppError, AppResult};
use crate::mistral::{self, ChatParams, TokenUsage};
use crate::state::AppState;
use crate::tts::types::{SUPPORTED_LANGUAGES, SynthesisOptions};
use crate::tts::{synthesize, SynthesisOutcome};
use crate::utils::common::{check_file_exists_and_valid, is_safe_filename};

fn default_model() -> String {
    mistral::DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    mistral::DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    mistral::DEFAULT_MAX_TOKENS
}

fn default_lang() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Rewrite the text through Mistral before returning it. The rewritten
    /// text is informational only; synthesis always speaks the original.
    #[serde(default)]
    pub use_mistral: bool,
    #[serde(default)]
    pub return_audio: bool,
    #[serde(default)]
    pub optimize_pitch: bool,
    #[serde(default)]
    pub pitch_factor: Option<f32>,
}

impl TtsRequest {
    fn chat_params(&self) -> ChatParams {
        ChatParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            lang: self.lang.clone(),
            optimize_pitch: self.optimize_pitch,
            pitch_factor: self.pitch_factor,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TtsResponse {
    pub success: bool,
    pub text: String,
    pub processed_text: String,
    pub lang: String,
    pub usage: Option<TokenUsage>,
    pub audio_file: Option<String>,
    pub audio_url: Option<String>,
    pub pitch_factor: Option<f32>,
}

fn validate_text(text: &str) -> AppResult<()> {
    if text.is_empty() {
        return Err(AppError::Validation("Text must not be empty".to_string()));
    }
    Ok(())
}

/// Optional rewrite pass. Returns the processed text and token usage; with
/// `use_mistral` off the original text passes through untouched.
async fn rewrite_text(
    state: &AppState,
    request: &TtsRequest,
) -> AppResult<(String, Option<TokenUsage>)> {
    if !request.use_mistral {
        return Ok((request.text.clone(), None));
    }

    let client = state.mistral_or_unavailable()?;
    let outcome = client.chat(&request.text, &request.chat_params()).await?;
    Ok((outcome.content, Some(outcome.usage)))
}

async fn run_synthesis(state: &AppState, request: &TtsRequest) -> AppResult<SynthesisOutcome> {
    let outcome = synthesize(
        &state.engine,
        state.mistral.as_ref(),
        &state.config.audio_dir,
        &request.text,
        &request.synthesis_options(),
    )
    .await?;
    Ok(outcome)
}

/// POST /api/v1/tts
pub async fn tts(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TtsRequest>,
) -> AppResult<Json<TtsResponse>> {
    validate_text(&request.text)?;

    let (processed_text, usage) = rewrite_text(&state, &request).await?;

    let (audio_file, audio_url, pitch_factor) = if request.return_audio {
        let outcome = run_synthesis(&state, &request).await?;
        info!("Generated artifact {} for /api/v1/tts", outcome.filename);
        (
            Some(outcome.filename.clone()),
            Some(format!("/api/v1/audio/{}", outcome.filename)),
            Some(outcome.pitch_factor),
        )
    } else {
        (None, None, None)
    };

    Ok(Json(TtsResponse {
        success: true,
        text: request.text,
        processed_text,
        lang: request.lang,
        usage,
        audio_file,
        audio_url,
        pitch_factor,
    }))
}

/// POST /api/v1/tts/audio - same pipeline, audio bytes in the body and the
/// metadata in X- headers.
pub async fn tts_audio(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TtsRequest>,
) -> AppResult<Response> {
    validate_text(&request.text)?;

    let (processed_text, _usage) = rewrite_text(&state, &request).await?;
    let outcome = run_synthesis(&state, &request).await?;

    let artifact_path = state.config.audio_dir.join(&outcome.filename);
    let bytes = tokio::fs::read(&artifact_path).await?;

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(media_type_for(&outcome.filename)),
    );
    headers.insert("X-Original-Text", header_value(&request.text));
    headers.insert("X-Processed-Text", header_value(&processed_text));
    headers.insert(
        "X-Pitch-Factor",
        header_value(&outcome.pitch_factor.to_string()),
    );
    headers.insert("X-Audio-Filename", header_value(&outcome.filename));

    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct RewriteRequest {
    pub text: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_lang")]
    pub lang: String,
}

/// POST /api/v1/tts/mistral - rewrite-only pass, no synthesis.
pub async fn tts_mistral(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RewriteRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let client = state.mistral_or_unavailable()?;
    validate_text(&request.text)?;

    let params = ChatParams {
        model: request.model.clone(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };
    let outcome = client.chat(&request.text, &params).await?;

    Ok(Json(json!({
        "success": true,
        "model": outcome.model,
        "original_text": request.text,
        "processed_text": outcome.content,
        "lang": request.lang,
        "usage": outcome.usage,
    })))
}

/// GET /api/v1/audio/{filename} - stream a previously generated artifact.
pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    if !is_safe_filename(&filename) {
        return Err(AppError::NotFound(filename));
    }

    let path = state.config.audio_dir.join(&filename);
    if !check_file_exists_and_valid(&path).await {
        return Err(AppError::NotFound(filename));
    }

    let bytes = tokio::fs::read(&path).await?;
    let mut response = Response::new(Body::from(bytes));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(media_type_for(&filename)),
    );
    Ok(response)
}

/// GET /api/v1/languages
pub async fn list_languages() -> Json<serde_json::Value> {
    let languages: Vec<serde_json::Value> = SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, name)| {
            json!({
                "code": code,
                "name": name,
                "engines": ["kokoro"],
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "count": languages.len(),
        "languages": languages,
    }))
}

fn media_type_for(filename: &str) -> &'static str {
    if filename.ends_with(".wav") {
        "audio/wav"
    } else {
        "audio/mpeg"
    }
}

// Header values only allow visible ASCII; anything else is replaced so a
// multi-byte utterance cannot break the response.
fn header_value(text: &str) -> HeaderValue {
    let safe: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '?'
            }
        })
        .collect();
    HeaderValue::from_str(&safe).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for("a.wav"), "audio/wav");
        assert_eq!(media_type_for("a.mp3"), "audio/mpeg");
        assert_eq!(media_type_for("noext"), "audio/mpeg");
    }

    #[test]
    fn test_header_value_sanitizes() {
        assert_eq!(header_value("Hello there"), "Hello there");
        assert_eq!(header_value("line\nbreak"), "line?break");
        assert_eq!(header_value("héllo"), "h?llo");
    }

    #[test]
    fn test_request_defaults() {
        let request: TtsRequest = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(request.model, mistral::DEFAULT_MODEL);
        assert_eq!(request.lang, "en");
        assert!(!request.use_mistral);
        assert!(!request.return_audio);
        assert!(!request.optimize_pitch);
        assert!(request.pitch_factor.is_none());
    }
}
