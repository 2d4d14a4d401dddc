//! Thin client for the Mistral chat-completion API.
//!
//! One client is constructed at startup and shared by every handler; the
//! service degrades gracefully when no API key is configured.

use anyhow::{Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "mistral-small-latest";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

const DEFAULT_API_BASE: &str = "https://api.mistral.ai";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// Chat message structure for the Mistral API
#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Token accounting reported by the API, passed through to clients verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
}

/// Sampling parameters forwarded with a chat call.
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Result of one chat-completion call.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub model: String,
    pub content: String,
    pub usage: TokenUsage,
}

pub struct MistralClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl MistralClient {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or(DEFAULT_API_BASE).trim_end_matches('/').to_string(),
        })
    }

    /// Send a single user message and return the completion.
    pub async fn chat(&self, message: &str, params: &ChatParams) -> Result<ChatOutcome> {
        let request = ChatCompletionRequest {
            model: params.model.clone(),
            messages: vec![Message {
                role: "user",
                content: message.to_string(),
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        debug!("Sending chat request to Mistral API (model: {})", params.model);
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Mistral API returned HTTP {}: {}", status, body));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Mistral API returned no choices"))?;

        Ok(ChatOutcome {
            model: completion.model,
            content: choice.message.content,
            usage: completion.usage,
        })
    }

    /// List the models available to the configured credential.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .http
            .get(format!("{}/v1/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Mistral API returned HTTP {}: {}", status, body));
        }

        let listing: ModelListResponse = response.json().await?;
        Ok(listing.data)
    }
}
