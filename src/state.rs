//! Server state shared across handlers.

use crate::config::Config;
use crate::mistral::MistralClient;
use crate::tts::SynthesisEngine;

pub struct AppState {
    pub config: Config,
    /// Constructed once at startup; `None` when no API key is configured or
    /// client construction failed, in which case the endpoints that strictly
    /// need it answer 503 and pitch estimation degrades to the heuristic.
    pub mistral: Option<MistralClient>,
    pub engine: SynthesisEngine,
}

impl AppState {
    pub fn mistral_or_unavailable(&self) -> Result<&MistralClient, crate::AppError> {
        self.mistral.as_ref().ok_or_else(|| {
            crate::AppError::ServiceUnavailable("Mistral client is not initialized".to_string())
        })
    }
}
