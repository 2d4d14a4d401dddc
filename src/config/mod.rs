//! Runtime configuration loaded once at startup from the environment
//! (and an optional `.env` file).

use std::env;
use std::path::PathBuf;

const DEFAULT_AUDIO_DIR: &str = "audio_files";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Mistral API credential. When absent the chat endpoints return 503 and
    /// pitch estimation falls back to the heuristic.
    pub mistral_api_key: Option<String>,
    pub mistral_api_base: Option<String>,
    /// Flat directory where generated artifacts accumulate.
    pub audio_dir: PathBuf,
    pub kokoro_model_path: Option<PathBuf>,
    pub kokoro_voices_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            mistral_api_key: env::var("MISTRAL_API_KEY").ok().filter(|k| !k.is_empty()),
            mistral_api_base: env::var("MISTRAL_API_BASE").ok().filter(|u| !u.is_empty()),
            audio_dir: env::var("AUDIO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_AUDIO_DIR)),
            kokoro_model_path: env::var("KOKORO_MODEL_PATH").ok().map(PathBuf::from),
            kokoro_voices_path: env::var("KOKORO_VOICES_PATH").ok().map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mistral_api_key: None,
            mistral_api_base: None,
            audio_dir: PathBuf::from(DEFAULT_AUDIO_DIR),
            kokoro_model_path: None,
            kokoro_voices_path: None,
        }
    }
}
