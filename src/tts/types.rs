//! Shared types and error definitions for the synthesis pipeline.

use std::path::PathBuf;
use std::time::Duration;

/// Error type for the synthesis pipeline
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("Synthesis engine `{0}` not found in PATH")]
    EngineNotFound(String),

    #[error("Synthesis engine exited with status {status}: {stderr}")]
    EngineFailed { status: i32, stderr: String },

    #[error("Synthesis engine timed out after {}s", .0.as_secs())]
    EngineTimeout(Duration),

    #[error("Synthesis engine produced no output at {0}")]
    EmptyOutput(PathBuf),

    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    #[error("Resampling error: {0}")]
    Resampling(String),

    #[error("WAV encoding error: {0}")]
    WavEncoding(#[from] hound::Error),

    #[error("WAV decoding error: {0}")]
    WavDecoding(hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the synthesis pipeline
pub type Result<T> = std::result::Result<T, TtsError>;

/// Per-request synthesis options, already validated by the endpoint layer.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub lang: String,
    /// Ask the language model for a pitch suggestion instead of keeping the
    /// neutral factor.
    pub optimize_pitch: bool,
    /// Caller-supplied factor; wins over both heuristic and model estimation.
    pub pitch_factor: Option<f32>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            optimize_pitch: false,
            pitch_factor: None,
        }
    }
}

/// A persisted artifact plus the pitch factor that produced it.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub filename: String,
    pub pitch_factor: f32,
}

/// Languages the service accepts, with the engines able to speak them.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("en-gb", "English (British)"),
    ("ja", "Japanese"),
    ("zh", "Chinese (Mandarin)"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("hi", "Hindi"),
    ("it", "Italian"),
    ("pt", "Portuguese (Brazilian)"),
];
