//! # TTS module
//!
//! Speech generation and post-processing: the external synthesis engine,
//! pitch factor resolution, and the pitch-shift/normalization pipeline.

pub mod audio_format;
pub mod audio_processing;
pub mod engine;
pub mod pitch;
pub mod synthesizer;
pub mod types;

pub use engine::{ENGINE_BINARY, SynthesisEngine, map_language};
pub use pitch::{heuristic_pitch, resolve_pitch};
pub use synthesizer::synthesize;
pub use types::{SUPPORTED_LANGUAGES, SynthesisOptions, SynthesisOutcome, TtsError};
