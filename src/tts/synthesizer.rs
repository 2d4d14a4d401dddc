//! Synthesis orchestration.
//!
//! One linear pipeline per request: invoke the engine, resolve the pitch
//! factor, decode, pitch-shift and normalize, persist. Post-processing
//! failures degrade to the closest usable buffer instead of aborting; only
//! the synthesis step itself is fatal. The intermediate raw file is removed
//! on every path.

use std::path::Path;

use log::{info, warn};
use uuid::Uuid;

use crate::mistral::MistralClient;
use crate::tts::audio_format::{decode_wav_file, duration_in_seconds, encode_wav};
use crate::tts::audio_processing::{normalize_peak, pitch_shift};
use crate::tts::engine::SynthesisEngine;
use crate::tts::pitch::resolve_pitch;
use crate::tts::types::{Result, SynthesisOptions, SynthesisOutcome};

const NORMALIZATION_TARGET_PEAK: f32 = 0.95;

/// Run the full synthesis pipeline for one request and persist the artifact
/// into `audio_dir`.
pub async fn synthesize(
    engine: &SynthesisEngine,
    mistral: Option<&MistralClient>,
    audio_dir: &Path,
    text: &str,
    options: &SynthesisOptions,
) -> Result<SynthesisOutcome> {
    let raw_path =
        std::env::temp_dir().join(format!("voxnova-raw-{}.wav", Uuid::new_v4().simple()));

    let outcome = run_pipeline(engine, mistral, audio_dir, text, options, &raw_path).await;

    // The raw engine output is an intermediate, remove it no matter how the
    // pipeline ended.
    let _ = tokio::fs::remove_file(&raw_path).await;

    outcome
}

async fn run_pipeline(
    engine: &SynthesisEngine,
    mistral: Option<&MistralClient>,
    audio_dir: &Path,
    text: &str,
    options: &SynthesisOptions,
    raw_path: &Path,
) -> Result<SynthesisOutcome> {
    engine.synthesize_raw(text, &options.lang, raw_path).await?;

    let pitch_factor =
        resolve_pitch(mistral, text, options.pitch_factor, options.optimize_pitch).await;

    let filename = format!("{}.wav", Uuid::new_v4().simple());
    let artifact_path = audio_dir.join(&filename);

    match decode_wav_file(raw_path) {
        Ok((samples, sample_rate)) => {
            let processed = post_process(samples, sample_rate, pitch_factor);
            encode_wav(&processed, sample_rate, &artifact_path)?;
            info!(
                "Synthesized {:.2}s of audio into {} (pitch factor {})",
                duration_in_seconds(processed.len(), sample_rate),
                filename,
                pitch_factor
            );
        }
        Err(e) => {
            // Decoding should not fail on engine output, but when it does the
            // raw WAV is still a valid artifact.
            warn!("Failed to decode engine output, copying raw audio: {}", e);
            tokio::fs::copy(raw_path, &artifact_path).await?;
            info!("Persisted raw engine output as {}", filename);
        }
    }

    Ok(SynthesisOutcome {
        filename,
        pitch_factor,
    })
}

/// Apply pitch shift and loudness normalization, falling back to the last
/// good buffer on failure.
fn post_process(samples: Vec<f32>, sample_rate: u32, pitch_factor: f32) -> Vec<f32> {
    let shifted = match pitch_shift(&samples, sample_rate, pitch_factor) {
        Ok(shifted) => shifted,
        Err(e) => {
            warn!("Pitch adjustment failed, keeping unmodified audio: {}", e);
            samples
        }
    };

    match normalize_peak(&shifted, NORMALIZATION_TARGET_PEAK) {
        Some(normalized) => normalized,
        None => shifted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::engine::SynthesisEngine;

    fn glob_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_engine_failure_leaves_no_artifact() {
        let engine = SynthesisEngine::with_binary("voxnova-no-such-engine");
        let audio_dir = tempfile::tempdir().unwrap();

        let result = synthesize(
            &engine,
            None,
            audio_dir.path(),
            "Hello there",
            &SynthesisOptions::default(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(glob_count(audio_dir.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_raw_output_removed_after_failure() {
        // A clean exit without output produces an EmptyOutput error; the
        // temp raw path must be gone afterwards either way.
        let engine = SynthesisEngine::with_binary("true");
        let audio_dir = tempfile::tempdir().unwrap();

        let before: Vec<_> = leftover_raw_files();
        let result = synthesize(
            &engine,
            None,
            audio_dir.path(),
            "Hello there",
            &SynthesisOptions::default(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(leftover_raw_files().len(), before.len());
    }

    fn leftover_raw_files() -> Vec<std::path::PathBuf> {
        std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("voxnova-raw-"))
            })
            .collect()
    }
}
