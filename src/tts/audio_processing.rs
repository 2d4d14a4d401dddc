//! Audio post-processing: pitch adjustment and loudness normalization.
//!
//! Pitch shifting uses the speed-then-resample trick: the buffer is
//! reinterpreted at `sample_rate * factor` (raising or lowering both pitch
//! and speed), then resampled back to the original rate with Rubato's sinc
//! resampler. Cheap, dependency-light, and good enough for speech; it is not
//! a phase vocoder.

use std::cmp;

use log::{info, warn};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::tts::audio_format::compute_rms;
use crate::tts::types::{Result, TtsError};

/// Shift the perceived pitch of a mono buffer by `factor` (1.0 = unchanged).
///
/// A factor of exactly 1.0 returns the input untouched.
pub fn pitch_shift(input: &[f32], sample_rate: u32, factor: f32) -> Result<Vec<f32>> {
    if factor == 1.0 {
        return Ok(input.to_vec());
    }

    if !factor.is_finite() || factor <= 0.0 {
        return Err(TtsError::AudioProcessing(format!(
            "Invalid pitch factor: {}",
            factor
        )));
    }

    // Reading the buffer as if recorded at rate * factor shifts the pitch;
    // resampling from that rate back to the original keeps the container
    // rate unchanged.
    let ratio = 1.0 / factor as f64;
    resample(input, ratio, sample_rate)
}

/// Resample a mono buffer by `ratio` (output length ~ input length * ratio),
/// processing in fixed-size blocks.
fn resample(input: &[f32], ratio: f64, sample_rate: u32) -> Result<Vec<f32>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    // Block size scales with input duration to keep short fragments cheap
    let duration_seconds = input.len() as f32 / sample_rate as f32;
    let block_size = if duration_seconds < 0.5 {
        128
    } else if duration_seconds < 2.0 {
        256
    } else {
        512
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, block_size, 1)
        .map_err(|e| TtsError::Resampling(format!("Failed to initialize resampler: {}", e)))?;

    let expected = (input.len() as f64 * ratio) as usize;
    let mut output = Vec::with_capacity(expected + block_size * 2);

    // The resampler consumes exactly block_size frames per call, so the
    // final partial block is zero-padded.
    let mut idx = 0;
    while idx < input.len() {
        let chunk_size = cmp::min(block_size, input.len() - idx);
        let block = if chunk_size < block_size {
            let mut padded = vec![0.0; block_size];
            padded[..chunk_size].copy_from_slice(&input[idx..idx + chunk_size]);
            padded
        } else {
            input[idx..idx + chunk_size].to_vec()
        };

        let frames = vec![block];
        let processed = resampler
            .process(&frames, None)
            .map_err(|e| TtsError::Resampling(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&processed[0]);

        idx += chunk_size;
    }

    Ok(output)
}

/// Scale samples so the peak amplitude hits `target_peak`.
///
/// Returns `None` for silent (or essentially silent) buffers, which cannot
/// be normalized meaningfully.
pub fn normalize_peak(samples: &[f32], target_peak: f32) -> Option<Vec<f32>> {
    if samples.is_empty() {
        return None;
    }

    let max_amplitude = samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()));

    if max_amplitude <= 0.00001 {
        warn!(
            "Audio is silent or near-silent (peak {:.6}), skipping normalization",
            max_amplitude
        );
        return None;
    }

    let norm_factor = target_peak / max_amplitude;
    let normalized = samples.iter().map(|s| s * norm_factor).collect();

    info!(
        "Peak normalization: peak={:.6}, target={:.6}, factor={:.6} (rms={:.6})",
        max_amplitude,
        target_peak,
        norm_factor,
        compute_rms(samples)
    );
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_wave(freq: f32, duration_sec: f32, sample_rate: u32) -> Vec<f32> {
        let num_samples = (duration_sec * sample_rate as f32) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_pitch_shift_identity() {
        let input = sine_wave(440.0, 0.25, 8000);
        let output = pitch_shift(&input, 8000, 1.0).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn test_pitch_shift_changes_length() {
        let sample_rate = 8000;
        let input = sine_wave(440.0, 1.0, sample_rate);

        // Raising pitch by 1.25 shortens the resampled buffer by ~1/1.25
        let output = pitch_shift(&input, sample_rate, 1.25).unwrap();
        let expected = input.len() as f64 / 1.25;
        let tolerance = expected * 0.1;
        assert!(
            (output.len() as f64 - expected).abs() < tolerance,
            "expected ~{} samples, got {}",
            expected,
            output.len()
        );
    }

    #[test]
    fn test_pitch_shift_rejects_invalid_factor() {
        let input = sine_wave(440.0, 0.1, 8000);
        assert!(pitch_shift(&input, 8000, 0.0).is_err());
        assert!(pitch_shift(&input, 8000, -1.0).is_err());
        assert!(pitch_shift(&input, 8000, f32::NAN).is_err());
    }

    #[test]
    fn test_pitch_shift_empty_input() {
        let output = pitch_shift(&[], 8000, 1.1).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_normalize_peak() {
        let samples = vec![-0.3, 0.1, 0.5, -0.4, 0.2];
        let normalized = normalize_peak(&samples, 0.9).unwrap();
        let peak = normalized.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert!((peak - 0.9).abs() < 0.0001);
        // relative amplitudes are preserved
        assert!((normalized[2] / normalized[1] - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_normalize_peak_silent() {
        assert!(normalize_peak(&[], 0.9).is_none());
        assert!(normalize_peak(&[0.0; 128], 0.9).is_none());
    }
}
