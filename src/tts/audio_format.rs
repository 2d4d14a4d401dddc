//! WAV encoding and decoding.
//!
//! The synthesis engine always emits WAV, and processed artifacts are
//! exported as WAV, so `hound` covers both directions. Multi-channel input
//! is mixed down to mono before processing.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::info;
use std::path::Path;

use crate::tts::types::{Result, TtsError};

/// Duration in seconds for a mono sample buffer.
pub fn duration_in_seconds(sample_count: usize, sample_rate: u32) -> f32 {
    sample_count as f32 / sample_rate as f32
}

/// Decode a WAV file into mono f32 PCM samples in [-1.0, 1.0].
///
/// Supports 16/24/32-bit integer and 32-bit float formats.
pub fn decode_wav_file<P: AsRef<Path>>(file_path: P) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(file_path.as_ref()).map_err(TtsError::WavDecoding)?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;

    let pcm_data: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map_err(TtsError::WavDecoding))
            .collect::<Result<Vec<i16>>>()?
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map_err(TtsError::WavDecoding))
            .collect::<Result<Vec<i32>>>()?
            .into_iter()
            .map(|s| s as f32 / 8388608.0)
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map_err(TtsError::WavDecoding))
            .collect::<Result<Vec<i32>>>()?
            .into_iter()
            .map(|s| s as f32 / 2147483648.0)
            .collect(),
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map_err(TtsError::WavDecoding))
            .collect::<Result<Vec<f32>>>()?,
        _ => {
            return Err(TtsError::AudioProcessing(format!(
                "Unsupported WAV format: {:?}, {} bits",
                spec.sample_format, spec.bits_per_sample
            )));
        }
    };

    // Mix down to mono if needed
    let channels = spec.channels as usize;
    if channels > 1 {
        let mut mono_data = Vec::with_capacity(pcm_data.len() / channels);
        for chunk in pcm_data.chunks(channels) {
            let sample = chunk.iter().sum::<f32>() / channels as f32;
            mono_data.push(sample);
        }
        Ok((mono_data, sample_rate))
    } else {
        Ok((pcm_data, sample_rate))
    }
}

/// Encode mono f32 PCM samples into a WAV file.
pub fn encode_wav(pcm_data: &[f32], sample_rate: u32, output_path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(output_path, spec)?;

    for &sample in pcm_data {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;

    info!(
        "Saved WAV file: {} ({} samples, {} Hz)",
        output_path.display(),
        pcm_data.len(),
        sample_rate
    );
    Ok(())
}

/// Root-mean-square amplitude of a sample buffer.
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_duration_calculation() {
        assert_eq!(duration_in_seconds(44100, 44100), 1.0);
        assert_eq!(duration_in_seconds(22050, 44100), 0.5);
        assert_eq!(duration_in_seconds(0, 44100), 0.0);
    }

    #[test]
    fn test_compute_rms() {
        let samples = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        // sqrt((0 + 0.25 + 0.25 + 1 + 1) / 5) = sqrt(0.5)
        assert!((compute_rms(&samples) - 0.7071).abs() < 0.0001);
        assert_eq!(compute_rms(&[]), 0.0);
    }

    #[test]
    fn test_wav_encode_decode() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.wav");

        // 100ms of a 440 Hz sine
        let sample_rate = 44100;
        let num_samples = 4410;
        let mut samples = Vec::with_capacity(num_samples);
        for i in 0..num_samples {
            let t = i as f32 / sample_rate as f32;
            samples.push((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5);
        }

        encode_wav(&samples, sample_rate, &file_path).unwrap();

        let (decoded, decoded_rate) = decode_wav_file(&file_path).unwrap();
        assert_eq!(decoded_rate, sample_rate);
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 0.0001);
        }
    }

    #[test]
    fn test_decode_stereo_mixdown() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("stereo.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&file_path, spec).unwrap();
        // left at +0.5, right at -0.5 cancel to silence after mixdown
        for _ in 0..100 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(-16384i16).unwrap();
        }
        writer.finalize().unwrap();

        let (decoded, rate) = decode_wav_file(&file_path).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(decoded.len(), 100);
        assert!(decoded.iter().all(|s| s.abs() < 0.001));
    }
}
