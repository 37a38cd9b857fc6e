//! # Audio Intake Pipeline
//!
//! Turns an uploaded clip (any supported container/codec) into validated
//! 16 kHz mono PCM ready for feature extraction.
//!
//! ## Pipeline Stages:
//! 1. **Decode**: probe and decode the container with symphonia
//! 2. **Downmix**: average interleaved channels into mono
//! 3. **Resample**: convert to the configured target rate with rubato
//! 4. **Validate**: duration bounds and a degenerate-signal check
//!
//! Every stage is a pure in-memory transformation; there is no temp-file
//! round trip.

pub mod decoder;
pub mod resampler;

use crate::config::AudioConfig;
use std::fmt;

/// Errors produced by the audio intake pipeline.
///
/// Decode and validation failures are caused by the uploaded clip and map
/// to 400 at the HTTP boundary; resampler faults map to 500 (see
/// `error.rs`).
#[derive(Debug)]
pub enum AudioError {
    /// The clip could not be probed or decoded.
    Decode(String),
    /// The resampler failed mid-stream.
    Resample(String),
    /// Decoded clip is shorter than the configured minimum.
    TooShort { actual: f64, min: f64 },
    /// Decoded clip is longer than the configured maximum.
    TooLong { actual: f64, max: f64 },
    /// The clip contains no usable signal.
    Silent,
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Decode(msg) => write!(f, "failed to decode audio: {}", msg),
            AudioError::Resample(msg) => write!(f, "resampling failed: {}", msg),
            AudioError::TooShort { actual, min } => write!(
                f,
                "audio too short: {:.2}s (minimum: {:.2}s)",
                actual, min
            ),
            AudioError::TooLong { actual, max } => {
                write!(f, "audio too long: {:.2}s (maximum: {:.2}s)", actual, max)
            }
            AudioError::Silent => write!(f, "audio is silent or has no usable signal"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Peak amplitude below which a clip is treated as silence. 16-bit PCM
/// quantization noise sits around 3e-5, so this leaves a small margin.
const SILENCE_PEAK_THRESHOLD: f32 = 1e-4;

/// Decode, downmix, resample and validate an uploaded clip.
///
/// ## Parameters:
/// - **bytes**: raw upload body (WAV, MP3, MP4/AAC, FLAC, OGG)
/// - **config**: audio intake configuration (target rate, duration bounds)
///
/// ## Returns:
/// Mono f32 samples at `config.sample_rate`, or the first pipeline error.
pub fn prepare_clip(bytes: &[u8], config: &AudioConfig) -> Result<Vec<f32>, AudioError> {
    let decoded = decoder::decode_to_mono(bytes)?;

    let samples = if decoded.sample_rate == config.sample_rate {
        decoded.samples
    } else {
        resampler::resample(&decoded.samples, decoded.sample_rate, config.sample_rate)?
    };

    let duration = samples.len() as f64 / config.sample_rate as f64;
    if duration < config.min_duration_secs {
        return Err(AudioError::TooShort {
            actual: duration,
            min: config.min_duration_secs,
        });
    }
    if duration > config.max_duration_secs {
        return Err(AudioError::TooLong {
            actual: duration,
            max: config.max_duration_secs,
        });
    }

    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak < SILENCE_PEAK_THRESHOLD {
        return Err(AudioError::Silent);
    }

    Ok(samples)
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Build an in-memory PCM16 WAV file for decoder tests.
    pub fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let byte_rate = sample_rate * channels as u32 * 2;
        let block_align = channels * 2;

        let mut out = Vec::with_capacity(44 + samples.len() * 2);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    /// A sine tone as PCM16 samples.
    pub fn sine_i16(freq: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<i16> {
        let count = (sample_rate as f32 * seconds) as usize;
        (0..count)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                ((t * freq * 2.0 * std::f32::consts::PI).sin() * amplitude * 32767.0) as i16
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{sine_i16, wav_bytes};
    use super::*;

    fn test_config() -> AudioConfig {
        AudioConfig {
            sample_rate: 16_000,
            min_duration_secs: 0.1,
            max_duration_secs: 10.0,
        }
    }

    #[test]
    fn test_prepare_clip_wav_passthrough() {
        let samples = sine_i16(440.0, 16_000, 1.0, 0.5);
        let bytes = wav_bytes(&samples, 16_000, 1);

        let pcm = prepare_clip(&bytes, &test_config()).unwrap();
        assert_eq!(pcm.len(), 16_000);
        let peak = pcm.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!(peak > 0.4 && peak <= 0.51);
    }

    #[test]
    fn test_prepare_clip_resamples_to_target_rate() {
        let samples = sine_i16(440.0, 8_000, 1.0, 0.5);
        let bytes = wav_bytes(&samples, 8_000, 1);

        let pcm = prepare_clip(&bytes, &test_config()).unwrap();
        // 1 second of audio at the target rate, within resampler rounding
        let expected = 16_000f64;
        assert!((pcm.len() as f64 - expected).abs() < 256.0);
    }

    #[test]
    fn test_prepare_clip_rejects_garbage() {
        let err = prepare_clip(b"definitely not audio", &test_config()).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)));
    }

    #[test]
    fn test_prepare_clip_rejects_short_clip() {
        let samples = sine_i16(440.0, 16_000, 0.05, 0.5);
        let bytes = wav_bytes(&samples, 16_000, 1);
        let err = prepare_clip(&bytes, &test_config()).unwrap_err();
        assert!(matches!(err, AudioError::TooShort { .. }));
    }

    #[test]
    fn test_prepare_clip_rejects_silence() {
        let samples = vec![0i16; 16_000];
        let bytes = wav_bytes(&samples, 16_000, 1);
        let err = prepare_clip(&bytes, &test_config()).unwrap_err();
        assert!(matches!(err, AudioError::Silent));
    }

    #[test]
    fn test_prepare_clip_rejects_long_clip() {
        let mut config = test_config();
        config.max_duration_secs = 0.5;
        let samples = sine_i16(440.0, 16_000, 1.0, 0.5);
        let bytes = wav_bytes(&samples, 16_000, 1);
        let err = prepare_clip(&bytes, &config).unwrap_err();
        assert!(matches!(err, AudioError::TooLong { .. }));
    }
}
