//! Sample rate conversion via rubato's FFT fixed-input resampler.
//!
//! Clips arrive whole, so conversion runs block-by-block over the decoded
//! buffer with the final partial block zero-padded. The filter's output
//! delay is flushed and skipped, and the result is trimmed to the
//! rate-converted length, so neither the warm-up nor the padding leaks
//! into the feature window.

use rubato::{FftFixedIn, Resampler};

use super::AudioError;

/// Frames fed to the resampler per processing block.
const CHUNK_FRAMES: usize = 1024;

/// Resample a mono clip from `src_rate` to `dst_rate`.
///
/// Returns the input untouched when the rates already match.
pub fn resample(input: &[f32], src_rate: u32, dst_rate: u32) -> Result<Vec<f32>, AudioError> {
    if src_rate == dst_rate {
        return Ok(input.to_vec());
    }
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        src_rate as usize,
        dst_rate as usize,
        CHUNK_FRAMES,
        2, // sub-chunks per block
        1, // mono
    )
    .map_err(|e| AudioError::Resample(e.to_string()))?;

    let expected_len = (input.len() as u64 * dst_rate as u64 / src_rate as u64) as usize;
    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(delay + expected_len + CHUNK_FRAMES);
    let mut block = vec![0.0f32; CHUNK_FRAMES];

    let mut pos = 0;
    while pos < input.len() {
        let take = CHUNK_FRAMES.min(input.len() - pos);
        block[..take].copy_from_slice(&input[pos..pos + take]);
        block[take..].fill(0.0);

        let frames = resampler
            .process(&[&block], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
        pos += take;
    }

    // The FFT filter introduces output_delay() samples of latency. Flush
    // zero blocks until the delayed tail of the signal has come through,
    // then drop the warm-up head so the output lines up with the input.
    while output.len() < delay + expected_len {
        block.fill(0.0);
        let frames = resampler
            .process(&[&block], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay);
    output.truncate(expected_len);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, seconds: f32) -> Vec<f32> {
        let count = (rate as f32 * seconds) as usize;
        (0..count)
            .map(|i| (i as f32 / rate as f32 * freq * 2.0 * std::f32::consts::PI).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_same_rate_passthrough() {
        let input = sine(440.0, 16_000, 0.25);
        let output = resample(&input, 16_000, 16_000).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_upsample_doubles_length() {
        let input = sine(440.0, 8_000, 1.0);
        let output = resample(&input, 8_000, 16_000).unwrap();
        assert_eq!(output.len(), input.len() * 2);
    }

    #[test]
    fn test_downsample_halves_length() {
        let input = sine(440.0, 32_000, 1.0);
        let output = resample(&input, 32_000, 16_000).unwrap();
        assert_eq!(output.len(), input.len() / 2);
    }

    #[test]
    fn test_downsample_preserves_level() {
        let input = sine(440.0, 48_000, 1.0);
        let output = resample(&input, 48_000, 16_000).unwrap();
        // Steady tone should survive conversion at roughly the same peak;
        // skip the filter warm-up at the head of the output
        let peak = output[1000..]
            .iter()
            .map(|s| s.abs())
            .fold(0.0f32, f32::max);
        assert!(peak > 0.4 && peak < 0.6, "peak {}", peak);
    }

    #[test]
    fn test_filter_delay_is_compensated() {
        // Half a second of silence, then a tone. After conversion the tone
        // onset must still land at the half-second mark instead of being
        // pushed later by the filter's warm-up.
        let mut input = vec![0.0f32; 24_000];
        input.extend(sine(440.0, 48_000, 0.5));
        let output = resample(&input, 48_000, 16_000).unwrap();
        assert_eq!(output.len(), 16_000);

        let onset = output
            .iter()
            .position(|s| s.abs() > 0.25)
            .expect("tone missing from resampled output");
        assert!(
            (7_950..8_100).contains(&onset),
            "tone onset shifted to sample {}",
            onset
        );
    }

    #[test]
    fn test_empty_input() {
        let output = resample(&[], 8_000, 16_000).unwrap();
        assert!(output.is_empty());
    }
}
