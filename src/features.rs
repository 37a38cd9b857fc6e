//! # MFCC Feature Extraction
//!
//! Derives the fixed-length numeric vector both classifiers consume:
//! 24 MFCC coefficients over the first 16 frames of the clip, flattened
//! coefficient-major into 384 values.
//!
//! ## Processing Chain (per frame):
//! 1. Hann-windowed 2048-point FFT, hop 512 (rustfft)
//! 2. Power spectrum over the non-redundant bins
//! 3. 40-filter triangular mel filterbank (HTK mel scale)
//! 4. Log power in dB with a -100 dB floor
//! 5. Orthonormal DCT-II over the mel axis, keeping 24 coefficients
//!
//! Clips shorter than 16 frames leave the trailing coefficient columns at
//! zero; longer clips are truncated to the first 16 frames. These
//! parameters are fixed at compile time because the classifier artifacts
//! are trained against exactly this vector shape.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Sample rate the extractor expects (clips are resampled beforehand).
pub const SAMPLE_RATE: u32 = 16_000;
/// FFT window size.
pub const N_FFT: usize = 2048;
/// Hop between successive frames.
pub const HOP_LENGTH: usize = 512;
/// Number of mel filters.
pub const N_MELS: usize = 40;
/// MFCC coefficients kept per frame.
pub const N_MFCC: usize = 24;
/// Frames kept per clip.
pub const N_FRAMES: usize = 16;
/// Final feature vector length (24 x 16).
pub const FEATURE_LEN: usize = N_MFCC * N_FRAMES;

/// Floor applied to log mel power, in dB.
const DB_FLOOR: f32 = -100.0;

/// Precomputed MFCC extraction pipeline.
///
/// ## Thread Safety:
/// All state (FFT plan, window, filterbank, DCT basis) is computed once in
/// `new()` and read-only afterwards, so a single extractor is shared
/// across request handlers behind an `Arc`.
pub struct MfccExtractor {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// `N_MELS` rows of `N_FFT / 2 + 1` filter weights.
    filterbank: Vec<Vec<f32>>,
    /// `N_MFCC` rows of `N_MELS` orthonormal DCT-II basis values.
    dct_basis: Vec<Vec<f32>>,
}

impl Default for MfccExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MfccExtractor {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(N_FFT);

        Self {
            fft,
            window: hann_window(N_FFT),
            filterbank: mel_filterbank(N_MELS, N_FFT, SAMPLE_RATE),
            dct_basis: dct_ii_basis(N_MFCC, N_MELS),
        }
    }

    /// Extract the 384-element feature vector from a mono 16 kHz clip.
    ///
    /// The output is flattened coefficient-major: element `c * 16 + t` is
    /// coefficient `c` of frame `t`, matching a row-major flatten of a
    /// `[n_mfcc, n_frames]` matrix.
    pub fn extract(&self, samples: &[f32]) -> Vec<f32> {
        let mut features = vec![0.0f32; FEATURE_LEN];
        if samples.is_empty() {
            return features;
        }

        // Frames that actually overlap the signal; columns past the end of
        // a short clip stay zero, mirroring zero-padding of the MFCC matrix.
        // div_ceil keeps a clip that ends exactly on a hop boundary from
        // counting a frame that starts past the last sample.
        let available_frames = samples.len().div_ceil(HOP_LENGTH).min(N_FRAMES);

        let mut frame_buf = vec![Complex::new(0.0f32, 0.0f32); N_FFT];
        for t in 0..available_frames {
            let start = t * HOP_LENGTH;
            let end = (start + N_FFT).min(samples.len());

            for (i, slot) in frame_buf.iter_mut().enumerate() {
                let sample = if start + i < end { samples[start + i] } else { 0.0 };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process(&mut frame_buf);

            let coeffs = self.frame_mfcc(&frame_buf);
            for (c, value) in coeffs.iter().enumerate() {
                features[c * N_FRAMES + t] = *value;
            }
        }

        features
    }

    /// Mel filterbank, log compression and DCT for one FFT frame.
    fn frame_mfcc(&self, spectrum: &[Complex<f32>]) -> Vec<f32> {
        let n_bins = N_FFT / 2 + 1;

        let mut log_mel = [0.0f32; N_MELS];
        for (m, filter) in self.filterbank.iter().enumerate() {
            let mut energy = 0.0f32;
            for k in 0..n_bins {
                let power = spectrum[k].norm_sqr();
                energy += filter[k] * power;
            }
            log_mel[m] = (10.0 * energy.max(1e-10).log10()).max(DB_FLOOR);
        }

        self.dct_basis
            .iter()
            .map(|row| row.iter().zip(log_mel.iter()).map(|(b, x)| b * x).sum())
            .collect()
    }
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / len as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over 0 Hz..Nyquist.
fn mel_filterbank(n_mels: usize, n_fft: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f32 / 2.0;

    let mel_max = hz_to_mel(nyquist);
    let band_edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    let mut filters = Vec::with_capacity(n_mels);
    for m in 1..=n_mels {
        let (lower, center, upper) = (band_edges[m - 1], band_edges[m], band_edges[m + 1]);

        let mut filter = vec![0.0f32; n_bins];
        for (k, weight) in filter.iter_mut().enumerate() {
            let freq = k as f32 * sample_rate as f32 / n_fft as f32;
            if freq > lower && freq < center {
                *weight = (freq - lower) / (center - lower);
            } else if freq >= center && freq < upper {
                *weight = (upper - freq) / (upper - center);
            }
        }
        filters.push(filter);
    }

    filters
}

/// Orthonormal DCT-II basis: `n_coeffs` rows over `n_input` points.
fn dct_ii_basis(n_coeffs: usize, n_input: usize) -> Vec<Vec<f32>> {
    let n = n_input as f32;
    (0..n_coeffs)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_input)
                .map(|i| {
                    scale
                        * (std::f32::consts::PI / n * (i as f32 + 0.5) * k as f32).cos()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, seconds: f32) -> Vec<f32> {
        let count = (SAMPLE_RATE as f32 * seconds) as usize;
        (0..count)
            .map(|i| (i as f32 / SAMPLE_RATE as f32 * freq * 2.0 * std::f32::consts::PI).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_feature_vector_shape() {
        let extractor = MfccExtractor::new();
        let features = extractor.extract(&sine(440.0, 1.0));
        assert_eq!(features.len(), FEATURE_LEN);
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = MfccExtractor::new();
        let clip = sine(220.0, 0.8);
        assert_eq!(extractor.extract(&clip), extractor.extract(&clip));
    }

    #[test]
    fn test_different_tones_differ() {
        let extractor = MfccExtractor::new();
        let low = extractor.extract(&sine(200.0, 1.0));
        let high = extractor.extract(&sine(3000.0, 1.0));
        let distance: f32 = low
            .iter()
            .zip(high.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        assert!(distance > 1.0, "tone features should separate, got {}", distance);
    }

    #[test]
    fn test_short_clip_pads_trailing_frames() {
        let extractor = MfccExtractor::new();
        // ~3 frames of signal; frames 4..16 must stay zero for every coefficient
        let features = extractor.extract(&sine(440.0, 0.1));
        for c in 0..N_MFCC {
            for t in 8..N_FRAMES {
                assert_eq!(features[c * N_FRAMES + t], 0.0, "coeff {} frame {}", c, t);
            }
        }
        // But the leading frames carry signal
        assert!(features[0] != 0.0);
    }

    #[test]
    fn test_exact_hop_multiple_has_no_phantom_frame() {
        let extractor = MfccExtractor::new();
        // Exactly 8 hops of signal: the frame that would start at
        // samples.len() overlaps nothing and must stay zero padding, not
        // become an all-silence column of floor-valued coefficients
        let clip: Vec<f32> = (0..8 * HOP_LENGTH)
            .map(|i| {
                (i as f32 / SAMPLE_RATE as f32 * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5
            })
            .collect();
        let features = extractor.extract(&clip);
        for c in 0..N_MFCC {
            for t in 8..N_FRAMES {
                assert_eq!(features[c * N_FRAMES + t], 0.0, "coeff {} frame {}", c, t);
            }
        }
        // Frame 7 still overlaps the tail of the clip
        assert!(features[7] != 0.0);
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let extractor = MfccExtractor::new();
        let features = extractor.extract(&[]);
        assert!(features.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_filterbank_covers_spectrum() {
        let filters = mel_filterbank(N_MELS, N_FFT, SAMPLE_RATE);
        assert_eq!(filters.len(), N_MELS);
        // Every filter has some mass and they tile without a gap
        for filter in &filters {
            assert!(filter.iter().sum::<f32>() > 0.0);
        }
    }

    #[test]
    fn test_dct_basis_orthonormal() {
        let basis = dct_ii_basis(N_MFCC, N_MELS);
        for (i, row_a) in basis.iter().enumerate() {
            for (j, row_b) in basis.iter().enumerate() {
                let dot: f32 = row_a.iter().zip(row_b.iter()).map(|(a, b)| a * b).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-4, "rows {} {} dot {}", i, j, dot);
            }
        }
    }
}
