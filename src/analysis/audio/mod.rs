//! Signal normalization: resample to the canonical rate, then force the
//! canonical duration.

mod decode;
mod resample;

pub use decode::{DecodeError, DecodedClip, decode_clip};
pub(crate) use resample::resample_sinc;

use crate::config::AnalysisConfig;

/// Normalize a clip to the canonical sample rate and duration.
///
/// Resampling happens first, then the result is right-zero-padded or
/// hard-truncated to exactly [`AnalysisConfig::fixed_length`] samples. No
/// loudness or DC normalization is applied. Never fails; empty input yields
/// an all-zero signal.
pub fn normalize(samples: &[f32], source_rate: u32, config: &AnalysisConfig) -> Vec<f32> {
    let mut out = if source_rate != config.sample_rate {
        resample_sinc(samples, source_rate, config.sample_rate)
    } else {
        samples.to_vec()
    };
    sanitize_in_place(&mut out);
    out.resize(config.fixed_length(), 0.0);
    out
}

pub(crate) fn sanitize_in_place(samples: &mut [f32]) {
    for sample in samples.iter_mut() {
        *sample = sanitize_sample(*sample);
    }
}

// Non-finite samples are zeroed; amplitude is passed through untouched so
// truncation returns the input's leading samples exactly.
pub(crate) fn sanitize_sample(sample: f32) -> f32 {
    if sample.is_finite() { sample } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AnalysisConfig {
        AnalysisConfig {
            sample_rate: 8_000,
            duration_seconds: 1.0,
            n_fft: 512,
            hop_length: 256,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn short_input_is_right_zero_padded() {
        let config = test_config();
        let half = config.fixed_length() / 2;
        let input = vec![0.5_f32; half];
        let out = normalize(&input, config.sample_rate, &config);
        assert_eq!(out.len(), config.fixed_length());
        assert!(out[..half].iter().all(|&v| v == 0.5));
        assert!(out[half..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn long_input_is_truncated_to_leading_samples() {
        let config = test_config();
        let input: Vec<f32> = (0..config.fixed_length() * 2)
            .map(|i| (i as f32 * 1e-4).sin())
            .collect();
        let out = normalize(&input, config.sample_rate, &config);
        assert_eq!(out.len(), config.fixed_length());
        assert_eq!(out, input[..config.fixed_length()]);
    }

    #[test]
    fn above_unit_amplitude_survives_truncation_exactly() {
        let config = test_config();
        // Float-PCM decodes can exceed [-1, 1]; truncation must still
        // return the leading samples bit-exactly.
        let input = vec![1.5_f32; config.fixed_length() * 2];
        let out = normalize(&input, config.sample_rate, &config);
        assert_eq!(out, input[..config.fixed_length()]);
    }

    #[test]
    fn empty_input_normalizes_to_silence() {
        let config = test_config();
        let out = normalize(&[], config.sample_rate, &config);
        assert_eq!(out.len(), config.fixed_length());
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn differing_source_rate_is_resampled() {
        let config = test_config();
        // One second at 16 kHz should still land at one canonical second.
        let input = vec![0.25_f32; 16_000];
        let out = normalize(&input, 16_000, &config);
        assert_eq!(out.len(), config.fixed_length());
        // The interior of a constant signal stays constant after resampling.
        assert!((out[config.fixed_length() / 2] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn non_finite_samples_are_zeroed() {
        let config = test_config();
        let input = vec![f32::NAN, f32::INFINITY, 0.5];
        let out = normalize(&input, config.sample_rate, &config);
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
