//! Feature extraction pipeline: raw audio to fixed-length feature vector.
//!
//! The pipeline normalizes the signal to a canonical rate and duration,
//! computes one shared power spectrogram, runs the four analyzer families
//! over it and flattens their summary statistics into the assembled vector.

/// Signal normalization and compressed-container decoding.
pub mod audio;
/// Strongly-typed per-family analyzer outputs.
pub mod features;
/// Mean/std aggregation helpers.
pub mod stats;
/// Feature vector assembly and the storage blob codec.
pub mod vector;

mod fft;
mod mel;
mod rhythm;
mod spectral;
mod spectrogram;
mod timbral;
mod tonal;

use crate::config::{AnalysisConfig, ConfigError};
use features::ClipFeatures;
use fft::FftPlan;
use mel::MelBank;

/// Deterministic feature extractor for a fixed configuration.
///
/// Construct once and reuse; the FFT plan and mel filter bank are
/// precomputed from the configuration.
pub struct FeatureExtractor {
    config: AnalysisConfig,
    plan: FftPlan,
    mel: MelBank,
}

impl FeatureExtractor {
    /// Build an extractor, validating the configuration.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let plan = FftPlan::new(config.n_fft).map_err(ConfigError::Invalid)?;
        let mel = MelBank::new(config.sample_rate, config.n_fft, config.n_mels, config.n_mfcc);
        Ok(Self { config, plan, mel })
    }

    /// The configuration this extractor was built with.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the four analyzer families over a clip.
    ///
    /// The families are mutually independent and run on rayon workers;
    /// results are identical to a sequential evaluation.
    pub fn analyze(&self, samples: &[f32], source_rate: u32) -> ClipFeatures {
        let normalized = audio::normalize(samples, source_rate, &self.config);
        let spectrogram = spectrogram::compute(&normalized, &self.config, &self.plan);

        let ((spectral, timbral), (rhythm, tonal)) = rayon::join(
            || {
                rayon::join(
                    || spectral::extract(&spectrogram, &self.mel, &self.config),
                    || timbral::extract(&normalized, &spectrogram, &self.config),
                )
            },
            || {
                rayon::join(
                    || rhythm::extract(&spectrogram, &self.mel, &self.config),
                    || tonal::extract(&spectrogram, &self.config),
                )
            },
        );

        ClipFeatures {
            spectral,
            timbral,
            rhythm,
            tonal,
        }
    }

    /// Analyze a clip and assemble the fixed-length feature vector.
    pub fn fingerprint(&self, samples: &[f32], source_rate: u32) -> Vec<f32> {
        vector::assemble(&self.analyze(samples, source_rate), &self.config)
    }
}
