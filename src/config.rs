//! Configuration for the extraction pipeline and the matching engine.
//!
//! Every analysis parameter that affects the feature vector layout lives in
//! [`AnalysisConfig`]. The corpus and all query vectors must be produced
//! under an identical configuration; changing any field changes
//! [`AnalysisConfig::feature_len`] and invalidates previously stored vectors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters of the feature extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Canonical sample rate every clip is resampled to.
    pub sample_rate: u32,
    /// FFT window size. Must be a power of two.
    pub n_fft: usize,
    /// Stride between analysis frames, in samples.
    pub hop_length: usize,
    /// Number of mel filter bands.
    pub n_mels: usize,
    /// Number of cepstral coefficients per frame.
    pub n_mfcc: usize,
    /// Canonical clip duration; shorter clips are zero-padded, longer
    /// clips truncated.
    pub duration_seconds: f32,
    /// Number of octave-spaced contrast bands (the contrast feature has
    /// `contrast_bands + 1` rows).
    pub contrast_bands: usize,
    /// Tempogram autocorrelation window, in frames. One vector slot per lag.
    pub tempogram_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_mfcc: 20,
            duration_seconds: 30.0,
            contrast_bands: 6,
            tempogram_window: 384,
        }
    }
}

impl AnalysisConfig {
    /// Canonical sample count every normalized clip is forced to.
    pub fn fixed_length(&self) -> usize {
        (self.duration_seconds as f64 * self.sample_rate as f64) as usize
    }

    /// Number of analysis frames on the frame grid. Every frame-wise
    /// analyzer output has exactly this many columns.
    pub fn n_frames(&self) -> usize {
        let fixed = self.fixed_length();
        if fixed < self.n_fft {
            return 1;
        }
        1 + (fixed - self.n_fft) / self.hop_length.max(1)
    }

    /// Length of the assembled feature vector. A pure function of the
    /// configuration, never of the input clip.
    pub fn feature_len(&self) -> usize {
        // mfcc mean/std + six spectral-shape stats + contrast rows +
        // rolloff mean + zcr mean/std + tempo + tempogram rows + chroma +
        // tonnetz.
        2 * self.n_mfcc + (self.contrast_bands + 1) + self.tempogram_window + 28
    }

    /// Reject parameter combinations the pipeline cannot compute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_fft == 0 || !self.n_fft.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "n_fft must be a power of two, got {}",
                self.n_fft
            )));
        }
        if self.hop_length == 0 {
            return Err(ConfigError::Invalid("hop_length must be non-zero".into()));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be non-zero".into()));
        }
        if self.n_mels == 0 || self.n_mfcc == 0 {
            return Err(ConfigError::Invalid(
                "n_mels and n_mfcc must be non-zero".into(),
            ));
        }
        if self.tempogram_window == 0 {
            return Err(ConfigError::Invalid(
                "tempogram_window must be non-zero".into(),
            ));
        }
        if !(self.duration_seconds > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "duration_seconds must be positive, got {}",
                self.duration_seconds
            )));
        }
        Ok(())
    }
}

/// Parameters of the similarity matching engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Maximum number of neighbors returned per query.
    pub k: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { k: 10 }
    }
}

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feature extraction parameters.
    pub analysis: AnalysisConfig,
    /// Matching engine parameters.
    pub matching: MatchConfig,
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML content.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Parameter combination the pipeline cannot compute.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Parse a configuration from TOML text. Missing fields fall back to
    /// defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.analysis.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_feature_len_matches_layout() {
        let config = AnalysisConfig::default();
        // 40 mfcc stats + 6 shape stats + 7 contrast + 1 rolloff + 2 zcr +
        // 1 tempo + 384 tempogram + 12 chroma + 6 tonnetz.
        assert_eq!(config.feature_len(), 459);
    }

    #[test]
    fn frame_count_follows_grid_formula() {
        let config = AnalysisConfig::default();
        let fixed = config.fixed_length();
        assert_eq!(fixed, 661_500);
        assert_eq!(config.n_frames(), 1 + (fixed - 2048) / 512);
    }

    #[test]
    fn frame_count_is_one_for_sub_window_duration() {
        let config = AnalysisConfig {
            duration_seconds: 0.01,
            sample_rate: 8_000,
            n_fft: 1024,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.n_frames(), 1);
    }

    #[test]
    fn partial_toml_overrides_keep_defaults() {
        let config = Config::from_toml_str(
            "[analysis]\nn_mfcc = 13\n\n[matching]\nk = 5\n",
        )
        .expect("parse");
        assert_eq!(config.analysis.n_mfcc, 13);
        assert_eq!(config.analysis.sample_rate, 22_050);
        assert_eq!(config.matching.k, 5);
    }

    #[test]
    fn validate_rejects_non_power_of_two_fft() {
        let config = AnalysisConfig {
            n_fft: 1000,
            ..AnalysisConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("power of two"));
    }

    #[test]
    fn feature_len_tracks_parameter_changes() {
        let base = AnalysisConfig::default();
        let wider = AnalysisConfig {
            n_mfcc: 13,
            ..base.clone()
        };
        assert_ne!(base.feature_len(), wider.feature_len());
    }
}
