//! Strongly-typed per-family analyzer outputs.
//!
//! Each family reduces its frame-wise output to summary statistics here;
//! [`crate::analysis::vector::assemble`] flattens these records in a fixed,
//! documented order.

use serde::{Deserialize, Serialize};

use super::stats::Stats;

/// Cepstral summary of the mel spectrogram.
///
/// The delta statistics describe the rate of change of timbral texture;
/// they are carried on the record but are not part of vector layout v1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpectralFeatures {
    pub mfcc_mean: Vec<f32>,
    pub mfcc_std: Vec<f32>,
    pub mfcc_delta_mean: Vec<f32>,
    pub mfcc_delta_std: Vec<f32>,
    pub mfcc_delta2_mean: Vec<f32>,
    pub mfcc_delta2_std: Vec<f32>,
}

/// Per-frame spectral-shape descriptors aggregated over the clip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimbralFeatures {
    /// Spectral centroid in Hz (brightness).
    pub centroid_hz: Stats,
    /// Spectral bandwidth in Hz (spread around the centroid).
    pub bandwidth_hz: Stats,
    /// Spectral flatness (tonal vs. noise-like), in [0, 1].
    pub flatness: Stats,
    /// Per-band spectral contrast means, `contrast_bands + 1` values.
    pub contrast_mean: Vec<f32>,
    /// 85% energy rolloff frequency in Hz.
    pub rolloff_hz: Stats,
    /// Zero-crossing rate per frame (crossings / frame length).
    pub zcr: Stats,
}

/// Onset, periodicity and tempo summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RhythmFeatures {
    /// Tempo estimate in beats per minute; 0.0 for silence.
    pub tempo_bpm: f32,
    /// Per-lag means of the tempogram, `tempogram_window` values.
    pub tempogram_mean: Vec<f32>,
}

/// Pitch-class and tonal-centroid summary of the harmonic component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TonalFeatures {
    /// Mean chroma energy per pitch class, 12 values.
    pub chroma_mean: Vec<f32>,
    /// Mean tonal centroid projection, 6 values.
    pub tonnetz_mean: Vec<f32>,
}

/// Combined analyzer outputs for one clip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipFeatures {
    pub spectral: SpectralFeatures,
    pub timbral: TimbralFeatures,
    pub rhythm: RhythmFeatures,
    pub tonal: TonalFeatures,
}
