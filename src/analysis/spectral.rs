//! Spectral family: MFCC statistics and their time-derivatives.

use crate::analysis::features::SpectralFeatures;
use crate::analysis::mel::MelBank;
use crate::analysis::spectrogram::PowerSpectrogram;
use crate::analysis::stats::{mean_vec, std_vec};
use crate::config::AnalysisConfig;

/// Regression half-window for delta features (9-frame window).
const DELTA_HALF_WINDOW: usize = 4;

pub(crate) fn extract(
    spectrogram: &PowerSpectrogram,
    mel: &MelBank,
    config: &AnalysisConfig,
) -> SpectralFeatures {
    let mfcc_frames: Vec<Vec<f32>> = spectrogram
        .frames
        .iter()
        .map(|power| mel.mfcc_from_power(power))
        .collect();
    let delta_frames = delta(&mfcc_frames, config.n_mfcc);
    let delta2_frames = delta(&delta_frames, config.n_mfcc);

    SpectralFeatures {
        mfcc_mean: mean_vec(&mfcc_frames, config.n_mfcc),
        mfcc_std: std_vec(&mfcc_frames, config.n_mfcc),
        mfcc_delta_mean: mean_vec(&delta_frames, config.n_mfcc),
        mfcc_delta_std: std_vec(&delta_frames, config.n_mfcc),
        mfcc_delta2_mean: mean_vec(&delta2_frames, config.n_mfcc),
        mfcc_delta2_std: std_vec(&delta2_frames, config.n_mfcc),
    }
}

/// Regression delta over the frame axis with edge clamping.
fn delta(frames: &[Vec<f32>], dim: usize) -> Vec<Vec<f32>> {
    if frames.is_empty() {
        return Vec::new();
    }
    let norm: f32 = 2.0
        * (1..=DELTA_HALF_WINDOW)
            .map(|n| (n * n) as f32)
            .sum::<f32>();
    let last = frames.len() - 1;
    let mut out = Vec::with_capacity(frames.len());
    for t in 0..frames.len() {
        let mut row = vec![0.0_f32; dim];
        for n in 1..=DELTA_HALF_WINDOW {
            let ahead = &frames[(t + n).min(last)];
            let behind = &frames[t.saturating_sub(n)];
            for i in 0..dim {
                let a = ahead.get(i).copied().unwrap_or(0.0);
                let b = behind.get(i).copied().unwrap_or(0.0);
                row[i] += n as f32 * (a - b);
            }
        }
        for value in &mut row {
            *value /= norm;
        }
        out.push(row);
    }
    out
}
