//! Rhythmic family: onset-strength envelope, tempogram and tempo estimate.

use crate::analysis::features::RhythmFeatures;
use crate::analysis::fft::hann_window;
use crate::analysis::mel::{MelBank, power_to_db};
use crate::analysis::spectrogram::PowerSpectrogram;
use crate::analysis::stats::mean_vec;
use crate::config::AnalysisConfig;

const TEMPO_MIN_BPM: f32 = 30.0;
const TEMPO_MAX_BPM: f32 = 300.0;
/// Minimum share of the peak autocorrelation the half-period lag must
/// carry before the estimate is moved up an octave.
const SUBHARMONIC_TOLERANCE: f64 = 0.33;

pub(crate) fn extract(
    spectrogram: &PowerSpectrogram,
    mel: &MelBank,
    config: &AnalysisConfig,
) -> RhythmFeatures {
    let mel_frames: Vec<Vec<f32>> = spectrogram
        .frames
        .iter()
        .map(|power| mel.mel_power(power))
        .collect();
    let mel_db = power_to_db(&mel_frames);
    let onset = onset_envelope(&mel_db, mel.n_mels());
    let tempogram_frames = tempogram(&onset, config.tempogram_window);
    RhythmFeatures {
        tempo_bpm: estimate_tempo(&onset, config),
        tempogram_mean: mean_vec(&tempogram_frames, config.tempogram_window),
    }
}

/// Per-frame positive spectral flux of the dB mel spectrogram, averaged
/// over bands. The first frame has no predecessor and is zero.
fn onset_envelope(mel_db: &[Vec<f32>], n_mels: usize) -> Vec<f32> {
    let mut onset = Vec::with_capacity(mel_db.len());
    onset.push(0.0);
    for t in 1..mel_db.len() {
        let mut flux = 0.0_f64;
        for band in 0..n_mels {
            let now = mel_db[t].get(band).copied().unwrap_or(0.0);
            let before = mel_db[t - 1].get(band).copied().unwrap_or(0.0);
            flux += (now - before).max(0.0) as f64;
        }
        onset.push((flux / n_mels.max(1) as f64) as f32);
    }
    onset
}

/// Windowed local autocorrelation of the onset envelope. Frame-major:
/// one `window` lag vector per frame, peak-normalized per frame.
fn tempogram(onset: &[f32], window: usize) -> Vec<Vec<f32>> {
    let hann = hann_window(window);
    let half = window / 2;
    let mut frames = Vec::with_capacity(onset.len());
    let mut segment = vec![0.0_f32; window];
    for t in 0..onset.len() {
        for (i, cell) in segment.iter_mut().enumerate() {
            let idx = (t + i) as isize - half as isize;
            let value = if idx >= 0 {
                onset.get(idx as usize).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            *cell = value * hann[i];
        }
        frames.push(autocorrelate(&segment, window));
    }
    frames
}

fn autocorrelate(segment: &[f32], lags: usize) -> Vec<f32> {
    let mut ac = Vec::with_capacity(lags);
    for lag in 0..lags {
        let mut sum = 0.0_f64;
        for i in 0..segment.len().saturating_sub(lag) {
            sum += segment[i] as f64 * segment[i + lag] as f64;
        }
        ac.push(sum as f32);
    }
    let peak = ac.iter().copied().fold(0.0_f32, f32::max);
    if peak > 0.0 {
        for value in &mut ac {
            *value /= peak;
        }
    }
    ac
}

/// Global autocorrelation tempo estimate restricted to 30-300 BPM.
/// A silent envelope has no periodicity and reports 0.0 BPM.
///
/// Raw argmax favors even multiples of the beat period whenever the true
/// period is not an integer number of frames (the doubled lag aligns
/// exactly while the single period straddles two lags). After the argmax,
/// the half-period lag takes over when it carries a comparable share of
/// the autocorrelation.
fn estimate_tempo(onset: &[f32], config: &AnalysisConfig) -> f32 {
    let frame_rate = config.sample_rate as f32 / config.hop_length.max(1) as f32;
    let lag_min = ((60.0 * frame_rate / TEMPO_MAX_BPM).floor() as usize).max(1);
    let lag_max = ((60.0 * frame_rate / TEMPO_MIN_BPM).ceil() as usize).min(onset.len());
    if lag_min >= lag_max {
        return 0.0;
    }
    let correlation = |lag: usize| -> f64 {
        let mut sum = 0.0_f64;
        for i in 0..onset.len() - lag {
            sum += onset[i] as f64 * onset[i + lag] as f64;
        }
        sum
    };
    let mut best_lag = 0usize;
    let mut best_value = 0.0_f64;
    for lag in lag_min..lag_max {
        let value = correlation(lag);
        if value > best_value {
            best_value = value;
            best_lag = lag;
        }
    }
    if best_lag == 0 || best_value <= 0.0 {
        return 0.0;
    }
    loop {
        let half = best_lag / 2;
        if half < lag_min {
            break;
        }
        // The true half period may straddle two lags; scan its neighbors.
        let lo = half.saturating_sub(1).max(lag_min);
        let hi = (half + 1).min(best_lag - 1);
        let mut half_lag = 0usize;
        let mut half_value = 0.0_f64;
        for lag in lo..=hi {
            let value = correlation(lag);
            if value > half_value {
                half_value = value;
                half_lag = lag;
            }
        }
        if half_lag == 0 || half_value < SUBHARMONIC_TOLERANCE * best_value {
            break;
        }
        best_lag = half_lag;
        best_value = half_value;
    }
    60.0 * frame_rate / best_lag as f32
}
