//! Tonal family: harmonic/percussive separation, chroma and tonnetz.

use std::f32::consts::PI;

use crate::analysis::features::TonalFeatures;
use crate::analysis::spectrogram::PowerSpectrogram;
use crate::analysis::stats::mean_vec;
use crate::config::AnalysisConfig;

/// Median filter length for harmonic/percussive enhancement, in frames
/// (time axis) and bins (frequency axis).
const HPSS_KERNEL: usize = 31;
const MASK_EPS: f64 = 1e-10;
/// Lowest frequency folded into a pitch class; below this the bin spacing
/// is too coarse to resolve semitones.
const CHROMA_F_MIN: f32 = 27.5;

pub(crate) const CHROMA_BINS: usize = 12;
pub(crate) const TONNETZ_DIMS: usize = 6;

pub(crate) fn extract(spectrogram: &PowerSpectrogram, _config: &AnalysisConfig) -> TonalFeatures {
    let harmonic = harmonic_component(&spectrogram.frames);
    let chroma_frames = chroma(&harmonic, spectrogram);
    let tonnetz_frames = tonnetz(&chroma_frames);
    TonalFeatures {
        chroma_mean: mean_vec(&chroma_frames, CHROMA_BINS),
        tonnetz_mean: mean_vec(&tonnetz_frames, TONNETZ_DIMS),
    }
}

/// Split out the harmonic part of a power spectrogram by median filtering:
/// harmonic energy is smooth across time, percussive energy across
/// frequency. A soft power-2 mask scales each cell.
fn harmonic_component(frames: &[Vec<f32>]) -> Vec<Vec<f32>> {
    if frames.is_empty() {
        return Vec::new();
    }
    let bins = frames[0].len();
    let mut harmonic_enhanced = vec![vec![0.0_f32; bins]; frames.len()];
    let mut column = vec![0.0_f32; frames.len()];
    for bin in 0..bins {
        for (t, frame) in frames.iter().enumerate() {
            column[t] = frame.get(bin).copied().unwrap_or(0.0);
        }
        for t in 0..frames.len() {
            harmonic_enhanced[t][bin] = median_around(&column, t, HPSS_KERNEL);
        }
    }

    let mut out = Vec::with_capacity(frames.len());
    for (t, frame) in frames.iter().enumerate() {
        let mut row = Vec::with_capacity(bins);
        for bin in 0..bins {
            let percussive_enhanced = median_around(frame, bin, HPSS_KERNEL);
            let h = harmonic_enhanced[t][bin] as f64;
            let p = percussive_enhanced as f64;
            let mask = (h * h) / (h * h + p * p + MASK_EPS);
            row.push((frame[bin] as f64 * mask) as f32);
        }
        out.push(row);
    }
    out
}

/// Median of a clamped window centered at `index`.
fn median_around(values: &[f32], index: usize, kernel: usize) -> f32 {
    let half = kernel / 2;
    let lo = index.saturating_sub(half);
    let hi = (index + half + 1).min(values.len());
    let mut window: Vec<f32> = values[lo..hi].to_vec();
    if window.is_empty() {
        return 0.0;
    }
    window.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    window[window.len() / 2]
}

/// Fold harmonic power into twelve pitch classes per frame, normalized by
/// the per-frame peak. Silent frames stay all-zero.
fn chroma(harmonic: &[Vec<f32>], spectrogram: &PowerSpectrogram) -> Vec<Vec<f32>> {
    let pitch_classes = bin_pitch_classes(spectrogram);
    let mut out = Vec::with_capacity(harmonic.len());
    for frame in harmonic {
        let mut chroma_row = vec![0.0_f32; CHROMA_BINS];
        for (bin, &p) in frame.iter().enumerate() {
            if let Some(pc) = pitch_classes[bin] {
                chroma_row[pc] += p.max(0.0);
            }
        }
        let peak = chroma_row.iter().copied().fold(0.0_f32, f32::max);
        if peak > 0.0 {
            for value in &mut chroma_row {
                *value /= peak;
            }
        }
        out.push(chroma_row);
    }
    out
}

/// Pitch class for each FFT bin, `None` for DC and sub-audible bins.
fn bin_pitch_classes(spectrogram: &PowerSpectrogram) -> Vec<Option<usize>> {
    (0..spectrogram.bins())
        .map(|bin| {
            let hz = spectrogram.bin_hz(bin);
            if hz < CHROMA_F_MIN {
                return None;
            }
            // MIDI note 69 is A4 at 440 Hz; pitch class 0 is C.
            let midi = 69.0 + 12.0 * (hz / 440.0).log2();
            let pc = (midi.round() as i64).rem_euclid(12) as usize;
            Some(pc)
        })
        .collect()
}

/// Project L1-normalized chroma onto the six tonal-centroid dimensions
/// (fifths, minor thirds and major thirds circles).
fn tonnetz(chroma_frames: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let basis = tonnetz_basis();
    let mut out = Vec::with_capacity(chroma_frames.len());
    for chroma_row in chroma_frames {
        let l1: f32 = chroma_row.iter().map(|v| v.abs()).sum();
        let mut row = vec![0.0_f32; TONNETZ_DIMS];
        if l1 > 0.0 {
            for (pc, &energy) in chroma_row.iter().enumerate() {
                let weight = energy / l1;
                for dim in 0..TONNETZ_DIMS {
                    row[dim] += weight * basis[dim][pc];
                }
            }
        }
        out.push(row);
    }
    out
}

fn tonnetz_basis() -> [[f32; CHROMA_BINS]; TONNETZ_DIMS] {
    let mut basis = [[0.0_f32; CHROMA_BINS]; TONNETZ_DIMS];
    for pc in 0..CHROMA_BINS {
        let n = pc as f32;
        let fifths = n * 7.0 * PI / 6.0;
        let minor_thirds = n * 3.0 * PI / 2.0;
        let major_thirds = n * 2.0 * PI / 3.0;
        basis[0][pc] = fifths.sin();
        basis[1][pc] = fifths.cos();
        basis[2][pc] = minor_thirds.sin();
        basis[3][pc] = minor_thirds.cos();
        basis[4][pc] = 0.5 * major_thirds.sin();
        basis[5][pc] = 0.5 * major_thirds.cos();
    }
    basis
}
