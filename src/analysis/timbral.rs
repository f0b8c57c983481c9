//! Timbral family: per-frame spectral-shape descriptors and zero-crossing
//! rate, aggregated over the clip.

use crate::analysis::features::TimbralFeatures;
use crate::analysis::mel::freq_to_bin;
use crate::analysis::spectrogram::PowerSpectrogram;
use crate::analysis::stats::{mean_vec, stats_f32};
use crate::config::AnalysisConfig;

const ROLLOFF_FRACTION: f32 = 0.85;
/// Lowest contrast band edge in Hz; bands double per octave above it.
const CONTRAST_F_MIN: f32 = 200.0;
/// Fraction of a band's bins averaged for its peak and valley.
const CONTRAST_QUANTILE: f32 = 0.02;
const CONTRAST_EPS: f32 = 1e-10;

pub(crate) fn extract(
    samples: &[f32],
    spectrogram: &PowerSpectrogram,
    config: &AnalysisConfig,
) -> TimbralFeatures {
    let mut centroid = Vec::with_capacity(spectrogram.frames.len());
    let mut bandwidth = Vec::with_capacity(spectrogram.frames.len());
    let mut flatness = Vec::with_capacity(spectrogram.frames.len());
    let mut rolloff = Vec::with_capacity(spectrogram.frames.len());
    let mut contrast_frames = Vec::with_capacity(spectrogram.frames.len());
    let bands = contrast_band_ranges(spectrogram, config.contrast_bands);

    for power in &spectrogram.frames {
        let (sum, centroid_hz) = centroid_of(power, spectrogram);
        centroid.push(centroid_hz);
        bandwidth.push(bandwidth_of(power, spectrogram, sum, centroid_hz));
        flatness.push(flatness_of(power));
        rolloff.push(rolloff_of(power, spectrogram, sum));
        contrast_frames.push(contrast_of(power, &bands));
    }

    let zcr_frames = zero_crossing_frames(samples, config);

    TimbralFeatures {
        centroid_hz: stats_f32(&centroid),
        bandwidth_hz: stats_f32(&bandwidth),
        flatness: stats_f32(&flatness),
        contrast_mean: mean_vec(&contrast_frames, config.contrast_bands + 1),
        rolloff_hz: stats_f32(&rolloff),
        zcr: stats_f32(&zcr_frames),
    }
}

fn centroid_of(power: &[f32], spectrogram: &PowerSpectrogram) -> (f32, f32) {
    let mut sum = 0.0_f64;
    let mut sum_freq = 0.0_f64;
    for (bin, &p) in power.iter().enumerate() {
        let p = p.max(0.0) as f64;
        sum += p;
        sum_freq += p * spectrogram.bin_hz(bin) as f64;
    }
    if sum <= 0.0 {
        return (0.0, 0.0);
    }
    (sum as f32, (sum_freq / sum) as f32)
}

fn bandwidth_of(
    power: &[f32],
    spectrogram: &PowerSpectrogram,
    sum_power: f32,
    centroid_hz: f32,
) -> f32 {
    let total = sum_power.max(0.0) as f64;
    if total <= 0.0 {
        return 0.0;
    }
    let centroid = centroid_hz.max(0.0) as f64;
    let mut num = 0.0_f64;
    for (bin, &p) in power.iter().enumerate() {
        let diff = spectrogram.bin_hz(bin) as f64 - centroid;
        num += diff * diff * p.max(0.0) as f64;
    }
    (num / total).sqrt() as f32
}

fn flatness_of(power: &[f32]) -> f32 {
    if power.is_empty() {
        return 0.0;
    }
    let eps = 1e-12_f64;
    let mut log_sum = 0.0_f64;
    let mut arith = 0.0_f64;
    for &p in power {
        let p = (p.max(0.0) as f64) + eps;
        log_sum += p.ln();
        arith += p;
    }
    let n = power.len() as f64;
    let geom = (log_sum / n).exp();
    let arith = arith / n;
    if arith <= 0.0 { 0.0 } else { (geom / arith) as f32 }
}

fn rolloff_of(power: &[f32], spectrogram: &PowerSpectrogram, sum_power: f32) -> f32 {
    let total = sum_power.max(0.0) as f64;
    if total <= 0.0 {
        return 0.0;
    }
    let target = total * ROLLOFF_FRACTION as f64;
    let mut cum = 0.0_f64;
    for (bin, &p) in power.iter().enumerate() {
        cum += p.max(0.0) as f64;
        if cum >= target {
            return spectrogram.bin_hz(bin);
        }
    }
    spectrogram.sample_rate as f32 * 0.5
}

/// Bin ranges for `contrast_bands + 1` octave-spaced sub-bands:
/// [0, 200), [200, 400), ... up to the Nyquist.
fn contrast_band_ranges(
    spectrogram: &PowerSpectrogram,
    contrast_bands: usize,
) -> Vec<(usize, usize)> {
    let sample_rate = spectrogram.sample_rate;
    let n_fft = spectrogram.n_fft;
    let bins = spectrogram.bins();
    let mut edges = Vec::with_capacity(contrast_bands + 2);
    edges.push(0usize);
    for band in 0..contrast_bands {
        let hz = CONTRAST_F_MIN * (1 << band) as f32;
        edges.push(freq_to_bin(hz, sample_rate, n_fft));
    }
    edges.push(bins - 1);
    let mut ranges = Vec::with_capacity(contrast_bands + 1);
    for pair in edges.windows(2) {
        let lo = pair[0];
        let hi = (pair[1].max(lo + 1)).min(bins);
        ranges.push((lo.min(bins - 1), hi));
    }
    ranges
}

/// Peak-minus-valley level per band, in dB, at the 2% quantile.
fn contrast_of(power: &[f32], bands: &[(usize, usize)]) -> Vec<f32> {
    let mut out = Vec::with_capacity(bands.len());
    for &(lo, hi) in bands {
        let mut band: Vec<f32> = power[lo..hi.min(power.len())].to_vec();
        if band.is_empty() {
            out.push(0.0);
            continue;
        }
        band.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let take = ((band.len() as f32 * CONTRAST_QUANTILE).round() as usize).max(1);
        let valley: f32 = band[..take].iter().sum::<f32>() / take as f32;
        let peak: f32 = band[band.len() - take..].iter().sum::<f32>() / take as f32;
        let contrast =
            10.0 * ((peak + CONTRAST_EPS).log10() - (valley + CONTRAST_EPS).log10());
        out.push(contrast);
    }
    out
}

/// Zero-crossing rate per analysis frame, crossings divided by frame length.
fn zero_crossing_frames(samples: &[f32], config: &AnalysisConfig) -> Vec<f32> {
    let n_fft = config.n_fft;
    let hop = config.hop_length.max(1);
    let n_frames = config.n_frames();
    let mut out = Vec::with_capacity(n_frames);
    for frame in 0..n_frames {
        let start = frame * hop;
        let mut crossings = 0u32;
        let mut prev = samples.get(start).copied().unwrap_or(0.0);
        for i in 1..n_fft {
            let current = samples.get(start + i).copied().unwrap_or(0.0);
            let crossed = (prev >= 0.0 && current < 0.0) || (prev < 0.0 && current >= 0.0);
            if crossed && (prev != 0.0 || current != 0.0) {
                crossings += 1;
            }
            prev = current;
        }
        out.push(crossings as f32 / n_fft as f32);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fft::FftPlan;
    use crate::analysis::spectrogram;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            sample_rate: 22_050,
            n_fft: 1024,
            hop_length: 512,
            duration_seconds: 0.5,
            ..AnalysisConfig::default()
        }
    }

    fn sine(config: &AnalysisConfig, freq: f32) -> Vec<f32> {
        (0..config.fixed_length())
            .map(|i| {
                (2.0 * std::f32::consts::PI * freq * i as f32 / config.sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn sine_centroid_tracks_tone_frequency() {
        let config = small_config();
        let plan = FftPlan::new(config.n_fft).unwrap();
        let samples = sine(&config, 440.0);
        let spec = spectrogram::compute(&samples, &config, &plan);
        let features = extract(&samples, &spec, &config);
        assert!(features.centroid_hz.mean > 200.0 && features.centroid_hz.mean < 800.0);
        assert!(features.flatness.mean < 0.3);
        assert!(features.rolloff_hz.mean < 1_000.0);
    }

    #[test]
    fn sine_zero_crossing_rate_matches_frequency() {
        let config = small_config();
        let plan = FftPlan::new(config.n_fft).unwrap();
        let samples = sine(&config, 440.0);
        let spec = spectrogram::compute(&samples, &config, &plan);
        let features = extract(&samples, &spec, &config);
        let expected = 2.0 * 440.0 / config.sample_rate as f32;
        assert!((features.zcr.mean - expected).abs() < expected * 0.2);
    }

    #[test]
    fn silence_degrades_to_zero_descriptors() {
        let config = small_config();
        let plan = FftPlan::new(config.n_fft).unwrap();
        let samples = vec![0.0_f32; config.fixed_length()];
        let spec = spectrogram::compute(&samples, &config, &plan);
        let features = extract(&samples, &spec, &config);
        assert_eq!(features.centroid_hz.mean, 0.0);
        assert_eq!(features.bandwidth_hz.mean, 0.0);
        assert_eq!(features.rolloff_hz.mean, 0.0);
        assert_eq!(features.zcr.mean, 0.0);
        assert!(features.contrast_mean.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn contrast_has_one_row_per_band() {
        let config = small_config();
        let plan = FftPlan::new(config.n_fft).unwrap();
        let samples = sine(&config, 440.0);
        let spec = spectrogram::compute(&samples, &config, &plan);
        let features = extract(&samples, &spec, &config);
        assert_eq!(features.contrast_mean.len(), config.contrast_bands + 1);
    }
}
