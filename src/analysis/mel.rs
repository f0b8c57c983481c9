//! Mel filter bank, log-mel spectrogram and MFCC.

/// Decibel floor applied below the per-clip peak when converting mel power
/// to dB.
pub(crate) const DB_FLOOR: f32 = -80.0;
const POWER_EPS: f32 = 1e-10;

/// Triangular mel filters over FFT power bins plus the DCT size used for
/// cepstral coefficients.
pub(crate) struct MelBank {
    n_mfcc: usize,
    filters: Vec<Vec<(usize, f32)>>,
}

impl MelBank {
    pub(crate) fn new(sample_rate: u32, n_fft: usize, n_mels: usize, n_mfcc: usize) -> Self {
        let nyquist = sample_rate.max(1) as f32 * 0.5;
        let bins = mel_bins(sample_rate, n_fft, n_mels, 0.0, nyquist);
        let filters = build_filters(&bins, n_mels);
        Self { n_mfcc, filters }
    }

    pub(crate) fn n_mels(&self) -> usize {
        self.filters.len()
    }

    /// Mel-band power energies for one frame's power spectrum.
    pub(crate) fn mel_power(&self, power: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            let mut sum = 0.0_f64;
            for &(bin, weight) in filter {
                let p = power.get(bin).copied().unwrap_or(0.0).max(0.0) as f64;
                sum += p * weight as f64;
            }
            out.push(sum as f32);
        }
        out
    }

    /// Cepstral coefficients for one frame's power spectrum: log mel
    /// energies followed by a DCT-II.
    pub(crate) fn mfcc_from_power(&self, power: &[f32]) -> Vec<f32> {
        let mel_energies = self.mel_power(power);
        let log_energies: Vec<f32> = mel_energies
            .iter()
            .copied()
            .map(|e| (e.max(1e-12)).ln())
            .collect();
        dct_ii(&log_energies, self.n_mfcc)
    }
}

/// Convert mel power frames to a dB scale referenced to the clip-wide peak,
/// floored at [`DB_FLOOR`]. All-silent input maps to a uniform 0 dB.
pub(crate) fn power_to_db(frames: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let peak = frames
        .iter()
        .flat_map(|frame| frame.iter().copied())
        .fold(0.0_f32, f32::max)
        .max(POWER_EPS);
    frames
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|&p| {
                    let db = 10.0 * (p.max(POWER_EPS) / peak).log10();
                    db.max(DB_FLOOR)
                })
                .collect()
        })
        .collect()
}

fn mel_bins(sample_rate: u32, n_fft: usize, n_mels: usize, f_min: f32, f_max: f32) -> Vec<usize> {
    let mel_min = hz_to_mel(f_min);
    let mel_max = hz_to_mel(f_max.max(f_min));
    let mut bins = Vec::with_capacity(n_mels + 2);
    for i in 0..(n_mels + 2) {
        let t = i as f32 / (n_mels + 1) as f32;
        let hz = mel_to_hz(mel_min + (mel_max - mel_min) * t);
        bins.push(freq_to_bin(hz, sample_rate, n_fft));
    }
    bins
}

fn build_filters(bins: &[usize], n_mels: usize) -> Vec<Vec<(usize, f32)>> {
    let mut filters = Vec::with_capacity(n_mels);
    for m in 0..n_mels {
        let left = bins[m];
        let center = bins[m + 1];
        let right = bins[m + 2].max(center + 1);
        filters.push(build_tri_filter(left, center, right));
    }
    filters
}

fn build_tri_filter(left: usize, center: usize, right: usize) -> Vec<(usize, f32)> {
    let mut weights = Vec::new();
    if right <= left {
        return weights;
    }
    for bin in left..=right {
        let w = if bin < center {
            if center == left {
                0.0
            } else {
                (bin as f32 - left as f32) / (center as f32 - left as f32)
            }
        } else if right == center {
            0.0
        } else {
            (right as f32 - bin as f32) / (right as f32 - center as f32)
        };
        if w > 0.0 {
            weights.push((bin, w));
        }
    }
    weights
}

pub(crate) fn freq_to_bin(freq_hz: f32, sample_rate: u32, n_fft: usize) -> usize {
    let nyquist = sample_rate.max(1) as f32 * 0.5;
    let freq = freq_hz.clamp(0.0, nyquist);
    (((freq * n_fft as f32) / sample_rate.max(1) as f32).floor() as usize).min(n_fft / 2)
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0_f32 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0_f32 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

fn dct_ii(values: &[f32], count: usize) -> Vec<f32> {
    let n = values.len().max(1) as f64;
    let mut out = Vec::with_capacity(count);
    for k in 0..count {
        let mut sum = 0.0_f64;
        for (m, &v) in values.iter().enumerate() {
            let angle = std::f64::consts::PI * (k as f64) * ((m as f64) + 0.5) / n;
            sum += v as f64 * angle.cos();
        }
        out.push(sum as f32);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mfcc_from_power_returns_configured_count() {
        let bank = MelBank::new(22_050, 1024, 40, 13);
        let power = vec![0.0_f32; 1024 / 2 + 1];
        assert_eq!(bank.mfcc_from_power(&power).len(), 13);
    }

    #[test]
    fn mel_power_has_one_value_per_band() {
        let bank = MelBank::new(22_050, 1024, 40, 13);
        let power = vec![1.0_f32; 1024 / 2 + 1];
        let mel = bank.mel_power(&power);
        assert_eq!(mel.len(), 40);
        assert!(mel.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn power_to_db_peaks_at_zero_and_floors_at_minus_eighty() {
        let frames = vec![vec![1.0_f32, 1e-12, 0.5]];
        let db = power_to_db(&frames);
        assert!((db[0][0]).abs() < 1e-5);
        assert_eq!(db[0][1], DB_FLOOR);
        assert!(db[0][2] < 0.0 && db[0][2] > DB_FLOOR);
    }

    #[test]
    fn silent_frames_convert_to_uniform_db() {
        let frames = vec![vec![0.0_f32; 8]; 3];
        let db = power_to_db(&frames);
        assert!(db.iter().all(|f| f.iter().all(|&v| v == 0.0)));
    }
}
