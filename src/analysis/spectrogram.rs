//! Shared STFT power spectrogram on the analysis frame grid.
//!
//! Every frame-wise analyzer consumes this one representation, so all
//! families see exactly `n_frames` columns.

use crate::analysis::audio::sanitize_sample;
use crate::analysis::fft::{Complex32, FftPlan, fft_inplace, hann_window};
use crate::config::AnalysisConfig;

/// Power spectra for each analysis frame. Frame-major: `frames[t]` holds
/// `n_fft / 2 + 1` power bins.
pub(crate) struct PowerSpectrogram {
    pub(crate) frames: Vec<Vec<f32>>,
    pub(crate) sample_rate: u32,
    pub(crate) n_fft: usize,
}

impl PowerSpectrogram {
    /// Frequency of an FFT bin center in Hz.
    pub(crate) fn bin_hz(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate.max(1) as f32 / self.n_fft as f32
    }

    pub(crate) fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }
}

/// Compute the power spectrogram of a normalized signal.
///
/// The signal is expected to already have the canonical fixed length;
/// out-of-range reads (sub-window configurations) are treated as zeros so
/// the output always has exactly `config.n_frames()` frames.
pub(crate) fn compute(
    samples: &[f32],
    config: &AnalysisConfig,
    plan: &FftPlan,
) -> PowerSpectrogram {
    let n_fft = plan.len();
    let hop = config.hop_length.max(1);
    let n_frames = config.n_frames();
    let window = hann_window(n_fft);
    let bins = n_fft / 2 + 1;

    let mut frames = Vec::with_capacity(n_frames);
    let mut buffer = vec![Complex32::default(); n_fft];
    for frame in 0..n_frames {
        let start = frame * hop;
        for (i, cell) in buffer.iter_mut().enumerate() {
            let sample = samples.get(start + i).copied().unwrap_or(0.0);
            *cell = Complex32::new(sanitize_sample(sample) * window[i], 0.0);
        }
        if fft_inplace(&mut buffer, plan).is_err() {
            break;
        }
        frames.push(power_spectrum(&buffer, bins));
    }
    while frames.len() < n_frames {
        frames.push(vec![0.0_f32; bins]);
    }
    PowerSpectrogram {
        frames,
        sample_rate: config.sample_rate,
        n_fft,
    }
}

fn power_spectrum(fft: &[Complex32], bins: usize) -> Vec<f32> {
    let mut power = Vec::with_capacity(bins);
    for bin in 0..bins {
        let c = fft[bin];
        power.push((c.re * c.re + c.im * c.im).max(0.0));
    }
    power
}
