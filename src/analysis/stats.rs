use serde::{Deserialize, Serialize};

/// Mean and standard deviation of a frame-wise metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub mean: f32,
    pub std: f32,
}

impl Stats {
    pub(crate) const ZERO: Stats = Stats {
        mean: 0.0,
        std: 0.0,
    };
}

pub(crate) fn stats_f32(values: &[f32]) -> Stats {
    if values.is_empty() {
        return Stats::ZERO;
    }
    let mean = (values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64) as f32;
    let mut var = 0.0_f64;
    for &v in values {
        let d = v as f64 - mean as f64;
        var += d * d;
    }
    Stats {
        mean,
        std: (var / values.len() as f64).sqrt() as f32,
    }
}

/// Per-dimension mean across frames. `frames` is frame-major: one inner
/// vector per frame, `dim` values each.
pub(crate) fn mean_vec(frames: &[Vec<f32>], dim: usize) -> Vec<f32> {
    if frames.is_empty() || dim == 0 {
        return vec![0.0; dim];
    }
    let mut sum = vec![0.0_f64; dim];
    for frame in frames {
        for (i, &v) in frame.iter().take(dim).enumerate() {
            sum[i] += v as f64;
        }
    }
    sum.into_iter()
        .map(|v| (v / frames.len() as f64) as f32)
        .collect()
}

/// Per-dimension standard deviation across frames.
pub(crate) fn std_vec(frames: &[Vec<f32>], dim: usize) -> Vec<f32> {
    if frames.is_empty() || dim == 0 {
        return vec![0.0; dim];
    }
    let mean = mean_vec(frames, dim);
    let mut var = vec![0.0_f64; dim];
    for frame in frames {
        for (i, &v) in frame.iter().take(dim).enumerate() {
            let d = v as f64 - mean[i] as f64;
            var[i] += d * d;
        }
    }
    var.into_iter()
        .map(|v| (v / frames.len() as f64).sqrt() as f32)
        .collect()
}
