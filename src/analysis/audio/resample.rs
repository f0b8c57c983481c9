use std::f64::consts::PI;

/// Half-width of the windowed-sinc interpolation kernel, in input samples.
const KERNEL_HALF_WIDTH: isize = 16;

/// Band-limited resampling with a Hann-windowed sinc kernel.
///
/// Output length is `round(len * output_rate / input_rate)`, preserving the
/// clip duration. When downsampling, the kernel cutoff is lowered to the
/// output Nyquist to avoid aliasing.
pub(crate) fn resample_sinc(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    let input_rate = input_rate.max(1);
    let output_rate = output_rate.max(1);
    if samples.is_empty() || input_rate == output_rate {
        return samples.to_vec();
    }
    let ratio = output_rate as f64 / input_rate as f64;
    let out_len = ((samples.len() as f64) * ratio).round().max(1.0) as usize;
    let cutoff = ratio.min(1.0);
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 / ratio;
        out.push(interpolate(samples, pos, cutoff));
    }
    out
}

fn interpolate(samples: &[f32], pos: f64, cutoff: f64) -> f32 {
    let center = pos.floor() as isize;
    let frac = pos - center as f64;
    let mut acc = 0.0_f64;
    let mut kernel_sum = 0.0_f64;
    for tap in -KERNEL_HALF_WIDTH..=KERNEL_HALF_WIDTH {
        let idx = center + tap;
        let Ok(idx) = usize::try_from(idx) else {
            continue;
        };
        let Some(&sample) = samples.get(idx) else {
            continue;
        };
        let t = tap as f64 - frac;
        let weight = sinc(cutoff * t) * hann_tap(t);
        acc += sample as f64 * weight;
        kernel_sum += weight;
    }
    if kernel_sum.abs() <= f64::EPSILON {
        return 0.0;
    }
    // Normalizing by the kernel sum keeps unity gain at the clip edges
    // where the kernel is clipped.
    (acc / kernel_sum) as f32
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-9 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

fn hann_tap(t: f64) -> f64 {
    let half = KERNEL_HALF_WIDTH as f64;
    if t.abs() >= half {
        return 0.0;
    }
    0.5 * (1.0 + (PI * t / half).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_preserves_duration() {
        let input = vec![0.0_f32; 44_100];
        let out = resample_sinc(&input, 44_100, 22_050);
        assert_eq!(out.len(), 22_050);
        let up = resample_sinc(&input, 22_050, 44_100);
        assert_eq!(up.len(), 88_200);
    }

    #[test]
    fn identical_rates_are_a_copy() {
        let input = vec![0.1_f32, -0.2, 0.3];
        assert_eq!(resample_sinc(&input, 22_050, 22_050), input);
    }

    #[test]
    fn constant_signal_stays_constant_in_the_interior() {
        let input = vec![0.5_f32; 4_000];
        let out = resample_sinc(&input, 32_000, 22_050);
        for &v in &out[64..out.len() - 64] {
            assert!((v - 0.5).abs() < 1e-3, "interior sample drifted: {v}");
        }
    }

    #[test]
    fn downsampled_tone_keeps_its_frequency() {
        let input_rate = 44_100u32;
        let output_rate = 22_050u32;
        let freq = 440.0_f32;
        let input: Vec<f32> = (0..input_rate as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / input_rate as f32).sin())
            .collect();
        let out = resample_sinc(&input, input_rate, output_rate);
        // Count zero crossings over the interior second; a 440 Hz tone has
        // ~880 crossings per second at any sample rate.
        let mut crossings = 0u32;
        for pair in out[100..out.len() - 100].windows(2) {
            if (pair[0] >= 0.0) != (pair[1] >= 0.0) {
                crossings += 1;
            }
        }
        let expected = 2.0 * freq * (out.len() - 200) as f32 / output_rate as f32;
        assert!((crossings as f32 - expected).abs() < expected * 0.05);
    }
}
