// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! FIR coefficient generators.
//!
//! Low-pass kernels are Hamming-windowed sinc, normalised so DC gain equals
//! one. All kernels have odd length so the group delay is an integer number
//! of samples; even requests are bumped to the next odd count.

use std::f64::consts::PI;

fn odd(length: usize) -> usize {
    if length % 2 == 0 {
        length + 1
    } else {
        length
    }
}

/// Hamming-windowed sinc low-pass kernel with the corner at `corner_hz`.
pub fn low_pass_kernel(sample_rate: f64, corner_hz: f64, length: usize) -> Vec<f32> {
    let length = odd(length.max(1));
    let cutoff = (corner_hz / sample_rate).clamp(0.0, 0.5);
    let center = (length / 2) as f64;
    let m = (length - 1) as f64;

    let mut coeffs = Vec::with_capacity(length);
    let mut sum = 0.0_f64;
    for n in 0..length {
        let x = n as f64 - center;
        let sinc = if x == 0.0 {
            2.0 * cutoff
        } else {
            (2.0 * PI * cutoff * x).sin() / (PI * x)
        };
        let window = if length == 1 {
            1.0
        } else {
            0.54 - 0.46 * (2.0 * PI * n as f64 / m).cos()
        };
        let c = sinc * window;
        sum += c;
        coeffs.push(c);
    }
    if sum.abs() > 1e-12 {
        let inv = 1.0 / sum;
        for c in &mut coeffs {
            *c *= inv;
        }
    }
    coeffs.into_iter().map(|c| c as f32).collect()
}

/// Blackman window of the given length.
pub fn blackman_window(length: usize) -> Vec<f64> {
    let length = length.max(1);
    if length == 1 {
        return vec![1.0];
    }
    let m = (length - 1) as f64;
    (0..length)
        .map(|n| {
            let t = 2.0 * PI * n as f64 / m;
            0.42 - 0.5 * t.cos() + 0.08 * (2.0 * t).cos()
        })
        .collect()
}

/// Blackman-windowed 90° phase-shift (Hilbert) kernel. Odd length; taps at
/// even offsets from the centre are zero.
pub fn hilbert_kernel(length: usize) -> Vec<f32> {
    let length = odd(length.max(3));
    let center = (length / 2) as i64;
    let window = blackman_window(length);

    (0..length)
        .map(|n| {
            let k = n as i64 - center;
            if k % 2 == 0 {
                0.0
            } else {
                (2.0 / (PI * k as f64) * window[n]) as f32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_pass_kernel_dc_gain_is_one() {
        for &(rate, corner, taps) in &[
            (1_024_000.0, 75_000.0, 151),
            (336_000.0, 24_000.0, 41),
            (48_000.0, 25.0, 351),
        ] {
            let kernel = low_pass_kernel(rate, corner, taps);
            let sum: f32 = kernel.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-6,
                "kernel sum {sum} for corner {corner}"
            );
        }
    }

    #[test]
    fn test_low_pass_kernel_forced_odd_and_symmetric() {
        let kernel = low_pass_kernel(48_000.0, 4_000.0, 40);
        assert_eq!(kernel.len(), 41);
        for k in 0..kernel.len() / 2 {
            let mirror = kernel[kernel.len() - 1 - k];
            assert!((kernel[k] - mirror).abs() < 1e-7, "asymmetry at tap {k}");
        }
    }

    #[test]
    fn test_low_pass_kernel_rejects_stopband_tone() {
        // 41 taps, corner at 0.1·fs: a tone at 0.4·fs should be attenuated
        // by well over 40 dB once the kernel is applied as a dot product.
        let kernel = low_pass_kernel(1.0, 0.1, 41);
        let response = |freq: f64| -> f64 {
            let center = (kernel.len() / 2) as f64;
            let mut re = 0.0;
            let mut im = 0.0;
            for (n, &c) in kernel.iter().enumerate() {
                let phase = 2.0 * PI * freq * (n as f64 - center);
                re += c as f64 * phase.cos();
                im += c as f64 * phase.sin();
            }
            (re * re + im * im).sqrt()
        };
        assert!(response(0.0) > 0.999);
        assert!(response(0.4) < 0.01);
    }

    #[test]
    fn test_blackman_window_endpoints_and_peak() {
        let window = blackman_window(51);
        assert!(window[0].abs() < 1e-12);
        assert!(window[50].abs() < 1e-12);
        assert!((window[25] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_hilbert_kernel_is_antisymmetric_with_zero_even_taps() {
        let kernel = hilbert_kernel(63);
        let center = kernel.len() / 2;
        assert_eq!(kernel[center], 0.0);
        for k in 1..=center {
            assert!(
                (kernel[center + k] + kernel[center - k]).abs() < 1e-7,
                "tap pair {k} not antisymmetric"
            );
            if k % 2 == 0 {
                assert_eq!(kernel[center + k], 0.0);
            }
        }
    }

    #[test]
    fn test_hilbert_kernel_shifts_mid_band_tone_by_90_degrees() {
        let kernel = hilbert_kernel(101);
        let center = (kernel.len() / 2) as f64;
        // Response at 0.25·fs: magnitude ≈ 1, phase ≈ -90° relative to the
        // group delay.
        let freq = 0.25;
        let mut re = 0.0;
        let mut im = 0.0;
        for (n, &c) in kernel.iter().enumerate() {
            let phase = 2.0 * PI * freq * (n as f64 - center);
            re += c as f64 * phase.cos();
            im -= c as f64 * phase.sin();
        }
        let mag = (re * re + im * im).sqrt();
        assert!((mag - 1.0).abs() < 0.01, "Hilbert magnitude {mag}");
        assert!(re.abs() < 1e-6, "Hilbert response should be purely imaginary");
    }
}
