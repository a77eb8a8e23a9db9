// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! DSP primitives: streaming FIR filter, complex mixer, downsamplers,
//! de-emphasis, AGC, DC blocker, and the block power meter.
//!
//! All primitives are synchronous and process one block end-to-end; filter
//! state carries across calls so block boundaries are seamless.

use std::f64::consts::TAU;

use crate::coeffs::low_pass_kernel;

// ---------------------------------------------------------------------------
// Streaming FIR filter
// ---------------------------------------------------------------------------

/// FIR filter with a delay line, equivalent to streaming convolution with
/// zero initial history.
///
/// Besides the usual [`FirFilter::in_place`], the filter exposes a
/// load/get interface: [`FirFilter::load`] feeds a block into the delay line
/// without producing output, and [`FirFilter::get`] evaluates the
/// convolution at one input index of the loaded block. Downsamplers use this
/// to compute only the output samples they keep.
#[derive(Debug, Clone)]
pub struct FirFilter {
    coeffs: Vec<f32>,
    /// `history ++ current block`; the first `hist_len` entries are the tail
    /// of the previous call.
    window: Vec<f32>,
    hist_len: usize,
}

impl FirFilter {
    pub fn new(coeffs: Vec<f32>) -> Self {
        assert!(!coeffs.is_empty(), "FIR filter needs at least one tap");
        let hist_len = coeffs.len() - 1;
        Self {
            coeffs,
            window: vec![0.0; hist_len],
            hist_len,
        }
    }

    /// Replace the kernel. The delay line resizes, preserving the most
    /// recent samples where the lengths overlap.
    pub fn set_coefficients(&mut self, coeffs: Vec<f32>) {
        assert!(!coeffs.is_empty(), "FIR filter needs at least one tap");
        let hist_len = coeffs.len() - 1;
        let mut window = vec![0.0; hist_len];
        let keep = hist_len.min(self.window.len());
        let src = self.window.len() - keep;
        window[hist_len - keep..].copy_from_slice(&self.window[src..]);
        self.coeffs = coeffs;
        self.window = window;
        self.hist_len = hist_len;
    }

    /// Group delay in samples: `(taps - 1) / 2`.
    pub fn group_delay(&self) -> usize {
        (self.coeffs.len() - 1) / 2
    }

    /// Load a block into the delay line without producing output.
    pub fn load(&mut self, samples: &[f32]) {
        let hist = self.hist_len;
        if self.window.len() >= hist {
            let start = self.window.len() - hist;
            self.window.copy_within(start.., 0);
        }
        self.window.truncate(hist);
        self.window.extend_from_slice(samples);
    }

    /// Convolution output at input index `i` of the loaded block.
    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        let taps = self.coeffs.len();
        let slice = &self.window[i..i + taps];
        let mut acc = 0.0;
        for (sample, coeff) in slice.iter().zip(self.coeffs.iter().rev()) {
            acc += sample * coeff;
        }
        acc
    }

    /// Replace each `x[n]` with the filtered value, carrying the delay line
    /// across calls.
    pub fn in_place(&mut self, x: &mut [f32]) {
        self.load(x);
        for (n, slot) in x.iter_mut().enumerate() {
            *slot = self.get(n);
        }
    }
}

// ---------------------------------------------------------------------------
// Frequency shifter (complex mixer)
// ---------------------------------------------------------------------------

/// Multiplies the complex signal `I + jQ` by `exp(j·2π·f·t)` sample by
/// sample. Phase is kept in turns and stays continuous across calls.
/// Positive `f_hz` moves spectra up.
#[derive(Debug, Clone)]
pub struct FrequencyShifter {
    sample_rate: f64,
    /// Current phase in turns, always in `[0, 1)`.
    phase: f64,
}

impl FrequencyShifter {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
        }
    }

    pub fn in_place(&mut self, i: &mut [f32], q: &mut [f32], f_hz: f64) {
        debug_assert_eq!(i.len(), q.len());
        let step = f_hz / self.sample_rate;
        let mut phase = self.phase;
        for (si, sq) in i.iter_mut().zip(q.iter_mut()) {
            let (sin, cos) = (TAU * phase).sin_cos();
            let re = *si as f64;
            let im = *sq as f64;
            *si = (re * cos - im * sin) as f32;
            *sq = (re * sin + im * cos) as f32;
            phase = (phase + step).rem_euclid(1.0);
        }
        self.phase = phase;
    }
}

// ---------------------------------------------------------------------------
// Downsamplers
// ---------------------------------------------------------------------------

/// Real-valued downsampler: low-pass at `out_rate / 2`, then nearest-sample
/// decimation. Exact when `in_rate / out_rate` is an integer; otherwise the
/// nearest-neighbour step introduces jitter distortion, which is accepted.
#[derive(Debug, Clone)]
pub struct RealDownsampler {
    filter: FirFilter,
    in_rate: u32,
    out_rate: u32,
    rate_mul: f64,
}

impl RealDownsampler {
    pub fn new(in_rate: u32, out_rate: u32, kernel_taps: usize) -> Self {
        let kernel = low_pass_kernel(in_rate as f64, out_rate as f64 / 2.0, kernel_taps);
        Self::with_kernel(in_rate, out_rate, kernel)
    }

    pub fn with_kernel(in_rate: u32, out_rate: u32, kernel: Vec<f32>) -> Self {
        Self {
            filter: FirFilter::new(kernel),
            in_rate,
            out_rate,
            rate_mul: in_rate as f64 / out_rate as f64,
        }
    }

    /// Output samples produced for a block of `input_len` samples:
    /// `⌊input_len · out_rate / in_rate⌋`.
    pub fn output_len(&self, input_len: usize) -> usize {
        (input_len as u64 * self.out_rate as u64 / self.in_rate as u64) as usize
    }

    pub fn process(&mut self, x: &[f32], out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.output_len(x.len()));
        self.filter.load(x);
        let last = x.len().saturating_sub(1);
        for (k, slot) in out.iter_mut().enumerate() {
            let read_from = ((k as f64 * self.rate_mul).round() as usize).min(last);
            *slot = self.filter.get(read_from);
        }
    }
}

/// Two parallel real downsamplers sharing one kernel; consumes `(I, Q)` and
/// emits decimated `(I, Q)`.
#[derive(Debug, Clone)]
pub struct ComplexDownsampler {
    i: RealDownsampler,
    q: RealDownsampler,
}

impl ComplexDownsampler {
    pub fn new(in_rate: u32, out_rate: u32, kernel_taps: usize) -> Self {
        let kernel = low_pass_kernel(in_rate as f64, out_rate as f64 / 2.0, kernel_taps);
        Self {
            i: RealDownsampler::with_kernel(in_rate, out_rate, kernel.clone()),
            q: RealDownsampler::with_kernel(in_rate, out_rate, kernel),
        }
    }

    pub fn output_len(&self, input_len: usize) -> usize {
        self.i.output_len(input_len)
    }

    pub fn process(&mut self, i: &[f32], q: &[f32], out_i: &mut [f32], out_q: &mut [f32]) {
        self.i.process(i, out_i);
        self.q.process(q, out_q);
    }
}

// ---------------------------------------------------------------------------
// De-emphasis
// ---------------------------------------------------------------------------

/// One-pole IIR low-pass undoing FM pre-emphasis. τ is 50 µs by default,
/// 75 µs for US/South Korea deployments.
#[derive(Debug, Clone)]
pub struct Deemphasis {
    alpha: f32,
    y: f32,
}

impl Deemphasis {
    pub fn new(sample_rate: f64, tau_us: u32) -> Self {
        let tau = tau_us.max(1) as f64 * 1e-6;
        let alpha = 1.0 - (-1.0 / (tau * sample_rate)).exp();
        Self {
            alpha: alpha as f32,
            y: 0.0,
        }
    }

    pub fn in_place(&mut self, x: &mut [f32]) {
        for sample in x {
            self.y += self.alpha * (*sample - self.y);
            *sample = self.y;
        }
    }
}

// ---------------------------------------------------------------------------
// AGC
// ---------------------------------------------------------------------------

/// Tracks the running average of `|x|` and divides each sample by
/// `max(average, ε)` to normalise perceived loudness.
///
/// The average starts at full scale so a cold AGC attenuates nothing and
/// never amplifies start-up noise toward full scale.
#[derive(Debug, Clone)]
pub struct Agc {
    alpha: f32,
    average: f32,
}

const AGC_EPSILON: f32 = 1e-3;

impl Agc {
    pub fn new(sample_rate: f64, time_constant_s: f64) -> Self {
        let alpha = 1.0 - (-1.0 / (time_constant_s.max(1e-3) * sample_rate)).exp();
        Self {
            alpha: alpha as f32,
            average: 1.0,
        }
    }

    pub fn in_place(&mut self, x: &mut [f32]) {
        for sample in x {
            self.average += self.alpha * (sample.abs() - self.average);
            *sample = (*sample / self.average.max(AGC_EPSILON)).clamp(-1.0, 1.0);
        }
    }
}

// ---------------------------------------------------------------------------
// DC blocker
// ---------------------------------------------------------------------------

/// One-pole high-pass removing the DC component of a demodulated signal.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    alpha: f32,
    mean: f32,
}

impl DcBlocker {
    pub fn new(sample_rate: f64, corner_hz: f64) -> Self {
        let alpha = 1.0 - (-TAU * corner_hz / sample_rate).exp();
        Self {
            alpha: alpha as f32,
            mean: 0.0,
        }
    }

    pub fn in_place(&mut self, x: &mut [f32]) {
        for sample in x {
            self.mean += self.alpha * (*sample - self.mean);
            *sample -= self.mean;
        }
    }
}

// ---------------------------------------------------------------------------
// Power meter
// ---------------------------------------------------------------------------

/// Mean power of a complex block: `Σ(I² + Q²) / N`. Pass the same slice
/// twice to measure a real signal (counts it in both components).
pub fn power(i: &[f32], q: &[f32]) -> f32 {
    debug_assert_eq!(i.len(), q.len());
    if i.is_empty() {
        return 0.0;
    }
    let sum: f32 = i
        .iter()
        .zip(q.iter())
        .map(|(si, sq)| si * si + sq * sq)
        .sum();
    sum / i.len() as f32
}

/// Linear SNR estimate used by the demodulators:
/// `(filtered_power · out_rate / signal_bandwidth_hz) / total_power`.
pub fn snr_estimate(
    filtered_power: f32,
    total_power: f32,
    out_rate: f64,
    signal_bandwidth_hz: f64,
) -> f32 {
    if total_power <= f32::EPSILON {
        return 0.0;
    }
    filtered_power * (out_rate / signal_bandwidth_hz) as f32 / total_power
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx_eq(a: f32, b: f32, tol: f32, label: &str) {
        assert!(
            (a - b).abs() <= tol,
            "{}: expected {} ≈ {} (tol {})",
            label,
            a,
            b,
            tol
        );
    }

    #[test]
    fn test_fir_all_ones_kernel_is_boxcar_average() {
        let taps = 5;
        let kernel = vec![1.0 / taps as f32; taps];
        let mut fir = FirFilter::new(kernel);
        let mut block = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        fir.in_place(&mut block);
        // With zero history the first outputs average the zero padding.
        assert_approx_eq(block[0], 1.0 / 5.0, 1e-6, "boxcar[0]");
        assert_approx_eq(block[4], 3.0, 1e-6, "boxcar[4]");
        assert_approx_eq(block[5], 4.0, 1e-6, "boxcar[5]");
    }

    #[test]
    fn test_fir_streaming_matches_single_pass() {
        let kernel = low_pass_kernel(48_000.0, 6_000.0, 31);
        let input: Vec<f32> = (0..256)
            .map(|n| (TAU * 0.01 * n as f64).sin() as f32)
            .collect();

        let mut whole = input.clone();
        FirFilter::new(kernel.clone()).in_place(&mut whole);

        let mut split = input.clone();
        let mut fir = FirFilter::new(kernel);
        let (a, b) = split.split_at_mut(100);
        fir.in_place(a);
        fir.in_place(b);

        for (n, (x, y)) in whole.iter().zip(split.iter()).enumerate() {
            assert_approx_eq(*x, *y, 1e-6, &format!("sample {n}"));
        }
    }

    #[test]
    fn test_fir_linearity() {
        let kernel = low_pass_kernel(48_000.0, 6_000.0, 31);
        let x: Vec<f32> = (0..64).map(|n| (n as f32 * 0.37).sin()).collect();
        let y: Vec<f32> = (0..64).map(|n| (n as f32 * 0.11).cos()).collect();
        let (a, b) = (0.6_f32, -1.4_f32);

        let mut combined: Vec<f32> = x
            .iter()
            .zip(y.iter())
            .map(|(xs, ys)| a * xs + b * ys)
            .collect();
        FirFilter::new(kernel.clone()).in_place(&mut combined);

        let mut fx = x.clone();
        FirFilter::new(kernel.clone()).in_place(&mut fx);
        let mut fy = y.clone();
        FirFilter::new(kernel).in_place(&mut fy);

        for n in 0..combined.len() {
            assert_approx_eq(
                combined[n],
                a * fx[n] + b * fy[n],
                1e-5,
                &format!("sample {n}"),
            );
        }
    }

    #[test]
    fn test_fir_group_delay() {
        assert_eq!(FirFilter::new(vec![1.0; 151]).group_delay(), 75);
        assert_eq!(FirFilter::new(vec![1.0]).group_delay(), 0);
    }

    #[test]
    fn test_fir_set_coefficients_preserves_history_tail() {
        let mut fir = FirFilter::new(vec![0.0, 0.0, 1.0]);
        fir.load(&[1.0, 2.0, 3.0, 4.0]);
        // Delay line now holds [3.0, 4.0]; shrinking to two taps keeps [4.0].
        fir.set_coefficients(vec![0.0, 1.0]);
        fir.load(&[5.0]);
        // get(0) with kernel [0, 1] reads the previous sample: 4.0.
        assert_approx_eq(fir.get(0), 4.0, 1e-6, "tail after resize");
    }

    #[test]
    fn test_shifter_round_trip_is_identity() {
        let mut i: Vec<f32> = (0..4096).map(|n| (n as f64 * 0.013).sin() as f32).collect();
        let mut q: Vec<f32> = (0..4096).map(|n| (n as f64 * 0.007).cos() as f32).collect();
        let orig_i = i.clone();
        let orig_q = q.clone();

        let mut up = FrequencyShifter::new(1_024_000.0);
        let mut down = FrequencyShifter::new(1_024_000.0);
        up.in_place(&mut i, &mut q, 100_000.0);
        down.in_place(&mut i, &mut q, -100_000.0);

        for n in 0..i.len() {
            assert_approx_eq(i[n], orig_i[n], 1e-5, &format!("i[{n}]"));
            assert_approx_eq(q[n], orig_q[n], 1e-5, &format!("q[{n}]"));
        }
    }

    #[test]
    fn test_shifter_positive_frequency_rotates_counter_clockwise() {
        let mut i = vec![1.0_f32; 8];
        let mut q = vec![0.0_f32; 8];
        let mut shifter = FrequencyShifter::new(1000.0);
        shifter.in_place(&mut i, &mut q, 10.0);
        assert!(q[1] > 0.0, "positive shift should raise the phase");
        assert!(q[2] > q[1]);
    }

    #[test]
    fn test_shifter_phase_continuous_across_calls() {
        let make = |chunks: &[usize]| -> (Vec<f32>, Vec<f32>) {
            let mut shifter = FrequencyShifter::new(48_000.0);
            let mut i = Vec::new();
            let mut q = Vec::new();
            for &len in chunks {
                let mut ci = vec![1.0_f32; len];
                let mut cq = vec![0.0_f32; len];
                shifter.in_place(&mut ci, &mut cq, 1_234.0);
                i.extend(ci);
                q.extend(cq);
            }
            (i, q)
        };
        let (i1, q1) = make(&[64]);
        let (i2, q2) = make(&[20, 44]);
        for n in 0..64 {
            assert_approx_eq(i1[n], i2[n], 1e-6, &format!("i[{n}]"));
            assert_approx_eq(q1[n], q2[n], 1e-6, &format!("q[{n}]"));
        }
    }

    #[test]
    fn test_downsampler_length_law() {
        let mut down = RealDownsampler::new(1_024_000, 48_000, 41);
        for len in [512, 4096, 65_536] {
            let x = vec![0.0_f32; len];
            let expect = len * 48_000 / 1_024_000;
            assert_eq!(down.output_len(len), expect);
            let mut out = vec![0.0_f32; expect];
            down.process(&x, &mut out);
        }
    }

    #[test]
    fn test_downsampler_integer_ratio_passes_dc() {
        let mut down = RealDownsampler::new(96_000, 48_000, 41);
        let x = vec![0.5_f32; 4096];
        let mut out = vec![0.0_f32; down.output_len(x.len())];
        down.process(&x, &mut out);
        // Skip the filter's warm-up region.
        for (k, &sample) in out.iter().enumerate().skip(64) {
            assert_approx_eq(sample, 0.5, 1e-4, &format!("out[{k}]"));
        }
    }

    #[test]
    fn test_deemphasis_settles_on_dc() {
        let mut deemph = Deemphasis::new(48_000.0, 50);
        let mut block = vec![1.0_f32; 48_000];
        deemph.in_place(&mut block);
        assert_approx_eq(block[47_999], 1.0, 1e-3, "deemphasis DC settle");
        assert!(block[0] < 0.5, "first sample should be far from settled");
    }

    #[test]
    fn test_agc_output_stays_in_range() {
        let mut agc = Agc::new(48_000.0, 0.01);
        let mut block: Vec<f32> = (0..4800)
            .map(|n| ((n as f32 * 0.13).sin() * 0.9))
            .collect();
        agc.in_place(&mut block);
        assert!(block.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_agc_normalises_quiet_signal_upward() {
        let mut agc = Agc::new(48_000.0, 0.005);
        // 2 seconds of a quiet tone; by the end the average has converged.
        let mut block: Vec<f32> = (0..96_000)
            .map(|n| (TAU as f32 * 0.01 * n as f32).sin() * 0.05)
            .collect();
        agc.in_place(&mut block);
        let tail_peak = block[90_000..]
            .iter()
            .fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(tail_peak > 0.8, "quiet tone should be lifted, got {tail_peak}");
    }

    #[test]
    fn test_dc_blocker_removes_offset_keeps_tone() {
        let mut blocker = DcBlocker::new(48_000.0, 20.0);
        let mut block: Vec<f32> = (0..96_000)
            .map(|n| 0.4 + (TAU as f32 * 900.0 / 48_000.0 * n as f32).sin() * 0.3)
            .collect();
        blocker.in_place(&mut block);
        let tail = &block[48_000..];
        let mean: f32 = tail.iter().sum::<f32>() / tail.len() as f32;
        assert!(mean.abs() < 0.01, "residual DC {mean}");
        let peak = tail.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.25, "tone should survive, peak {peak}");
    }

    #[test]
    fn test_power_of_unit_circle_is_one() {
        let i: Vec<f32> = (0..64).map(|n| (n as f32 * 0.3).cos()).collect();
        let q: Vec<f32> = (0..64).map(|n| (n as f32 * 0.3).sin()).collect();
        assert_approx_eq(power(&i, &q), 1.0, 1e-5, "unit circle power");
        assert_eq!(power(&[], &[]), 0.0);
    }

    #[test]
    fn test_snr_estimate_zero_power_is_zero() {
        assert_eq!(snr_estimate(0.0, 0.0, 48_000.0, 10_000.0), 0.0);
        assert_approx_eq(
            snr_estimate(0.5, 1.0, 48_000.0, 24_000.0),
            1.0,
            1e-6,
            "half power in half band",
        );
    }
}
