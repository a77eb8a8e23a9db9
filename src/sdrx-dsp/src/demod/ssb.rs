// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Single-sideband demodulation by the phasing method.
//!
//! The wanted sideband of the baseband analytic signal is recovered as
//! `I ± H(Q)` where `H` is a 90° phase-shift FIR; `+` selects the lower
//! sideband, `−` the upper. The I arm is delayed by the Hilbert group delay
//! so both arms stay aligned, and the image sideband cancels.

use std::collections::VecDeque;

use sdrx_core::blocks::AudioBlock;
use sdrx_core::mode::Mode;

use crate::buffers::BufferPool;
use crate::coeffs::{hilbert_kernel, low_pass_kernel};
use crate::dsp::{power, snr_estimate, Agc, ComplexDownsampler, FirFilter, FrequencyShifter};

/// Tap count of the internal Hilbert FIR. Sized so the 90° approximation
/// holds down to a few hundred hertz at the audio rate.
const HILBERT_TAPS: usize = 511;
const AUDIO_TAPS: usize = 151;
const DOWNSAMPLE_TAPS: usize = 151;
/// AGC time constant (seconds).
const AGC_TIME_CONSTANT_S: f64 = 3.0;

/// Plain sample delay matching the Hilbert arm's group delay.
#[derive(Debug, Clone)]
struct Delay {
    line: VecDeque<f32>,
}

impl Delay {
    fn new(samples: usize) -> Self {
        let mut line = VecDeque::with_capacity(samples + 1);
        line.extend(std::iter::repeat(0.0).take(samples));
        Self { line }
    }

    fn in_place(&mut self, x: &mut [f32]) {
        for sample in x {
            self.line.push_back(*sample);
            *sample = self.line.pop_front().unwrap_or(0.0);
        }
    }
}

/// SSB pipeline: shift → complex downsample → phasing demodulator →
/// audio low-pass → AGC. Mono output duplicated to both channels.
pub struct SsbPipeline {
    upper: bool,
    bandwidth_hz: u32,
    out_rate: u32,
    shifter: FrequencyShifter,
    downsampler: ComplexDownsampler,
    hilbert: FirFilter,
    delay: Delay,
    audio_filter: FirFilter,
    agc: Agc,
    pool: BufferPool<f32>,
}

impl SsbPipeline {
    pub fn new(in_rate: u32, out_rate: u32, bandwidth_hz: u32, upper: bool) -> Self {
        let hilbert = FirFilter::new(hilbert_kernel(HILBERT_TAPS));
        let group_delay = hilbert.group_delay();
        Self {
            upper,
            bandwidth_hz,
            out_rate,
            shifter: FrequencyShifter::new(in_rate as f64),
            downsampler: ComplexDownsampler::new(in_rate, out_rate, DOWNSAMPLE_TAPS),
            hilbert,
            delay: Delay::new(group_delay),
            audio_filter: FirFilter::new(low_pass_kernel(
                out_rate as f64,
                bandwidth_hz as f64 / 2.0,
                AUDIO_TAPS,
            )),
            agc: Agc::new(out_rate as f64, AGC_TIME_CONSTANT_S),
            pool: BufferPool::default(),
        }
    }

    pub fn upper(&self) -> bool {
        self.upper
    }

    pub fn update(&mut self, mode: &Mode) {
        if let Some(bandwidth_hz) = mode.bandwidth_hz() {
            if bandwidth_hz != self.bandwidth_hz {
                self.bandwidth_hz = bandwidth_hz;
                self.audio_filter.set_coefficients(low_pass_kernel(
                    self.out_rate as f64,
                    bandwidth_hz as f64 / 2.0,
                    AUDIO_TAPS,
                ));
            }
        }
    }

    pub fn demodulate(&mut self, i: &[f32], q: &[f32], freq_offset: f64) -> AudioBlock {
        let n = i.len();
        let mut work_i = self.pool.acquire(n);
        let mut work_q = self.pool.acquire(n);
        work_i.copy_from_slice(i);
        work_q.copy_from_slice(q);
        self.shifter.in_place(&mut work_i, &mut work_q, -freq_offset);

        let m = self.downsampler.output_len(n);
        let mut base_i = self.pool.acquire(m);
        let mut base_q = self.pool.acquire(m);
        self.downsampler
            .process(&work_i, &work_q, &mut base_i, &mut base_q);
        self.pool.release(work_i);
        self.pool.release(work_q);

        let total_power = power(&base_i, &base_q);

        self.delay.in_place(&mut base_i);
        self.hilbert.in_place(&mut base_q);
        let mut left = base_i;
        if self.upper {
            for (sample, h) in left.iter_mut().zip(base_q.iter()) {
                *sample -= h;
            }
        } else {
            for (sample, h) in left.iter_mut().zip(base_q.iter()) {
                *sample += h;
            }
        }
        self.pool.release(base_q);

        self.audio_filter.in_place(&mut left);
        let filtered_power = power(&left, &left);
        let snr = snr_estimate(
            filtered_power,
            total_power,
            self.out_rate as f64,
            self.bandwidth_hz as f64 * 2.0,
        );

        self.agc.in_place(&mut left);
        let mut right = self.pool.acquire(m);
        right.copy_from_slice(&left);

        AudioBlock {
            left,
            right,
            stereo: false,
            snr,
        }
    }

    pub fn recycle(&mut self, block: AudioBlock) {
        self.pool.release(block.left);
        self.pool.release(block.right);
    }
}
