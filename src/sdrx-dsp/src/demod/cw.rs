// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! CW (morse) reception.
//!
//! The carrier is selected with a very narrow low-pass, then translated up
//! by the beat tone so an unmodulated carrier becomes audible.

use sdrx_core::blocks::AudioBlock;
use sdrx_core::mode::Mode;

use crate::buffers::BufferPool;
use crate::coeffs::low_pass_kernel;
use crate::dsp::{power, snr_estimate, Agc, ComplexDownsampler, FirFilter, FrequencyShifter};

/// Narrow channel filter; CW bandwidths go down to a few hertz.
const CHANNEL_TAPS: usize = 351;
const DOWNSAMPLE_TAPS: usize = 151;
/// Default beat tone (Hz).
pub const DEFAULT_TONE_HZ: f64 = 600.0;
/// AGC time constant (seconds). Slow, so keying is not flattened.
const AGC_TIME_CONSTANT_S: f64 = 10.0;

/// CW pipeline: shift → complex downsample → narrow low-pass → beat-tone
/// up-shift → AGC. Mono output duplicated to both channels.
pub struct CwPipeline {
    bandwidth_hz: u32,
    tone_hz: f64,
    out_rate: u32,
    shifter: FrequencyShifter,
    downsampler: ComplexDownsampler,
    channel_i: FirFilter,
    channel_q: FirFilter,
    tone_shifter: FrequencyShifter,
    agc: Agc,
    pool: BufferPool<f32>,
}

impl CwPipeline {
    pub fn new(in_rate: u32, out_rate: u32, bandwidth_hz: u32) -> Self {
        let kernel = low_pass_kernel(out_rate as f64, bandwidth_hz as f64 / 2.0, CHANNEL_TAPS);
        Self {
            bandwidth_hz,
            tone_hz: DEFAULT_TONE_HZ,
            out_rate,
            shifter: FrequencyShifter::new(in_rate as f64),
            downsampler: ComplexDownsampler::new(in_rate, out_rate, DOWNSAMPLE_TAPS),
            channel_i: FirFilter::new(kernel.clone()),
            channel_q: FirFilter::new(kernel),
            tone_shifter: FrequencyShifter::new(out_rate as f64),
            agc: Agc::new(out_rate as f64, AGC_TIME_CONSTANT_S),
            pool: BufferPool::default(),
        }
    }

    pub fn set_tone_hz(&mut self, tone_hz: f64) {
        self.tone_hz = tone_hz.clamp(0.0, self.out_rate as f64 / 2.0);
    }

    pub fn tone_hz(&self) -> f64 {
        self.tone_hz
    }

    pub fn update(&mut self, mode: &Mode) {
        if let Some(bandwidth_hz) = mode.bandwidth_hz() {
            if bandwidth_hz != self.bandwidth_hz {
                self.bandwidth_hz = bandwidth_hz;
                let kernel = low_pass_kernel(
                    self.out_rate as f64,
                    bandwidth_hz as f64 / 2.0,
                    CHANNEL_TAPS,
                );
                self.channel_i.set_coefficients(kernel.clone());
                self.channel_q.set_coefficients(kernel);
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
        self.channel_i.in_place(&mut base_i);
        self.channel_q.in_place(&mut base_q);
        let filtered_power = power(&base_i, &base_q);
        let snr = snr_estimate(
            filtered_power,
            total_power,
            self.out_rate as f64,
            self.bandwidth_hz as f64,
        );

        self.tone_shifter
            .in_place(&mut base_i, &mut base_q, self.tone_hz);
        let mut left = base_i;
        self.pool.release(base_q);

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
