// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Narrowband FM demodulation.

use sdrx_core::blocks::AudioBlock;
use sdrx_core::mode::Mode;

use crate::buffers::BufferPool;
use crate::coeffs::low_pass_kernel;
use crate::demod::fm::FmDiscriminator;
use crate::dsp::{power, snr_estimate, ComplexDownsampler, FirFilter, FrequencyShifter};

const CHANNEL_TAPS: usize = 151;
const DOWNSAMPLE_TAPS: usize = 151;

/// NBFM pipeline: shift → complex downsample to the audio rate → channel
/// low-pass at the maximum deviation → discriminator. Mono output.
pub struct NbfmPipeline {
    max_deviation_hz: u32,
    out_rate: u32,
    shifter: FrequencyShifter,
    downsampler: ComplexDownsampler,
    channel_i: FirFilter,
    channel_q: FirFilter,
    discriminator: FmDiscriminator,
    pool: BufferPool<f32>,
}

impl NbfmPipeline {
    pub fn new(in_rate: u32, out_rate: u32, max_deviation_hz: u32) -> Self {
        let kernel = low_pass_kernel(out_rate as f64, max_deviation_hz as f64, CHANNEL_TAPS);
        Self {
            max_deviation_hz,
            out_rate,
            shifter: FrequencyShifter::new(in_rate as f64),
            downsampler: ComplexDownsampler::new(in_rate, out_rate, DOWNSAMPLE_TAPS),
            channel_i: FirFilter::new(kernel.clone()),
            channel_q: FirFilter::new(kernel),
            discriminator: FmDiscriminator::new(max_deviation_hz as f64, out_rate as f64),
            pool: BufferPool::default(),
        }
    }

    pub fn update(&mut self, mode: &Mode) {
        if let Some(max_deviation_hz) = mode.max_deviation_hz() {
            if max_deviation_hz != self.max_deviation_hz {
                self.max_deviation_hz = max_deviation_hz;
                let kernel = low_pass_kernel(
                    self.out_rate as f64,
                    max_deviation_hz as f64,
                    CHANNEL_TAPS,
                );
                self.channel_i.set_coefficients(kernel.clone());
                self.channel_q.set_coefficients(kernel);
                self.discriminator =
                    FmDiscriminator::new(max_deviation_hz as f64, self.out_rate as f64);
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
            2.0 * self.max_deviation_hz as f64,
        );

        let mut left = self.pool.acquire(m);
        self.discriminator.process(&base_i, &base_q, &mut left);
        self.pool.release(base_i);
        self.pool.release(base_q);

        for sample in left.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
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
