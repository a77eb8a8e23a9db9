// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Wideband (broadcast) FM demodulation.
//!
//! Two stages: baseband extraction at an intermediate rate that preserves
//! the 0–100 kHz composite, then audio recovery with optional stereo
//! separation and de-emphasis.

use sdrx_core::blocks::AudioBlock;
use sdrx_core::mode::Mode;

use crate::buffers::BufferPool;
use crate::coeffs::low_pass_kernel;
use crate::demod::fm::FmDiscriminator;
use crate::demod::stereo::StereoSeparator;
use crate::dsp::{
    power, snr_estimate, ComplexDownsampler, Deemphasis, FirFilter, FrequencyShifter,
    RealDownsampler,
};

/// Upper bound on the intermediate rate; keeps the full composite while
/// holding the channel filter cost down.
const INTER_RATE_MAX: u32 = 336_000;
/// Broadcast FM deviation (Hz).
const MAX_DEVIATION_HZ: f64 = 75_000.0;
/// Assumed RF bandwidth of a WBFM station, used by the SNR estimate. The
/// station bandwidth does not vary with the audio settings, so this is a
/// constant rather than a live parameter.
const CHANNEL_BANDWIDTH_HZ: f64 = 150_000.0;
const CHANNEL_TAPS: usize = 151;
const AUDIO_TAPS: usize = 41;
const DOWNSAMPLE_TAPS: usize = 151;

/// WBFM pipeline with optional stereo decoding.
pub struct WbfmPipeline {
    stereo_requested: bool,
    inter_rate: u32,
    out_rate: u32,
    deemphasis_us: u32,
    shifter: FrequencyShifter,
    downsampler: ComplexDownsampler,
    channel_i: FirFilter,
    channel_q: FirFilter,
    discriminator: FmDiscriminator,
    mono_down: RealDownsampler,
    diff_down: RealDownsampler,
    separator: StereoSeparator,
    deemph_left: Deemphasis,
    deemph_right: Deemphasis,
    pool: BufferPool<f32>,
}

impl WbfmPipeline {
    pub fn new(in_rate: u32, out_rate: u32, stereo: bool, deemphasis_us: u32) -> Self {
        let inter_rate = in_rate.min(INTER_RATE_MAX);
        let channel = low_pass_kernel(inter_rate as f64, MAX_DEVIATION_HZ, CHANNEL_TAPS);
        Self {
            stereo_requested: stereo,
            inter_rate,
            out_rate,
            deemphasis_us,
            shifter: FrequencyShifter::new(in_rate as f64),
            downsampler: ComplexDownsampler::new(in_rate, inter_rate, DOWNSAMPLE_TAPS),
            channel_i: FirFilter::new(channel.clone()),
            channel_q: FirFilter::new(channel),
            discriminator: FmDiscriminator::new(MAX_DEVIATION_HZ, inter_rate as f64),
            mono_down: RealDownsampler::new(inter_rate, out_rate, AUDIO_TAPS),
            diff_down: RealDownsampler::new(inter_rate, out_rate, AUDIO_TAPS),
            separator: StereoSeparator::new(inter_rate as f64),
            deemph_left: Deemphasis::new(out_rate as f64, deemphasis_us),
            deemph_right: Deemphasis::new(out_rate as f64, deemphasis_us),
            pool: BufferPool::new(12),
        }
    }

    pub fn update(&mut self, mode: &Mode) {
        if let Some(stereo) = mode.stereo() {
            self.stereo_requested = stereo;
        }
    }

    pub fn set_deemphasis_us(&mut self, deemphasis_us: u32) {
        if deemphasis_us != self.deemphasis_us {
            self.deemphasis_us = deemphasis_us;
            self.deemph_left = Deemphasis::new(self.out_rate as f64, deemphasis_us);
            self.deemph_right = Deemphasis::new(self.out_rate as f64, deemphasis_us);
        }
    }

    pub fn demodulate(&mut self, i: &[f32], q: &[f32], freq_offset: f64) -> AudioBlock {
        // Stage 1: baseband extraction.
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
            self.inter_rate as f64,
            CHANNEL_BANDWIDTH_HZ,
        );

        let mut composite = self.pool.acquire(m);
        self.discriminator.process(&base_i, &base_q, &mut composite);
        self.pool.release(base_i);
        self.pool.release(base_q);

        // Stage 2: audio recovery.
        let out_len = self.mono_down.output_len(m);
        let mut left = self.pool.acquire(out_len);
        self.mono_down.process(&composite, &mut left);
        let mut right = self.pool.acquire(out_len);
        right.copy_from_slice(&left);

        let mut found = false;
        if self.stereo_requested {
            let mut diff_composite = self.pool.acquire(m);
            found = self.separator.separate(&composite, &mut diff_composite);
            if found {
                let mut diff = self.pool.acquire(out_len);
                self.diff_down.process(&diff_composite, &mut diff);
                for k in 0..out_len {
                    left[k] += diff[k];
                    right[k] -= diff[k];
                }
                self.pool.release(diff);
            }
            self.pool.release(diff_composite);
        }
        self.pool.release(composite);

        self.deemph_left.in_place(&mut left);
        self.deemph_right.in_place(&mut right);
        for sample in left.iter_mut().chain(right.iter_mut()) {
            *sample = sample.clamp(-1.0, 1.0);
        }

        AudioBlock {
            left,
            right,
            stereo: found,
            snr,
        }
    }

    pub fn recycle(&mut self, block: AudioBlock) {
        self.pool.release(block.left);
        self.pool.release(block.right);
    }
}
