// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Demodulation controller: owns the active pipeline, the frequency offset,
//! the squelch gate, and the audio sink.

use sdrx_core::error::RadioError;
use sdrx_core::events::{EventHub, RadioEvent};
use sdrx_core::mode::Mode;
use sdrx_core::sink::AudioSink;

use crate::demod::Pipeline;

/// Squelch tail: once the gate opens it stays open for this fraction of a
/// second after the SNR drops, so syllable gaps do not chop audio.
const SQUELCH_TAIL_S: f64 = 0.1;

pub struct DemodController<S: AudioSink> {
    in_rate: u32,
    out_rate: u32,
    mode: Mode,
    pipeline: Pipeline,
    frequency_offset_hz: f64,
    /// Deferred retune: `(expected_center, pending_offset)`. Applied before
    /// the first block whose centre frequency matches.
    pending: Option<(f64, f64)>,
    sink: S,
    events: EventHub,
    deemphasis_us: u32,
    squelch_tail: usize,
    latest_stereo: bool,
}

impl<S: AudioSink> DemodController<S> {
    pub fn new(in_rate: u32, mode: Mode, sink: S, events: EventHub) -> Self {
        let mode = mode.clamped();
        let out_rate = sink.sample_rate();
        let deemphasis_us = 50;
        Self {
            in_rate,
            out_rate,
            mode,
            pipeline: Pipeline::new(&mode, in_rate, out_rate, deemphasis_us),
            frequency_offset_hz: 0.0,
            pending: None,
            sink,
            events,
            deemphasis_us,
            squelch_tail: 0,
            latest_stereo: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn frequency_offset_hz(&self) -> f64 {
        self.frequency_offset_hz
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Switch demodulation parameters. Staying within the same scheme
    /// forwards the parameters to the running pipeline; a scheme change
    /// builds a fresh pipeline.
    pub fn set_mode(&mut self, mode: Mode) {
        let mode = mode.clamped();
        if mode.scheme() == self.pipeline.scheme() {
            self.pipeline.update(&mode);
        } else {
            self.pipeline =
                Pipeline::new(&mode, self.in_rate, self.out_rate, self.deemphasis_us);
        }
        self.mode = mode;
    }

    pub fn set_frequency_offset(&mut self, hz: f64) {
        self.frequency_offset_hz = hz;
    }

    /// Defer an offset change until the tuner reports `center_hz`, so a
    /// retune and its matching baseband offset land on the same block.
    pub fn expect_frequency_and_set_offset(&mut self, center_hz: f64, offset_hz: f64) {
        self.pending = Some((center_hz, offset_hz));
    }

    /// Replace the input sample rate. Kernels depend on it, so the pipeline
    /// is rebuilt.
    pub fn set_sample_rate(&mut self, rate: u32) {
        self.in_rate = rate;
        self.pipeline = Pipeline::new(&self.mode, rate, self.out_rate, self.deemphasis_us);
    }

    /// Regional de-emphasis constant (50 µs default, 75 µs for US/S.Korea).
    pub fn set_deemphasis_us(&mut self, deemphasis_us: u32) {
        self.deemphasis_us = deemphasis_us;
        self.pipeline.set_deemphasis_us(deemphasis_us);
    }

    /// CW beat tone.
    pub fn set_cw_tone_hz(&mut self, tone_hz: f64) {
        self.pipeline.set_cw_tone_hz(tone_hz);
    }

    /// Process one float I/Q block captured at `center_frequency_hz`.
    pub fn receive(
        &mut self,
        i: &[f32],
        q: &[f32],
        center_frequency_hz: f64,
    ) -> Result<(), RadioError> {
        if let Some((expected, offset)) = self.pending {
            if center_frequency_hz == expected {
                self.frequency_offset_hz = offset;
                self.pending = None;
            }
        }

        let mut audio = self
            .pipeline
            .demodulate(i, q, self.frequency_offset_hz);

        if let Some(threshold) = self.mode.squelch() {
            let block_len = audio.left.len();
            if audio.snr > threshold {
                self.squelch_tail = (self.out_rate as f64 * SQUELCH_TAIL_S) as usize;
            } else if self.squelch_tail > 0 {
                self.squelch_tail = self.squelch_tail.saturating_sub(block_len);
            } else {
                audio.left.fill(0.0);
                audio.right.fill(0.0);
            }
        }

        let played = self.sink.play(&audio.left, &audio.right);

        if audio.stereo != self.latest_stereo {
            self.latest_stereo = audio.stereo;
            self.events.emit(RadioEvent::StereoStatus(audio.stereo));
        }

        self.pipeline.recycle(audio);
        played
    }
}
