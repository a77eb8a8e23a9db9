// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Stereo pilot recovery.
//!
//! A PLL locks an NCO to the 19 kHz pilot of the FM composite baseband. The
//! L−R difference signal is recovered by mixing the composite with the
//! doubled NCO (38 kHz); pilot presence is judged from the smoothed pilot
//! amplitude over a short window, with hysteresis so the flag does not
//! flutter at the threshold.

use std::f64::consts::TAU;

use crate::buffers::RingBuffer;

/// Pilot tone frequency (Hz).
const PILOT_HZ: f64 = 19_000.0;
/// Corner of the one-pole low-passes on the mixed pilot (Hz). Narrow enough
/// that audio content 1 kHz away from the pilot leaks less than the
/// detection threshold.
const PILOT_LP_CORNER_HZ: f64 = 25.0;
/// Proportional loop gain (turns per unit phase error per sample).
const LOOP_KP: f64 = 1.0e-5;
/// Integral loop gain.
const LOOP_KI: f64 = 1.0e-9;
/// Pilot presence smoothing window (seconds).
const PRESENCE_WINDOW_S: f64 = 0.05;
/// Smoothed pilot amplitude needed to declare the pilot found.
const PILOT_ON_LEVEL: f32 = 0.015;
/// Level below which a found pilot is declared lost.
const PILOT_OFF_LEVEL: f32 = 0.008;

#[derive(Debug, Clone)]
struct OnePole {
    alpha: f32,
    y: f32,
}

impl OnePole {
    fn new(sample_rate: f64, corner_hz: f64) -> Self {
        Self {
            alpha: (1.0 - (-TAU * corner_hz / sample_rate).exp()) as f32,
            y: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        self.y += self.alpha * (x - self.y);
        self.y
    }
}

/// 19 kHz phase-locked loop over the composite baseband.
#[derive(Debug, Clone)]
pub(crate) struct StereoSeparator {
    /// NCO phase in turns.
    phase: f64,
    /// Nominal phase increment per sample (turns).
    step: f64,
    /// Loop filter integrator (turns per sample).
    integrator: f64,
    pilot_i: OnePole,
    pilot_q: OnePole,
    presence: RingBuffer,
    window: usize,
    found: bool,
}

impl StereoSeparator {
    pub(crate) fn new(sample_rate: f64) -> Self {
        let window = ((sample_rate * PRESENCE_WINDOW_S) as usize).max(1);
        Self {
            phase: 0.0,
            step: PILOT_HZ / sample_rate,
            integrator: 0.0,
            pilot_i: OnePole::new(sample_rate, PILOT_LP_CORNER_HZ),
            pilot_q: OnePole::new(sample_rate, PILOT_LP_CORNER_HZ),
            presence: RingBuffer::new(window),
            window,
            found: false,
        }
    }

    /// Process one composite block. Writes the recovered L−R signal into
    /// `diff` (zeroed when no pilot is present) and returns the pilot flag.
    pub(crate) fn separate(&mut self, composite: &[f32], diff: &mut [f32]) -> bool {
        debug_assert_eq!(composite.len(), diff.len());
        let mut phase = self.phase;
        for (n, &x) in composite.iter().enumerate() {
            let (sin, cos) = (TAU * phase).sin_cos();
            let i = self.pilot_i.process(x * cos as f32);
            let q = self.pilot_q.process(x * -sin as f32);
            let mag = (i * i + q * q).sqrt();
            self.presence.push(&[mag]);

            // PI loop: the quadrature arm, normalised by the pilot
            // amplitude, approximates sin of the phase error.
            let err = (q / (mag + 1e-9)) as f64;
            self.integrator += LOOP_KI * err;
            phase = (phase + self.step + LOOP_KP * err + self.integrator).rem_euclid(1.0);

            // L−R rides on the doubled NCO (38 kHz).
            let cos_2p = (cos * cos - sin * sin) as f32;
            diff[n] = x * 2.0 * cos_2p;
        }
        self.phase = phase;

        let level = self.presence.tail_mean(self.window);
        if self.found {
            if level < PILOT_OFF_LEVEL {
                self.found = false;
            }
        } else if level > PILOT_ON_LEVEL {
            self.found = true;
        }

        if !self.found {
            diff.fill(0.0);
        }
        self.found
    }
}
